use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::{Booking, BookingDetails, BookingDraft, BookingRef, BookingStatus};
use crate::checkin::{BoardingPass, BoardingPassView, CheckInContext, CheckInIssue, CheckInRecord, PassengerCheckIn};
use crate::flight::{Aircraft, Flight};
use crate::seat::{SeatClaim, SeatMapEntry, SeatSelection};
use crate::CoreResult;

/// Read access to flights and aircraft reference data.
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<Flight>>;

    async fn get_aircraft(&self, id: Uuid) -> CoreResult<Option<Aircraft>>;
}

/// Seat maps and seat selections.
#[async_trait]
pub trait SeatRepository: Send + Sync {
    /// Seats of an aircraft ordered by row, then column. Empty if never generated.
    async fn seat_map(&self, aircraft_id: Uuid) -> CoreResult<Vec<SeatMapEntry>>;

    /// Persists a generated map. Returns `false` without writing anything when the
    /// aircraft already has seats.
    async fn insert_seat_map(&self, aircraft_id: Uuid, seats: &[SeatMapEntry]) -> CoreResult<bool>;

    async fn set_seat_selectable(&self, aircraft_id: Uuid, seat_number: &str, selectable: bool) -> CoreResult<()>;

    async fn flight_selections(&self, flight_id: Uuid) -> CoreResult<Vec<SeatSelection>>;

    async fn booking_selections(&self, booking_id: Uuid) -> CoreResult<Vec<SeatSelection>>;

    /// Atomically claims a seat for a passenger, releasing the passenger's previous
    /// seat on that flight and updating the passenger's seat field.
    /// Serialised per flight; fails with `SeatTaken` when another passenger holds it.
    async fn claim_seat(&self, claim: &SeatClaim) -> CoreResult<SeatSelection>;
}

/// Booking units of work.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Commits header, flight links, passengers, ancillaries and counter decrements
    /// as one transaction. Fails with `InsufficientSeats` or `PnrCollision` without
    /// leaving partial state behind.
    async fn insert_booking(&self, draft: &BookingDraft) -> CoreResult<BookingDetails>;

    async fn find_booking(&self, reference: &BookingRef) -> CoreResult<Option<Booking>>;

    async fn booking_details(&self, booking_id: Uuid) -> CoreResult<Option<BookingDetails>>;

    async fn list_bookings(&self, owner: &str, status: Option<BookingStatus>) -> CoreResult<Vec<Booking>>;

    /// `pending -> confirmed`, payment completed.
    async fn confirm_booking(&self, booking_id: Uuid, payment_reference: Option<&str>) -> CoreResult<Booking>;

    /// Marks the booking cancelled, restores the per-cabin counters of every flight
    /// and releases its seat selections, in one transaction.
    async fn cancel_booking(&self, booking_id: Uuid) -> CoreResult<Booking>;
}

/// Check-in records and boarding passes.
#[async_trait]
pub trait CheckInRepository: Send + Sync {
    async fn check_in_context(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        flight_id: Uuid,
    ) -> CoreResult<Option<CheckInContext>>;

    /// Persists the record and its boarding pass and flags the passenger, after
    /// re-checking under lock that the booking is still confirmed and that no
    /// record exists yet for the (passenger, flight).
    async fn record_check_in(&self, issue: &CheckInIssue) -> CoreResult<()>;

    async fn check_in_record(&self, passenger_id: Uuid, flight_id: Uuid) -> CoreResult<Option<CheckInRecord>>;

    /// Invalidates the passenger's valid pass for the flight and stores `replacement`.
    async fn replace_boarding_pass(&self, replacement: &BoardingPass) -> CoreResult<()>;

    async fn check_in_status(&self, booking_id: Uuid) -> CoreResult<Vec<PassengerCheckIn>>;

    /// Only valid passes are returned.
    async fn boarding_pass(&self, passenger_id: Uuid, flight_id: Uuid) -> CoreResult<Option<BoardingPassView>>;
}
