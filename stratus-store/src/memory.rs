//! In-process implementation of every repository port.
//!
//! All state sits behind one async mutex, so each call is a linearised unit of
//! work: either every mutation of a call lands or none does. Used by tests and
//! by local runs without PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use stratus_core::booking::{
    AncillaryLineItem, Booking, BookingDetails, BookingDraft, BookingRef, BookingStatus, Passenger, PaymentStatus,
};
use stratus_core::checkin::{
    BoardingPass, BoardingPassView, CheckInContext, CheckInIssue, CheckInRecord, PassengerCheckIn,
};
use stratus_core::flight::{Aircraft, CabinClass, Flight};
use stratus_core::repository::{BookingRepository, CheckInRepository, FlightRepository, SeatRepository};
use stratus_core::seat::{sort_seats, SeatClaim, SeatMapEntry, SeatSelection};
use stratus_core::{CoreError, CoreResult};

#[derive(Default)]
struct MemoryState {
    aircraft: HashMap<Uuid, Aircraft>,
    flights: HashMap<Uuid, Flight>,
    seat_maps: HashMap<Uuid, Vec<SeatMapEntry>>,
    selections: Vec<SeatSelection>,
    bookings: HashMap<Uuid, Booking>,
    booking_flights: HashMap<Uuid, Vec<Uuid>>,
    passengers: Vec<Passenger>,
    ancillaries: Vec<AncillaryLineItem>,
    check_ins: Vec<CheckInRecord>,
    boarding_passes: Vec<BoardingPass>,
}

impl MemoryState {
    fn details(&self, booking_id: Uuid) -> Option<BookingDetails> {
        let booking = self.bookings.get(&booking_id)?.clone();
        Some(BookingDetails {
            booking,
            flight_ids: self.booking_flights.get(&booking_id).cloned().unwrap_or_default(),
            passengers: self
                .passengers
                .iter()
                .filter(|p| p.booking_id == booking_id)
                .cloned()
                .collect(),
            ancillaries: self
                .ancillaries
                .iter()
                .filter(|a| a.booking_id == booking_id)
                .cloned()
                .collect(),
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_aircraft(&self, aircraft: Aircraft) {
        self.state.lock().await.aircraft.insert(aircraft.id, aircraft);
    }

    /// Registers a flight. Capacity is taken from its aircraft when one is known.
    pub async fn add_flight(&self, mut flight: Flight) {
        let mut state = self.state.lock().await;
        if let Some(aircraft) = state.aircraft.get(&flight.aircraft_id) {
            flight.capacity = aircraft.seats;
        }
        state.flights.insert(flight.id, flight);
    }
}

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<Flight>> {
        Ok(self.state.lock().await.flights.get(&id).cloned())
    }

    async fn get_aircraft(&self, id: Uuid) -> CoreResult<Option<Aircraft>> {
        Ok(self.state.lock().await.aircraft.get(&id).cloned())
    }
}

#[async_trait]
impl SeatRepository for MemoryStore {
    async fn seat_map(&self, aircraft_id: Uuid) -> CoreResult<Vec<SeatMapEntry>> {
        Ok(self
            .state
            .lock()
            .await
            .seat_maps
            .get(&aircraft_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_seat_map(&self, aircraft_id: Uuid, seats: &[SeatMapEntry]) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        if state.seat_maps.get(&aircraft_id).is_some_and(|s| !s.is_empty()) {
            return Ok(false);
        }
        let mut seats = seats.to_vec();
        sort_seats(&mut seats);
        state.seat_maps.insert(aircraft_id, seats);
        Ok(true)
    }

    async fn set_seat_selectable(&self, aircraft_id: Uuid, seat_number: &str, selectable: bool) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let seat = state
            .seat_maps
            .get_mut(&aircraft_id)
            .and_then(|seats| seats.iter_mut().find(|s| s.seat_number == seat_number))
            .ok_or_else(|| CoreError::SeatNotFound(seat_number.to_string()))?;
        seat.selectable = selectable;
        Ok(())
    }

    async fn flight_selections(&self, flight_id: Uuid) -> CoreResult<Vec<SeatSelection>> {
        Ok(self
            .state
            .lock()
            .await
            .selections
            .iter()
            .filter(|s| s.flight_id == flight_id)
            .cloned()
            .collect())
    }

    async fn booking_selections(&self, booking_id: Uuid) -> CoreResult<Vec<SeatSelection>> {
        Ok(self
            .state
            .lock()
            .await
            .selections
            .iter()
            .filter(|s| s.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn claim_seat(&self, claim: &SeatClaim) -> CoreResult<SeatSelection> {
        let mut state = self.state.lock().await;
        let seat_number = claim.seat.seat_number.as_str();

        let passenger = state
            .passengers
            .iter()
            .find(|p| {
                p.id == claim.passenger_id && p.booking_id == claim.booking_id && p.flight_id == claim.flight_id
            })
            .ok_or_else(|| CoreError::not_found("Passenger", claim.passenger_id))?;
        let cabin = passenger.details.cabin_class;
        let checked_in = passenger.checked_in;

        let booking = state
            .bookings
            .get(&claim.booking_id)
            .ok_or_else(|| CoreError::not_found("Booking", claim.booking_id))?;
        if booking.status == BookingStatus::Cancelled {
            return Err(CoreError::InvalidState(format!("booking {} is cancelled", booking.pnr)));
        }

        let flight = state
            .flights
            .get(&claim.flight_id)
            .ok_or_else(|| CoreError::not_found("Flight", claim.flight_id))?;
        let seat = state
            .seat_maps
            .get(&flight.aircraft_id)
            .and_then(|seats| seats.iter().find(|s| s.seat_number == seat_number))
            .ok_or_else(|| CoreError::SeatNotFound(seat_number.to_string()))?;
        if !seat.selectable {
            return Err(CoreError::SeatUnavailable(seat_number.to_string()));
        }
        if seat.seat_class != cabin {
            return Err(CoreError::CabinMismatch {
                seat_number: seat_number.to_string(),
                seat_class: seat.seat_class,
                cabin,
            });
        }

        if let Some(holder) = state
            .selections
            .iter()
            .find(|s| s.flight_id == claim.flight_id && s.seat_number == seat_number)
        {
            if holder.passenger_id == claim.passenger_id {
                return Ok(holder.clone());
            }
            return Err(CoreError::SeatTaken(seat_number.to_string()));
        }
        // The boarding pass already prints the current seat.
        if checked_in {
            return Err(CoreError::AlreadyCheckedIn);
        }

        let selection = SeatSelection {
            id: Uuid::new_v4(),
            booking_id: claim.booking_id,
            passenger_id: claim.passenger_id,
            flight_id: claim.flight_id,
            seat_number: seat_number.to_string(),
            seat_class: seat.seat_class,
            extra_charge: seat.extra_price,
            selected_at: Utc::now(),
        };

        state
            .selections
            .retain(|s| !(s.flight_id == claim.flight_id && s.passenger_id == claim.passenger_id));
        state.selections.push(selection.clone());
        if let Some(p) = state.passengers.iter_mut().find(|p| p.id == claim.passenger_id) {
            p.seat_number = Some(selection.seat_number.clone());
        }

        Ok(selection)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert_booking(&self, draft: &BookingDraft) -> CoreResult<BookingDetails> {
        let mut state = self.state.lock().await;

        if state.bookings.values().any(|b| b.pnr == draft.pnr) {
            return Err(CoreError::PnrCollision(draft.pnr.clone()));
        }

        let demand = draft.seat_demand();
        for flight_id in &draft.flight_ids {
            let flight = state
                .flights
                .get(flight_id)
                .ok_or_else(|| CoreError::not_found("Flight", flight_id))?;
            for cabin in CabinClass::ALL {
                let requested = *demand.get(cabin);
                if requested > flight.available(cabin) {
                    return Err(CoreError::InsufficientSeats {
                        flight_id: *flight_id,
                        cabin,
                        requested,
                        available: flight.available(cabin),
                    });
                }
            }
        }

        // Validation passed; from here on nothing can fail.
        let now = Utc::now();
        let booking = Booking {
            id: draft.id,
            pnr: draft.pnr.clone(),
            owner: draft.owner.clone(),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: draft.payment_method.clone(),
            payment_reference: None,
            total_price: draft.total_price,
            discount_amount: draft.discount_amount,
            promo_code: draft.promo_code.clone(),
            currency: draft.currency.clone(),
            contact_email: draft.contact_email.clone(),
            contact_phone: draft.contact_phone.clone(),
            special_requests: draft.special_requests.clone(),
            created_at: now,
            updated_at: now,
        };
        state.bookings.insert(booking.id, booking);
        state.booking_flights.insert(draft.id, draft.flight_ids.clone());

        for details in &draft.passengers {
            for flight_id in &draft.flight_ids {
                state.passengers.push(Passenger {
                    id: Uuid::new_v4(),
                    booking_id: draft.id,
                    flight_id: *flight_id,
                    details: details.clone(),
                    seat_number: None,
                    checked_in: false,
                    boarding_pass_issued: false,
                });
            }
        }

        for item in &draft.ancillaries {
            state.ancillaries.push(AncillaryLineItem {
                id: Uuid::new_v4(),
                booking_id: draft.id,
                service_type: item.service_type,
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }

        for flight_id in &draft.flight_ids {
            if let Some(flight) = state.flights.get_mut(flight_id) {
                for cabin in CabinClass::ALL {
                    *flight.available_seats.get_mut(cabin) -= *demand.get(cabin);
                }
            }
        }

        state
            .details(draft.id)
            .ok_or_else(|| CoreError::not_found("Booking", draft.id))
    }

    async fn find_booking(&self, reference: &BookingRef) -> CoreResult<Option<Booking>> {
        let state = self.state.lock().await;
        Ok(match reference {
            BookingRef::Id(id) => state.bookings.get(id).cloned(),
            BookingRef::Pnr(pnr) => state.bookings.values().find(|b| &b.pnr == pnr).cloned(),
        })
    }

    async fn booking_details(&self, booking_id: Uuid) -> CoreResult<Option<BookingDetails>> {
        Ok(self.state.lock().await.details(booking_id))
    }

    async fn list_bookings(&self, owner: &str, status: Option<BookingStatus>) -> CoreResult<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.owner.as_deref() == Some(owner))
            .filter(|b| status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn confirm_booking(&self, booking_id: Uuid, payment_reference: Option<&str>) -> CoreResult<Booking> {
        let mut state = self.state.lock().await;
        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;
        match booking.status {
            BookingStatus::Pending => {}
            BookingStatus::Cancelled => return Err(CoreError::AlreadyCancelled(booking.pnr.clone())),
            other => {
                return Err(CoreError::InvalidState(format!(
                    "booking {} is {}, only pending bookings can be confirmed",
                    booking.pnr, other
                )))
            }
        }
        booking.status = BookingStatus::Confirmed;
        booking.payment_status = PaymentStatus::Completed;
        booking.payment_reference = payment_reference.map(String::from);
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn cancel_booking(&self, booking_id: Uuid) -> CoreResult<Booking> {
        let mut state = self.state.lock().await;
        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;
        match booking.status {
            BookingStatus::Cancelled => return Err(CoreError::AlreadyCancelled(booking.pnr.clone())),
            BookingStatus::Completed => {
                return Err(CoreError::InvalidState(format!("booking {} is already completed", booking.pnr)))
            }
            BookingStatus::Pending | BookingStatus::Confirmed => {}
        }
        booking.status = BookingStatus::Cancelled;
        if booking.payment_status == PaymentStatus::Completed {
            booking.payment_status = PaymentStatus::Refunded;
        }
        booking.updated_at = Utc::now();
        let cancelled = booking.clone();

        let released: Vec<(Uuid, CabinClass)> = state
            .passengers
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .map(|p| (p.flight_id, p.details.cabin_class))
            .collect();
        for (flight_id, cabin) in released {
            if let Some(flight) = state.flights.get_mut(&flight_id) {
                let capacity = *flight.capacity.get(cabin);
                let available = flight.available_seats.get_mut(cabin);
                *available = (*available + 1).min(capacity);
            }
        }

        state.selections.retain(|s| s.booking_id != booking_id);
        for p in state.passengers.iter_mut().filter(|p| p.booking_id == booking_id) {
            p.seat_number = None;
        }

        let records: Vec<Uuid> = state
            .check_ins
            .iter()
            .filter(|r| r.booking_id == booking_id)
            .map(|r| r.id)
            .collect();
        for pass in state
            .boarding_passes
            .iter_mut()
            .filter(|p| records.contains(&p.check_in_record_id))
        {
            pass.is_valid = false;
        }

        Ok(cancelled)
    }
}

#[async_trait]
impl CheckInRepository for MemoryStore {
    async fn check_in_context(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        flight_id: Uuid,
    ) -> CoreResult<Option<CheckInContext>> {
        let state = self.state.lock().await;
        let Some(passenger) = state
            .passengers
            .iter()
            .find(|p| p.id == passenger_id && p.booking_id == booking_id && p.flight_id == flight_id)
        else {
            return Ok(None);
        };
        let (Some(booking), Some(flight)) = (state.bookings.get(&booking_id), state.flights.get(&flight_id)) else {
            return Ok(None);
        };

        Ok(Some(CheckInContext {
            booking_status: booking.status,
            passenger: passenger.clone(),
            departure_time: flight.departure_time,
            gate: flight.gate.clone(),
            terminal: flight.terminal.clone(),
            seat_class: state
                .selections
                .iter()
                .find(|s| s.passenger_id == passenger_id && s.flight_id == flight_id)
                .map(|s| s.seat_class),
            already_checked_in: state
                .check_ins
                .iter()
                .any(|r| r.passenger_id == passenger_id && r.flight_id == flight_id),
        }))
    }

    async fn record_check_in(&self, issue: &CheckInIssue) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let record = &issue.record;

        let booking = state
            .bookings
            .get(&record.booking_id)
            .ok_or_else(|| CoreError::not_found("Booking", record.booking_id))?;
        if booking.status != BookingStatus::Confirmed {
            return Err(CoreError::InvalidState(format!(
                "booking {} is {}, check-in requires a confirmed booking",
                booking.pnr, booking.status
            )));
        }
        if state
            .check_ins
            .iter()
            .any(|r| r.passenger_id == record.passenger_id && r.flight_id == record.flight_id)
        {
            return Err(CoreError::AlreadyCheckedIn);
        }
        let current_seat = state
            .passengers
            .iter()
            .find(|p| p.id == record.passenger_id)
            .and_then(|p| p.seat_number.as_deref());
        if current_seat != record.seat_number.as_deref() {
            return Err(CoreError::InvalidState("seat changed during check-in, retry".into()));
        }

        state.check_ins.push(record.clone());
        state.boarding_passes.push(issue.boarding_pass.clone());
        if let Some(p) = state.passengers.iter_mut().find(|p| p.id == record.passenger_id) {
            p.checked_in = true;
            p.boarding_pass_issued = true;
        }
        Ok(())
    }

    async fn check_in_record(&self, passenger_id: Uuid, flight_id: Uuid) -> CoreResult<Option<CheckInRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .check_ins
            .iter()
            .find(|r| r.passenger_id == passenger_id && r.flight_id == flight_id)
            .cloned())
    }

    async fn replace_boarding_pass(&self, replacement: &BoardingPass) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        for pass in state.boarding_passes.iter_mut().filter(|p| {
            p.passenger_id == replacement.passenger_id && p.flight_id == replacement.flight_id
        }) {
            pass.is_valid = false;
        }
        state.boarding_passes.push(replacement.clone());
        Ok(())
    }

    async fn check_in_status(&self, booking_id: Uuid) -> CoreResult<Vec<PassengerCheckIn>> {
        let state = self.state.lock().await;
        let mut rows: Vec<PassengerCheckIn> = state
            .passengers
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .filter_map(|p| {
                let flight = state.flights.get(&p.flight_id)?;
                let record = state
                    .check_ins
                    .iter()
                    .find(|r| r.passenger_id == p.id && r.flight_id == p.flight_id);
                Some(PassengerCheckIn {
                    passenger_id: p.id,
                    first_name: p.details.first_name.clone(),
                    last_name: p.details.last_name.clone(),
                    flight_id: flight.id,
                    flight_number: flight.flight_number.clone(),
                    departure_time: flight.departure_time,
                    checked_in: p.checked_in,
                    boarding_pass_issued: p.boarding_pass_issued,
                    boarding_group: record.map(|r| r.boarding_group),
                    gate: record.and_then(|r| r.gate.clone()),
                    terminal: record.and_then(|r| r.terminal.clone()),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.departure_time
                .cmp(&b.departure_time)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(rows)
    }

    async fn boarding_pass(&self, passenger_id: Uuid, flight_id: Uuid) -> CoreResult<Option<BoardingPassView>> {
        let state = self.state.lock().await;
        let Some(pass) = state
            .boarding_passes
            .iter()
            .find(|p| p.passenger_id == passenger_id && p.flight_id == flight_id && p.is_valid)
        else {
            return Ok(None);
        };
        let passenger = state.passengers.iter().find(|p| p.id == passenger_id);
        let flight = state.flights.get(&flight_id);
        let record = state.check_ins.iter().find(|r| r.id == pass.check_in_record_id);
        let (Some(passenger), Some(flight), Some(record)) = (passenger, flight, record) else {
            return Ok(None);
        };
        let Some(booking) = state.bookings.get(&passenger.booking_id) else {
            return Ok(None);
        };

        Ok(Some(BoardingPassView {
            boarding_pass: pass.clone(),
            terminal: record.terminal.clone(),
            first_name: passenger.details.first_name.clone(),
            last_name: passenger.details.last_name.clone(),
            flight_number: flight.flight_number.clone(),
            departure_airport: flight.departure_airport.clone(),
            arrival_airport: flight.arrival_airport.clone(),
            departure_time: flight.departure_time,
            arrival_time: flight.arrival_time,
            pnr: booking.pnr.clone(),
        }))
    }
}
