use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use stratus_core::booking::{BookingRef, BookingStatus};
use stratus_core::checkin::{
    BoardingGroup, BoardingPass, BoardingPassView, CheckInIssue, CheckInRecord, CheckInStatus, PassengerCheckIn,
};
use stratus_core::repository::{BookingRepository, CheckInRepository};
use stratus_core::rules::BookingRules;
use stratus_core::{CoreError, CoreResult};

use crate::fulfillment::issue_boarding_pass;

pub const DEFAULT_CHECK_IN_METHOD: &str = "online";

/// Fails unless `now` lies inside the check-in window of a departure.
pub fn check_window(departure: DateTime<Utc>, now: DateTime<Utc>, rules: &BookingRules) -> CoreResult<()> {
    let until_departure = departure - now;
    if until_departure > Duration::hours(rules.check_in_opens_hours) {
        return Err(CoreError::CheckInNotYetOpen(rules.check_in_opens_hours));
    }
    if until_departure < Duration::hours(rules.check_in_closes_hours) {
        return Err(CoreError::CheckInClosed);
    }
    Ok(())
}

/// Drives passengers from not-checked-in to checked-in and issues boarding passes.
pub struct CheckInService {
    bookings: Arc<dyn BookingRepository>,
    check_ins: Arc<dyn CheckInRepository>,
    rules: BookingRules,
}

impl CheckInService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        check_ins: Arc<dyn CheckInRepository>,
        rules: BookingRules,
    ) -> Self {
        Self {
            bookings,
            check_ins,
            rules,
        }
    }

    pub async fn perform_check_in(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        flight_id: Uuid,
        method: Option<&str>,
    ) -> CoreResult<CheckInIssue> {
        self.perform_check_in_at(booking_id, passenger_id, flight_id, method, Utc::now())
            .await
    }

    pub async fn perform_check_in_at(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        flight_id: Uuid,
        method: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<CheckInIssue> {
        let context = self
            .check_ins
            .check_in_context(booking_id, passenger_id, flight_id)
            .await?
            .ok_or_else(|| {
                CoreError::InvalidState("passenger is not booked on this flight under this booking".to_string())
            })?;
        if context.booking_status != BookingStatus::Confirmed {
            return Err(CoreError::InvalidState(format!(
                "booking is {}, check-in requires a confirmed booking",
                context.booking_status
            )));
        }
        if context.already_checked_in {
            return Err(CoreError::AlreadyCheckedIn);
        }
        check_window(context.departure_time, now, &self.rules)?;

        let boarding_group = BoardingGroup::for_seat_class(context.seat_class);
        let record = CheckInRecord {
            id: Uuid::new_v4(),
            booking_id,
            passenger_id,
            flight_id,
            method: method.unwrap_or(DEFAULT_CHECK_IN_METHOD).to_string(),
            seat_number: context.passenger.seat_number.clone(),
            boarding_group,
            boarding_time: context.departure_time - Duration::minutes(self.rules.boarding_lead_minutes),
            gate: context.gate,
            terminal: context.terminal,
            status: CheckInStatus::CheckedIn,
            checked_in_at: now,
        };
        let issue = CheckInIssue {
            boarding_pass: issue_boarding_pass(&record, now),
            record,
        };

        self.check_ins.record_check_in(&issue).await?;
        info!(
            "Passenger {} checked in on flight {} (group {})",
            passenger_id, flight_id, boarding_group
        );
        Ok(issue)
    }

    pub async fn check_in_status(&self, booking_id: Uuid) -> CoreResult<Vec<PassengerCheckIn>> {
        self.bookings
            .find_booking(&BookingRef::Id(booking_id))
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;
        self.check_ins.check_in_status(booking_id).await
    }

    pub async fn boarding_pass(&self, passenger_id: Uuid, flight_id: Uuid) -> CoreResult<BoardingPassView> {
        self.check_ins
            .boarding_pass(passenger_id, flight_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Boarding pass", passenger_id))
    }

    /// Supersedes the passenger's pass with a new one carrying the current seat, gate and terminal.
    pub async fn reissue_boarding_pass(&self, passenger_id: Uuid, flight_id: Uuid) -> CoreResult<BoardingPass> {
        let mut record = self
            .check_ins
            .check_in_record(passenger_id, flight_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Check-in", passenger_id))?;
        let context = self
            .check_ins
            .check_in_context(record.booking_id, passenger_id, flight_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Check-in", passenger_id))?;
        if context.booking_status != BookingStatus::Confirmed {
            return Err(CoreError::InvalidState(format!(
                "booking is {}, boarding passes require a confirmed booking",
                context.booking_status
            )));
        }
        record.seat_number = context.passenger.seat_number;
        record.gate = context.gate;
        record.terminal = context.terminal;

        let replacement = issue_boarding_pass(&record, Utc::now());
        self.check_ins.replace_boarding_pass(&replacement).await?;
        info!("Boarding pass reissued for passenger {} on flight {}", passenger_id, flight_id);
        Ok(replacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_catalog::SeatService;
    use stratus_core::booking::{BookingDraft, PassengerDetails};
    use stratus_core::flight::{Aircraft, CabinClass, Flight, PerCabin};
    use stratus_core::repository::FlightRepository;
    use stratus_shared::Masked;
    use stratus_store::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        service: CheckInService,
        flight: Flight,
        booking_id: Uuid,
        passenger_id: Uuid,
    }

    async fn fixture(departs_in: Duration, cabin: CabinClass) -> Fixture {
        let store = MemoryStore::new();
        let aircraft = Aircraft {
            id: Uuid::new_v4(),
            model: "E190".to_string(),
            seats: PerCabin::new(4, 8, 60),
        };
        let departure = Utc::now() + departs_in;
        let flight = Flight {
            id: Uuid::new_v4(),
            flight_number: "ST400".to_string(),
            aircraft_id: aircraft.id,
            departure_airport: "SEA".to_string(),
            arrival_airport: "DEN".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(2),
            gate: Some("C4".to_string()),
            terminal: Some("2".to_string()),
            base_prices: PerCabin::new(90000, 45000, 18000),
            available_seats: PerCabin::new(4, 8, 60),
            capacity: PerCabin::new(4, 8, 60),
        };
        store.add_aircraft(aircraft).await;
        store.add_flight(flight.clone()).await;

        let draft = BookingDraft {
            id: Uuid::new_v4(),
            pnr: "CHK001".to_string(),
            owner: None,
            flight_ids: vec![flight.id],
            passengers: vec![PassengerDetails {
                first_name: "Jo".to_string(),
                last_name: "Park".to_string(),
                cabin_class: cabin,
                ..Default::default()
            }],
            ancillaries: vec![],
            total_price: 18000,
            discount_amount: 0,
            promo_code: None,
            currency: "USD".to_string(),
            contact_email: Masked("jo@example.com".to_string()),
            contact_phone: None,
            payment_method: None,
            special_requests: None,
        };
        let details = store.insert_booking(&draft).await.unwrap();

        let service = CheckInService::new(Arc::new(store.clone()), Arc::new(store.clone()), BookingRules::default());
        Fixture {
            store,
            service,
            flight,
            booking_id: details.booking.id,
            passenger_id: details.passengers[0].id,
        }
    }

    async fn confirm(fx: &Fixture) {
        fx.store.confirm_booking(fx.booking_id, Some("pay_1")).await.unwrap();
    }

    async fn check_in(fx: &Fixture) -> CoreResult<CheckInIssue> {
        fx.service
            .perform_check_in(fx.booking_id, fx.passenger_id, fx.flight.id, None)
            .await
    }

    #[test]
    fn test_window_bounds() {
        let rules = BookingRules::default();
        let now = Utc::now();

        assert!(matches!(
            check_window(now + Duration::hours(30), now, &rules),
            Err(CoreError::CheckInNotYetOpen(24))
        ));
        assert!(matches!(
            check_window(now + Duration::minutes(30), now, &rules),
            Err(CoreError::CheckInClosed)
        ));
        assert!(check_window(now + Duration::hours(5), now, &rules).is_ok());
        assert!(check_window(now + Duration::hours(24), now, &rules).is_ok());
        assert!(check_window(now + Duration::hours(1), now, &rules).is_ok());
    }

    #[tokio::test]
    async fn test_check_in_issues_pass_in_window() {
        let fx = fixture(Duration::hours(5), CabinClass::Economy).await;
        confirm(&fx).await;

        let issue = check_in(&fx).await.unwrap();
        assert_eq!(issue.record.boarding_group, BoardingGroup::C);
        assert_eq!(issue.record.boarding_time, fx.flight.departure_time - Duration::minutes(90));
        assert_eq!(issue.record.gate.as_deref(), Some("C4"));
        assert!(issue.boarding_pass.barcode.starts_with("BP"));
        assert!(issue.boarding_pass.boarding_pass_number.starts_with("XXC"));

        let status = fx.service.check_in_status(fx.booking_id).await.unwrap();
        assert_eq!(status.len(), 1);
        assert!(status[0].checked_in);
        assert!(status[0].boarding_pass_issued);

        let view = fx.service.boarding_pass(fx.passenger_id, fx.flight.id).await.unwrap();
        assert_eq!(view.pnr, "CHK001");
        assert_eq!(view.boarding_pass.id, issue.boarding_pass.id);
    }

    #[tokio::test]
    async fn test_second_check_in_is_rejected() {
        let fx = fixture(Duration::hours(5), CabinClass::Economy).await;
        confirm(&fx).await;

        check_in(&fx).await.unwrap();
        let err = check_in(&fx).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyCheckedIn));
    }

    #[tokio::test]
    async fn test_window_is_enforced() {
        let early = fixture(Duration::hours(30), CabinClass::Economy).await;
        confirm(&early).await;
        assert!(matches!(check_in(&early).await, Err(CoreError::CheckInNotYetOpen(_))));

        let late = fixture(Duration::minutes(30), CabinClass::Economy).await;
        confirm(&late).await;
        assert!(matches!(check_in(&late).await, Err(CoreError::CheckInClosed)));
    }

    #[tokio::test]
    async fn test_unconfirmed_or_cancelled_booking_cannot_check_in() {
        let fx = fixture(Duration::hours(5), CabinClass::Economy).await;
        assert!(matches!(check_in(&fx).await, Err(CoreError::InvalidState(_))));

        confirm(&fx).await;
        fx.store.cancel_booking(fx.booking_id).await.unwrap();
        assert!(matches!(check_in(&fx).await, Err(CoreError::InvalidState(_))));

        let err = fx
            .service
            .perform_check_in(fx.booking_id, Uuid::new_v4(), fx.flight.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_boarding_group_follows_selected_seat() {
        let fx = fixture(Duration::hours(5), CabinClass::First).await;
        confirm(&fx).await;
        let seats = SeatService::new(Arc::new(fx.store.clone()), Arc::new(fx.store.clone()));
        seats
            .select_seat(fx.booking_id, fx.passenger_id, fx.flight.id, "1A")
            .await
            .unwrap();

        let issue = check_in(&fx).await.unwrap();
        assert_eq!(issue.record.boarding_group, BoardingGroup::A);
        assert_eq!(issue.record.seat_number.as_deref(), Some("1A"));
        assert!(issue.boarding_pass.boarding_pass_number.starts_with("1AA"));
    }

    #[tokio::test]
    async fn test_reissue_supersedes_previous_pass() {
        let fx = fixture(Duration::hours(5), CabinClass::Economy).await;
        confirm(&fx).await;
        let original = check_in(&fx).await.unwrap().boarding_pass;

        let replacement = fx
            .service
            .reissue_boarding_pass(fx.passenger_id, fx.flight.id)
            .await
            .unwrap();
        assert_ne!(replacement.id, original.id);

        let view = fx.service.boarding_pass(fx.passenger_id, fx.flight.id).await.unwrap();
        assert_eq!(view.boarding_pass.id, replacement.id);

        let err = fx
            .service
            .reissue_boarding_pass(Uuid::new_v4(), fx.flight.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_reissue_picks_up_gate_change() {
        let fx = fixture(Duration::hours(5), CabinClass::Economy).await;
        confirm(&fx).await;
        let seats = SeatService::new(Arc::new(fx.store.clone()), Arc::new(fx.store.clone()));
        seats
            .select_seat(fx.booking_id, fx.passenger_id, fx.flight.id, "12C")
            .await
            .unwrap();
        check_in(&fx).await.unwrap();

        let mut moved = fx.store.get_flight(fx.flight.id).await.unwrap().unwrap();
        moved.gate = Some("D7".to_string());
        fx.store.add_flight(moved).await;

        let replacement = fx
            .service
            .reissue_boarding_pass(fx.passenger_id, fx.flight.id)
            .await
            .unwrap();
        assert_eq!(replacement.gate.as_deref(), Some("D7"));
        assert_eq!(replacement.seat_number.as_deref(), Some("12C"));
    }

    #[tokio::test]
    async fn test_seat_is_frozen_after_check_in() {
        let fx = fixture(Duration::hours(5), CabinClass::Economy).await;
        confirm(&fx).await;
        let seats = SeatService::new(Arc::new(fx.store.clone()), Arc::new(fx.store.clone()));
        seats
            .select_seat(fx.booking_id, fx.passenger_id, fx.flight.id, "12C")
            .await
            .unwrap();
        check_in(&fx).await.unwrap();

        let err = seats
            .select_seat(fx.booking_id, fx.passenger_id, fx.flight.id, "13A")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyCheckedIn));
        // Re-selecting the held seat is still a no-op.
        seats
            .select_seat(fx.booking_id, fx.passenger_id, fx.flight.id, "12C")
            .await
            .unwrap();

        let view = fx.service.boarding_pass(fx.passenger_id, fx.flight.id).await.unwrap();
        assert_eq!(view.boarding_pass.seat_number.as_deref(), Some("12C"));
        let map = seats.seat_map_for_flight(fx.flight.id).await.unwrap();
        let held = map.seats.iter().find(|s| s.seat_number == "12C").unwrap();
        assert_eq!(held.passenger_id, Some(fx.passenger_id));
        let released = map.seats.iter().find(|s| s.seat_number == "13A").unwrap();
        assert!(!released.is_selected);
    }

    #[tokio::test]
    async fn test_cancel_invalidates_boarding_pass() {
        let fx = fixture(Duration::hours(5), CabinClass::Economy).await;
        confirm(&fx).await;
        check_in(&fx).await.unwrap();

        fx.store.cancel_booking(fx.booking_id).await.unwrap();

        let err = fx
            .service
            .boarding_pass(fx.passenger_id, fx.flight.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        let err = fx
            .service
            .reissue_boarding_pass(fx.passenger_id, fx.flight.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_pass_lookup_before_check_in_is_not_found() {
        let fx = fixture(Duration::hours(5), CabinClass::Economy).await;
        let err = fx
            .service
            .boarding_pass(fx.passenger_id, fx.flight.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));

        let flight = fx.store.get_flight(fx.flight.id).await.unwrap().unwrap();
        assert_eq!(flight.available(CabinClass::Economy), 59);
    }
}
