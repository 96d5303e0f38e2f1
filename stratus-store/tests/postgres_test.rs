//! Postgres repository tests. Run with a disposable database:
//! `DATABASE_URL=postgres://... cargo test -p stratus-store -- --ignored`

use chrono::{Duration, Utc};
use uuid::Uuid;

use stratus_core::booking::{BookingDraft, BookingStatus, PassengerDetails};
use stratus_core::checkin::{BoardingGroup, BoardingPass, CheckInIssue, CheckInRecord, CheckInStatus};
use stratus_core::flight::{CabinClass, Flight};
use stratus_core::seat::{SeatClaim, SeatMapEntry, SeatType};
use stratus_core::CoreError;
use stratus_shared::Masked;
use stratus_store::{DbClient, Repositories};

struct Fixture {
    repos: Repositories,
    flight_id: Uuid,
    seats: Vec<SeatMapEntry>,
}

async fn fixture(economy: i32) -> Fixture {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let db = DbClient::new(&url, 5).await.unwrap();
    db.migrate().await.unwrap();

    let aircraft_id = Uuid::new_v4();
    sqlx::query("INSERT INTO aircraft (id, model, economy_class_seats) VALUES ($1, 'E175', $2)")
        .bind(aircraft_id)
        .bind(economy)
        .execute(&db.pool)
        .await
        .unwrap();

    let flight_id = Uuid::new_v4();
    let departure = Utc::now() + Duration::hours(6);
    sqlx::query(
        r#"
        INSERT INTO flights
            (id, flight_number, aircraft_id, departure_airport, arrival_airport, departure_time, arrival_time,
             gate, terminal, economy_price, available_economy)
        VALUES ($1, 'ST900', $2, 'PDX', 'SFO', $3, $4, 'B2', '1', 15000, $5)
        "#,
    )
    .bind(flight_id)
    .bind(aircraft_id)
    .bind(departure)
    .bind(departure + Duration::hours(2))
    .bind(economy)
    .execute(&db.pool)
    .await
    .unwrap();

    let seats: Vec<SeatMapEntry> = ['A', 'B', 'C']
        .into_iter()
        .map(|column| SeatMapEntry {
            aircraft_id,
            seat_number: format!("10{}", column),
            row: 10,
            column,
            seat_class: CabinClass::Economy,
            seat_type: SeatType::Window,
            extra_price: 0,
            selectable: true,
        })
        .collect();
    let repos = db.repositories();
    assert!(repos.seats.insert_seat_map(aircraft_id, &seats).await.unwrap());

    Fixture {
        repos,
        flight_id,
        seats,
    }
}

fn draft(flight_id: Uuid, passengers: usize) -> BookingDraft {
    BookingDraft {
        id: Uuid::new_v4(),
        pnr: Uuid::new_v4().simple().to_string()[..6].to_uppercase(),
        owner: None,
        flight_ids: vec![flight_id],
        passengers: (0..passengers)
            .map(|i| PassengerDetails {
                first_name: format!("Pax{}", i),
                last_name: "Lee".to_string(),
                cabin_class: CabinClass::Economy,
                ..Default::default()
            })
            .collect(),
        ancillaries: vec![],
        total_price: 15000 * passengers as i64,
        discount_amount: 0,
        promo_code: None,
        currency: "USD".to_string(),
        contact_email: Masked("lee@example.com".to_string()),
        contact_phone: None,
        payment_method: None,
        special_requests: None,
    }
}

async fn economy_left(fx: &Fixture) -> i32 {
    let flight: Flight = fx.repos.flights.get_flight(fx.flight_id).await.unwrap().unwrap();
    flight.available(CabinClass::Economy)
}

fn claim(fx: &Fixture, booking_id: Uuid, passenger_id: Uuid, seat: usize) -> SeatClaim {
    SeatClaim {
        booking_id,
        passenger_id,
        flight_id: fx.flight_id,
        seat: fx.seats[seat].clone(),
    }
}

fn issue(booking_id: Uuid, passenger_id: Uuid, flight_id: Uuid, seat: Option<&str>) -> CheckInIssue {
    let now = Utc::now();
    let record = CheckInRecord {
        id: Uuid::new_v4(),
        booking_id,
        passenger_id,
        flight_id,
        method: "online".to_string(),
        seat_number: seat.map(String::from),
        boarding_group: BoardingGroup::C,
        boarding_time: now + Duration::hours(5),
        gate: Some("B2".to_string()),
        terminal: Some("1".to_string()),
        status: CheckInStatus::CheckedIn,
        checked_in_at: now,
    };
    let boarding_pass = BoardingPass {
        id: Uuid::new_v4(),
        check_in_record_id: record.id,
        passenger_id,
        flight_id,
        barcode: format!("BP{}", Uuid::new_v4().simple()),
        boarding_pass_number: Uuid::new_v4().simple().to_string()[..12].to_uppercase(),
        seat_number: record.seat_number.clone(),
        boarding_group: record.boarding_group,
        boarding_time: record.boarding_time,
        gate: record.gate.clone(),
        is_valid: true,
        issued_at: now,
    };
    CheckInIssue { record, boarding_pass }
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn test_booking_counters_survive_create_and_cancel() {
    let fx = fixture(3).await;

    let first = fx.repos.bookings.insert_booking(&draft(fx.flight_id, 2)).await.unwrap();
    assert_eq!(economy_left(&fx).await, 1);

    let err = fx.repos.bookings.insert_booking(&draft(fx.flight_id, 2)).await.unwrap_err();
    assert!(matches!(err, CoreError::InsufficientSeats { requested: 2, available: 1, .. }));
    assert_eq!(economy_left(&fx).await, 1);

    let cancelled = fx.repos.bookings.cancel_booking(first.booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(economy_left(&fx).await, 3);

    let err = fx.repos.bookings.cancel_booking(first.booking.id).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyCancelled(_)));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn test_duplicate_pnr_is_a_collision() {
    let fx = fixture(3).await;
    let original = draft(fx.flight_id, 1);
    fx.repos.bookings.insert_booking(&original).await.unwrap();

    let mut clash = draft(fx.flight_id, 1);
    clash.pnr = original.pnr.clone();
    let err = fx.repos.bookings.insert_booking(&clash).await.unwrap_err();
    assert!(matches!(err, CoreError::PnrCollision(_)));
    assert_eq!(economy_left(&fx).await, 2);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn test_seat_goes_to_exactly_one_passenger() {
    let fx = fixture(3).await;
    let a = fx.repos.bookings.insert_booking(&draft(fx.flight_id, 1)).await.unwrap();
    let b = fx.repos.bookings.insert_booking(&draft(fx.flight_id, 1)).await.unwrap();
    let (pa, pb) = (a.passengers[0].id, b.passengers[0].id);

    let mut handles = Vec::new();
    for (booking_id, passenger_id) in [(a.booking.id, pa), (b.booking.id, pb)] {
        let seats = fx.repos.seats.clone();
        let req = claim(&fx, booking_id, passenger_id, 0);
        handles.push(tokio::spawn(async move { seats.claim_seat(&req).await }));
    }
    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert!(matches!(e, CoreError::SeatTaken(_))),
        }
    }
    assert_eq!(winners, 1);

    let held = fx.repos.seats.flight_selections(fx.flight_id).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].seat_number, "10A");
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn test_check_in_freezes_seat_until_cancel() {
    let fx = fixture(3).await;
    let details = fx.repos.bookings.insert_booking(&draft(fx.flight_id, 1)).await.unwrap();
    let (booking_id, passenger_id) = (details.booking.id, details.passengers[0].id);
    fx.repos.bookings.confirm_booking(booking_id, Some("pay_pg")).await.unwrap();
    fx.repos
        .seats
        .claim_seat(&claim(&fx, booking_id, passenger_id, 0))
        .await
        .unwrap();

    let stale = issue(booking_id, passenger_id, fx.flight_id, None);
    let err = fx.repos.check_ins.record_check_in(&stale).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));

    let first = issue(booking_id, passenger_id, fx.flight_id, Some("10A"));
    fx.repos.check_ins.record_check_in(&first).await.unwrap();
    let again = issue(booking_id, passenger_id, fx.flight_id, Some("10A"));
    let err = fx.repos.check_ins.record_check_in(&again).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyCheckedIn));

    let err = fx
        .repos
        .seats
        .claim_seat(&claim(&fx, booking_id, passenger_id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AlreadyCheckedIn));

    let view = fx
        .repos
        .check_ins
        .boarding_pass(passenger_id, fx.flight_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.boarding_pass.seat_number.as_deref(), Some("10A"));

    fx.repos.bookings.cancel_booking(booking_id).await.unwrap();
    assert!(fx
        .repos
        .check_ins
        .boarding_pass(passenger_id, fx.flight_id)
        .await
        .unwrap()
        .is_none());
}
