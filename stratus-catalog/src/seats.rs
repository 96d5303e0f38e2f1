use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use stratus_core::flight::Flight;
use stratus_core::repository::{FlightRepository, SeatRepository};
use stratus_core::seat::{FlightSeatMap, SeatAvailability, SeatClaim, SeatMapEntry, SeatSelection};
use stratus_core::{CoreError, CoreResult};

use crate::seatmap::generate_seat_map;

/// Owns seat layouts and arbitrates seat claims.
pub struct SeatService {
    flights: Arc<dyn FlightRepository>,
    seats: Arc<dyn SeatRepository>,
}

impl SeatService {
    pub fn new(flights: Arc<dyn FlightRepository>, seats: Arc<dyn SeatRepository>) -> Self {
        Self { flights, seats }
    }

    /// Generates and stores the map of an aircraft that has none yet.
    pub async fn initialize_seat_map(&self, aircraft_id: Uuid) -> CoreResult<usize> {
        let aircraft = self
            .flights
            .get_aircraft(aircraft_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Aircraft", aircraft_id))?;

        let seats = generate_seat_map(&aircraft);
        if !self.seats.insert_seat_map(aircraft_id, &seats).await? {
            return Err(CoreError::SeatMapExists(aircraft_id));
        }
        info!("Seat map initialised for aircraft {} ({} seats)", aircraft.model, seats.len());
        Ok(seats.len())
    }

    /// Static layout joined with the flight's active selections. Generates the
    /// layout on first access.
    pub async fn seat_map_for_flight(&self, flight_id: Uuid) -> CoreResult<FlightSeatMap> {
        let flight = self.flight(flight_id).await?;
        let layout = self.layout(&flight).await?;

        let holders: HashMap<String, Uuid> = self
            .seats
            .flight_selections(flight_id)
            .await?
            .into_iter()
            .map(|s| (s.seat_number, s.passenger_id))
            .collect();

        let seats = layout
            .into_iter()
            .map(|seat| {
                let passenger_id = holders.get(&seat.seat_number).copied();
                SeatAvailability {
                    seat_number: seat.seat_number,
                    row: seat.row,
                    column: seat.column,
                    seat_class: seat.seat_class,
                    seat_type: seat.seat_type,
                    extra_price: seat.extra_price,
                    selectable: seat.selectable,
                    is_selected: passenger_id.is_some(),
                    passenger_id,
                }
            })
            .collect();

        Ok(FlightSeatMap {
            flight_id,
            flight_number: flight.flight_number,
            aircraft_id: flight.aircraft_id,
            seats,
        })
    }

    /// Claims `seat_number` for a passenger, releasing any seat the passenger
    /// held on the flight before.
    pub async fn select_seat(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        flight_id: Uuid,
        seat_number: &str,
    ) -> CoreResult<SeatSelection> {
        let seat_number = seat_number.trim().to_uppercase();
        if seat_number.is_empty() {
            return Err(CoreError::ValidationError("seatNumber is required".to_string()));
        }

        let flight = self.flight(flight_id).await?;
        let seat = self
            .layout(&flight)
            .await?
            .into_iter()
            .find(|s| s.seat_number == seat_number)
            .ok_or_else(|| CoreError::SeatNotFound(seat_number.clone()))?;
        if !seat.selectable {
            return Err(CoreError::SeatUnavailable(seat_number));
        }

        let selection = self
            .seats
            .claim_seat(&SeatClaim {
                booking_id,
                passenger_id,
                flight_id,
                seat,
            })
            .await?;
        info!(
            "Seat {} on {} claimed by passenger {}",
            selection.seat_number, flight.flight_number, passenger_id
        );
        Ok(selection)
    }

    pub async fn booking_selections(&self, booking_id: Uuid) -> CoreResult<Vec<SeatSelection>> {
        self.seats.booking_selections(booking_id).await
    }

    /// Blocks or unblocks a seat for selection. The layout itself never changes.
    pub async fn set_seat_blocked(&self, aircraft_id: Uuid, seat_number: &str, blocked: bool) -> CoreResult<()> {
        let seat_number = seat_number.trim().to_uppercase();
        self.seats
            .set_seat_selectable(aircraft_id, &seat_number, !blocked)
            .await?;
        info!("Seat {} on aircraft {} blocked={}", seat_number, aircraft_id, blocked);
        Ok(())
    }

    async fn flight(&self, flight_id: Uuid) -> CoreResult<Flight> {
        self.flights
            .get_flight(flight_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Flight", flight_id))
    }

    async fn layout(&self, flight: &Flight) -> CoreResult<Vec<SeatMapEntry>> {
        let seats = self.seats.seat_map(flight.aircraft_id).await?;
        if !seats.is_empty() {
            return Ok(seats);
        }

        let aircraft = self
            .flights
            .get_aircraft(flight.aircraft_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Aircraft", flight.aircraft_id))?;
        let generated = generate_seat_map(&aircraft);
        if self.seats.insert_seat_map(aircraft.id, &generated).await? {
            debug!("Generated seat map for aircraft {} on first access", aircraft.id);
        }
        // Re-read so a concurrent generator's map wins consistently.
        self.seats.seat_map(aircraft.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use stratus_core::booking::{BookingDraft, PassengerDetails};
    use stratus_core::flight::{Aircraft, CabinClass, PerCabin};
    use stratus_core::repository::BookingRepository;
    use stratus_shared::Masked;
    use stratus_store::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        service: SeatService,
        flight: Flight,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let aircraft = Aircraft {
            id: Uuid::new_v4(),
            model: "A320".to_string(),
            seats: PerCabin::new(4, 8, 60),
        };
        let departure = Utc::now() + Duration::days(3);
        let flight = Flight {
            id: Uuid::new_v4(),
            flight_number: "ST200".to_string(),
            aircraft_id: aircraft.id,
            departure_airport: "SFO".to_string(),
            arrival_airport: "ORD".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(4),
            gate: None,
            terminal: None,
            base_prices: PerCabin::new(80000, 40000, 15000),
            available_seats: PerCabin::new(4, 8, 60),
            capacity: PerCabin::new(4, 8, 60),
        };
        store.add_aircraft(aircraft).await;
        store.add_flight(flight.clone()).await;

        let service = SeatService::new(Arc::new(store.clone()), Arc::new(store.clone()));
        Fixture { store, service, flight }
    }

    /// Books `names.len()` passengers on the fixture flight; returns (booking id, passenger ids).
    async fn book(fx: &Fixture, pnr: &str, cabin: CabinClass, names: &[&str]) -> (Uuid, Vec<Uuid>) {
        let draft = BookingDraft {
            id: Uuid::new_v4(),
            pnr: pnr.to_string(),
            owner: None,
            flight_ids: vec![fx.flight.id],
            passengers: names
                .iter()
                .map(|n| PassengerDetails {
                    first_name: n.to_string(),
                    last_name: "Traveller".to_string(),
                    cabin_class: cabin,
                    ..Default::default()
                })
                .collect(),
            ancillaries: vec![],
            total_price: 0,
            discount_amount: 0,
            promo_code: None,
            currency: "USD".to_string(),
            contact_email: Masked("t@example.com".to_string()),
            contact_phone: None,
            payment_method: None,
            special_requests: None,
        };
        let details = fx.store.insert_booking(&draft).await.unwrap();
        (details.booking.id, details.passengers.iter().map(|p| p.id).collect())
    }

    #[tokio::test]
    async fn test_seat_map_is_generated_lazily_once() {
        let fx = fixture().await;

        let first = fx.service.seat_map_for_flight(fx.flight.id).await.unwrap();
        let second = fx.service.seat_map_for_flight(fx.flight.id).await.unwrap();
        assert_eq!(first.seats.len(), 4 + 8 + 60);
        assert_eq!(second.seats.len(), first.seats.len());
        assert!(first.seats.iter().all(|s| !s.is_selected));

        let err = fx.service.initialize_seat_map(fx.flight.aircraft_id).await.unwrap_err();
        assert!(matches!(err, CoreError::SeatMapExists(_)));
    }

    #[tokio::test]
    async fn test_seat_taken_by_other_passenger() {
        let fx = fixture().await;
        let (booking, pax) = book(&fx, "SEAT01", CabinClass::Economy, &["Ann", "Bob"]).await;

        fx.service.select_seat(booking, pax[0], fx.flight.id, "12C").await.unwrap();
        let err = fx
            .service
            .select_seat(booking, pax[1], fx.flight.id, "12C")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SeatTaken(ref s) if s == "12C"));

        let map = fx.service.seat_map_for_flight(fx.flight.id).await.unwrap();
        let seat = map.seats.iter().find(|s| s.seat_number == "12C").unwrap();
        assert!(seat.is_selected);
        assert_eq!(seat.passenger_id, Some(pax[0]));
    }

    #[tokio::test]
    async fn test_reselect_releases_previous_seat() {
        let fx = fixture().await;
        let (booking, pax) = book(&fx, "SEAT02", CabinClass::Economy, &["Ann"]).await;

        fx.service.select_seat(booking, pax[0], fx.flight.id, "8A").await.unwrap();
        fx.service.select_seat(booking, pax[0], fx.flight.id, "9F").await.unwrap();
        // Holding the same seat again is not a conflict.
        fx.service.select_seat(booking, pax[0], fx.flight.id, "9f").await.unwrap();

        let selections = fx.service.booking_selections(booking).await.unwrap();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].seat_number, "9F");

        let details = fx.store.booking_details(booking).await.unwrap().unwrap();
        assert_eq!(details.passengers[0].seat_number.as_deref(), Some("9F"));
    }

    #[tokio::test]
    async fn test_seat_failures_are_distinguished() {
        let fx = fixture().await;
        let (booking, pax) = book(&fx, "SEAT03", CabinClass::Economy, &["Ann"]).await;

        let err = fx.service.select_seat(booking, pax[0], fx.flight.id, "99Z").await.unwrap_err();
        assert!(matches!(err, CoreError::SeatNotFound(_)));

        fx.service.seat_map_for_flight(fx.flight.id).await.unwrap();
        fx.service.set_seat_blocked(fx.flight.aircraft_id, "10A", true).await.unwrap();
        let err = fx.service.select_seat(booking, pax[0], fx.flight.id, "10A").await.unwrap_err();
        assert!(matches!(err, CoreError::SeatUnavailable(_)));

        fx.service.set_seat_blocked(fx.flight.aircraft_id, "10A", false).await.unwrap();
        let selection = fx.service.select_seat(booking, pax[0], fx.flight.id, "10A").await.unwrap();
        assert_eq!(selection.extra_charge, crate::seatmap::EXIT_ROW_SURCHARGE);
    }

    #[tokio::test]
    async fn test_cabin_must_match_seat_class() {
        let fx = fixture().await;
        let (booking, pax) = book(&fx, "SEAT04", CabinClass::Economy, &["Ann"]).await;

        let err = fx.service.select_seat(booking, pax[0], fx.flight.id, "1A").await.unwrap_err();
        assert!(matches!(err, CoreError::CabinMismatch { .. }));
    }

    #[tokio::test]
    async fn test_unknown_passenger_is_not_found() {
        let fx = fixture().await;
        let (booking, _) = book(&fx, "SEAT05", CabinClass::Economy, &["Ann"]).await;

        let err = fx
            .service
            .select_seat(booking, Uuid::new_v4(), fx.flight.id, "12A")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "Passenger", .. }));
    }
}
