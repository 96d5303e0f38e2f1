use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use stratus_core::flight::{Aircraft, Flight, PerCabin};
use stratus_core::repository::FlightRepository;
use stratus_core::CoreResult;

use crate::pg::dependency;

pub(crate) const FLIGHT_COLUMNS: &str = r#"
    f.id, f.flight_number, f.aircraft_id, f.departure_airport, f.arrival_airport,
    f.departure_time, f.arrival_time, f.gate, f.terminal,
    f.first_class_price, f.business_class_price, f.economy_price,
    f.available_first_class, f.available_business_class, f.available_economy,
    a.first_class_seats, a.business_class_seats, a.economy_class_seats
"#;

pub(crate) fn flight_from_row(row: &PgRow) -> Result<Flight, sqlx::Error> {
    Ok(Flight {
        id: row.try_get("id")?,
        flight_number: row.try_get("flight_number")?,
        aircraft_id: row.try_get("aircraft_id")?,
        departure_airport: row.try_get::<String, _>("departure_airport")?.trim().to_string(),
        arrival_airport: row.try_get::<String, _>("arrival_airport")?.trim().to_string(),
        departure_time: row.try_get("departure_time")?,
        arrival_time: row.try_get("arrival_time")?,
        gate: row.try_get("gate")?,
        terminal: row.try_get("terminal")?,
        base_prices: PerCabin::new(
            row.try_get("first_class_price")?,
            row.try_get("business_class_price")?,
            row.try_get("economy_price")?,
        ),
        available_seats: PerCabin::new(
            row.try_get("available_first_class")?,
            row.try_get("available_business_class")?,
            row.try_get("available_economy")?,
        ),
        capacity: PerCabin::new(
            row.try_get("first_class_seats")?,
            row.try_get("business_class_seats")?,
            row.try_get("economy_class_seats")?,
        ),
    })
}

fn aircraft_from_row(row: &PgRow) -> Result<Aircraft, sqlx::Error> {
    Ok(Aircraft {
        id: row.try_get("id")?,
        model: row.try_get("model")?,
        seats: PerCabin::new(
            row.try_get("first_class_seats")?,
            row.try_get("business_class_seats")?,
            row.try_get("economy_class_seats")?,
        ),
    })
}

pub struct PostgresFlightRepository {
    pub pool: PgPool,
}

#[async_trait]
impl FlightRepository for PostgresFlightRepository {
    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<Flight>> {
        let sql = format!(
            "SELECT {} FROM flights f JOIN aircraft a ON a.id = f.aircraft_id WHERE f.id = $1",
            FLIGHT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(dependency)?;

        row.as_ref().map(flight_from_row).transpose().map_err(dependency)
    }

    async fn get_aircraft(&self, id: Uuid) -> CoreResult<Option<Aircraft>> {
        let row = sqlx::query(
            r#"
            SELECT id, model, first_class_seats, business_class_seats, economy_class_seats
            FROM aircraft
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(dependency)?;

        row.as_ref().map(aircraft_from_row).transpose().map_err(dependency)
    }
}
