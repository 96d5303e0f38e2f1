use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use stratus_core::booking::BookingStatus;
use stratus_core::flight::CabinClass;
use stratus_core::repository::SeatRepository;
use stratus_core::seat::{SeatClaim, SeatMapEntry, SeatSelection};
use stratus_core::{CoreError, CoreResult};

use crate::pg::{dependency, parse_char, parse_column, unique_violation};

const SEAT_COLUMNS: &str = r#"
    sm.aircraft_id, sm.seat_number, sm.seat_row, sm.seat_column, sm.seat_class,
    sm.seat_type, sm.extra_price, sm.is_available_for_selection
"#;

const SELECTION_COLUMNS: &str = r#"
    id, booking_id, passenger_id, flight_id, seat_number, seat_class, extra_charge, selected_at
"#;

fn seat_from_row(row: &PgRow) -> Result<SeatMapEntry, sqlx::Error> {
    Ok(SeatMapEntry {
        aircraft_id: row.try_get("aircraft_id")?,
        seat_number: row.try_get("seat_number")?,
        row: row.try_get("seat_row")?,
        column: parse_char("seat_column", row.try_get("seat_column")?)?,
        seat_class: parse_column("seat_class", row.try_get("seat_class")?)?,
        seat_type: parse_column("seat_type", row.try_get("seat_type")?)?,
        extra_price: row.try_get("extra_price")?,
        selectable: row.try_get("is_available_for_selection")?,
    })
}

pub(crate) fn selection_from_row(row: &PgRow) -> Result<SeatSelection, sqlx::Error> {
    Ok(SeatSelection {
        id: row.try_get("id")?,
        booking_id: row.try_get("booking_id")?,
        passenger_id: row.try_get("passenger_id")?,
        flight_id: row.try_get("flight_id")?,
        seat_number: row.try_get("seat_number")?,
        seat_class: parse_column("seat_class", row.try_get("seat_class")?)?,
        extra_charge: row.try_get("extra_charge")?,
        selected_at: row.try_get("selected_at")?,
    })
}

fn claimant_from_row(row: &PgRow) -> Result<(CabinClass, BookingStatus, String, bool), sqlx::Error> {
    Ok((
        parse_column("cabin_class", row.try_get("cabin_class")?)?,
        parse_column("status", row.try_get("status")?)?,
        row.try_get("pnr")?,
        row.try_get("checked_in")?,
    ))
}

pub struct PostgresSeatRepository {
    pub pool: PgPool,
}

#[async_trait]
impl SeatRepository for PostgresSeatRepository {
    async fn seat_map(&self, aircraft_id: Uuid) -> CoreResult<Vec<SeatMapEntry>> {
        let sql = format!(
            "SELECT {} FROM seat_maps sm WHERE sm.aircraft_id = $1 ORDER BY sm.seat_row, sm.seat_column",
            SEAT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(aircraft_id)
            .fetch_all(&self.pool)
            .await
            .map_err(dependency)?;

        rows.iter()
            .map(seat_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(dependency)
    }

    async fn insert_seat_map(&self, aircraft_id: Uuid, seats: &[SeatMapEntry]) -> CoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(dependency)?;

        // Serialises concurrent lazy generation for the same aircraft.
        sqlx::query("SELECT id FROM aircraft WHERE id = $1 FOR UPDATE")
            .bind(aircraft_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(dependency)?
            .ok_or_else(|| CoreError::not_found("Aircraft", aircraft_id))?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seat_maps WHERE aircraft_id = $1")
            .bind(aircraft_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(dependency)?;
        if existing > 0 {
            return Ok(false);
        }

        for seat in seats {
            sqlx::query(
                r#"
                INSERT INTO seat_maps
                    (aircraft_id, seat_number, seat_row, seat_column, seat_class, seat_type, extra_price, is_available_for_selection)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(aircraft_id)
            .bind(&seat.seat_number)
            .bind(seat.row)
            .bind(seat.column.to_string())
            .bind(seat.seat_class.as_str())
            .bind(seat.seat_type.as_str())
            .bind(seat.extra_price)
            .bind(seat.selectable)
            .execute(&mut *tx)
            .await
            .map_err(dependency)?;
        }

        tx.commit().await.map_err(dependency)?;
        info!("Stored {} seats for aircraft {}", seats.len(), aircraft_id);
        Ok(true)
    }

    async fn set_seat_selectable(&self, aircraft_id: Uuid, seat_number: &str, selectable: bool) -> CoreResult<()> {
        let affected = sqlx::query(
            "UPDATE seat_maps SET is_available_for_selection = $3 WHERE aircraft_id = $1 AND seat_number = $2",
        )
        .bind(aircraft_id)
        .bind(seat_number)
        .bind(selectable)
        .execute(&self.pool)
        .await
        .map_err(dependency)?
        .rows_affected();

        if affected == 0 {
            return Err(CoreError::SeatNotFound(seat_number.to_string()));
        }
        Ok(())
    }

    async fn flight_selections(&self, flight_id: Uuid) -> CoreResult<Vec<SeatSelection>> {
        let sql = format!("SELECT {} FROM seat_selections WHERE flight_id = $1", SELECTION_COLUMNS);
        let rows = sqlx::query(&sql)
            .bind(flight_id)
            .fetch_all(&self.pool)
            .await
            .map_err(dependency)?;

        rows.iter()
            .map(selection_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(dependency)
    }

    async fn booking_selections(&self, booking_id: Uuid) -> CoreResult<Vec<SeatSelection>> {
        let sql = format!(
            "SELECT {} FROM seat_selections WHERE booking_id = $1 ORDER BY selected_at",
            SELECTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await
            .map_err(dependency)?;

        rows.iter()
            .map(selection_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(dependency)
    }

    async fn claim_seat(&self, claim: &SeatClaim) -> CoreResult<SeatSelection> {
        let seat_number = claim.seat.seat_number.as_str();
        let mut tx = self.pool.begin().await.map_err(dependency)?;

        // Every claim on a flight queues behind this lock.
        let aircraft_id: Uuid = sqlx::query_scalar("SELECT aircraft_id FROM flights WHERE id = $1 FOR UPDATE")
            .bind(claim.flight_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(dependency)?
            .ok_or_else(|| CoreError::not_found("Flight", claim.flight_id))?;

        let owner = sqlx::query(
            r#"
            SELECT p.cabin_class, p.checked_in, b.status, b.pnr
            FROM passengers p
            JOIN bookings b ON b.id = p.booking_id
            WHERE p.id = $1 AND p.booking_id = $2 AND p.flight_id = $3
            FOR SHARE OF b, p
            "#,
        )
        .bind(claim.passenger_id)
        .bind(claim.booking_id)
        .bind(claim.flight_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(dependency)?
        .ok_or_else(|| CoreError::not_found("Passenger", claim.passenger_id))?;

        let (cabin, status, pnr, checked_in) = claimant_from_row(&owner).map_err(dependency)?;
        if status == BookingStatus::Cancelled {
            return Err(CoreError::InvalidState(format!("booking {} is cancelled", pnr)));
        }

        let sql = format!(
            "SELECT {} FROM seat_maps sm WHERE sm.aircraft_id = $1 AND sm.seat_number = $2",
            SEAT_COLUMNS
        );
        let seat = sqlx::query(&sql)
            .bind(aircraft_id)
            .bind(seat_number)
            .fetch_optional(&mut *tx)
            .await
            .map_err(dependency)?
            .as_ref()
            .map(seat_from_row)
            .transpose()
            .map_err(dependency)?
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

        let sql = format!(
            "SELECT {} FROM seat_selections WHERE flight_id = $1 AND seat_number = $2",
            SELECTION_COLUMNS
        );
        let holder = sqlx::query(&sql)
            .bind(claim.flight_id)
            .bind(seat_number)
            .fetch_optional(&mut *tx)
            .await
            .map_err(dependency)?
            .as_ref()
            .map(selection_from_row)
            .transpose()
            .map_err(dependency)?;
        if let Some(holder) = holder {
            if holder.passenger_id == claim.passenger_id {
                return Ok(holder);
            }
            return Err(CoreError::SeatTaken(seat_number.to_string()));
        }
        // The boarding pass already prints the current seat.
        if checked_in {
            return Err(CoreError::AlreadyCheckedIn);
        }

        sqlx::query("DELETE FROM seat_selections WHERE flight_id = $1 AND passenger_id = $2")
            .bind(claim.flight_id)
            .bind(claim.passenger_id)
            .execute(&mut *tx)
            .await
            .map_err(dependency)?;

        let sql = format!(
            r#"
            INSERT INTO seat_selections
                (id, booking_id, passenger_id, flight_id, seat_number, seat_class, extra_charge, selected_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            SELECTION_COLUMNS
        );
        let selection = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(claim.booking_id)
            .bind(claim.passenger_id)
            .bind(claim.flight_id)
            .bind(seat_number)
            .bind(seat.seat_class.as_str())
            .bind(seat.extra_price)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => CoreError::SeatTaken(seat_number.to_string()),
                None => dependency(e),
            })?;
        let selection = selection_from_row(&selection).map_err(dependency)?;

        sqlx::query("UPDATE passengers SET seat_number = $2 WHERE id = $1")
            .bind(claim.passenger_id)
            .bind(seat_number)
            .execute(&mut *tx)
            .await
            .map_err(dependency)?;

        tx.commit().await.map_err(dependency)?;
        Ok(selection)
    }
}
