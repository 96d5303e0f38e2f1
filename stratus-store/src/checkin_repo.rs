use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use stratus_core::booking::BookingStatus;
use stratus_core::checkin::{
    BoardingPass, BoardingPassView, CheckInContext, CheckInIssue, CheckInRecord, PassengerCheckIn,
};
use stratus_core::flight::CabinClass;
use stratus_core::repository::CheckInRepository;
use stratus_core::{CoreError, CoreResult};

use crate::booking_repo::{passenger_from_row, PASSENGER_COLUMNS};
use crate::pg::{dependency, parse_column, unique_violation};

const RECORD_COLUMNS: &str = r#"
    c.id, c.booking_id, c.passenger_id, c.flight_id, c.check_in_method, c.seat_number,
    c.boarding_group, c.boarding_time, c.gate, c.terminal, c.status, c.checked_in_at
"#;

const PASS_COLUMNS: &str = r#"
    bp.id, bp.check_in_record_id, bp.passenger_id, bp.flight_id, bp.barcode, bp.boarding_pass_number,
    bp.seat_number, bp.boarding_group, bp.boarding_time, bp.gate, bp.is_valid, bp.issued_at
"#;

fn record_from_row(row: &PgRow) -> Result<CheckInRecord, sqlx::Error> {
    Ok(CheckInRecord {
        id: row.try_get("id")?,
        booking_id: row.try_get("booking_id")?,
        passenger_id: row.try_get("passenger_id")?,
        flight_id: row.try_get("flight_id")?,
        method: row.try_get("check_in_method")?,
        seat_number: row.try_get("seat_number")?,
        boarding_group: parse_column("boarding_group", row.try_get("boarding_group")?)?,
        boarding_time: row.try_get("boarding_time")?,
        gate: row.try_get("gate")?,
        terminal: row.try_get("terminal")?,
        status: parse_column("status", row.try_get("status")?)?,
        checked_in_at: row.try_get("checked_in_at")?,
    })
}

fn pass_from_row(row: &PgRow) -> Result<BoardingPass, sqlx::Error> {
    Ok(BoardingPass {
        id: row.try_get("id")?,
        check_in_record_id: row.try_get("check_in_record_id")?,
        passenger_id: row.try_get("passenger_id")?,
        flight_id: row.try_get("flight_id")?,
        barcode: row.try_get("barcode")?,
        boarding_pass_number: row.try_get("boarding_pass_number")?,
        seat_number: row.try_get("seat_number")?,
        boarding_group: parse_column("boarding_group", row.try_get("boarding_group")?)?,
        boarding_time: row.try_get("boarding_time")?,
        gate: row.try_get("gate")?,
        is_valid: row.try_get("is_valid")?,
        issued_at: row.try_get("issued_at")?,
    })
}

fn context_from_row(row: &PgRow) -> Result<CheckInContext, sqlx::Error> {
    let seat_class: Option<&str> = row.try_get("selected_class")?;
    Ok(CheckInContext {
        booking_status: parse_column("booking_status", row.try_get("booking_status")?)?,
        passenger: passenger_from_row(row)?,
        departure_time: row.try_get("departure_time")?,
        gate: row.try_get("gate")?,
        terminal: row.try_get("terminal")?,
        seat_class: seat_class
            .map(|raw| parse_column::<CabinClass>("selected_class", raw))
            .transpose()?,
        already_checked_in: row.try_get("already_checked_in")?,
    })
}

fn status_from_row(row: &PgRow) -> Result<PassengerCheckIn, sqlx::Error> {
    let group: Option<&str> = row.try_get("boarding_group")?;
    Ok(PassengerCheckIn {
        passenger_id: row.try_get("passenger_id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        flight_id: row.try_get("flight_id")?,
        flight_number: row.try_get("flight_number")?,
        departure_time: row.try_get("departure_time")?,
        checked_in: row.try_get("checked_in")?,
        boarding_pass_issued: row.try_get("boarding_pass_issued")?,
        boarding_group: group.map(|raw| parse_column("boarding_group", raw)).transpose()?,
        gate: row.try_get("gate")?,
        terminal: row.try_get("terminal")?,
    })
}

fn view_from_row(row: &PgRow) -> Result<BoardingPassView, sqlx::Error> {
    Ok(BoardingPassView {
        boarding_pass: pass_from_row(row)?,
        terminal: row.try_get("terminal")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        flight_number: row.try_get("flight_number")?,
        departure_airport: row.try_get::<String, _>("departure_airport")?.trim().to_string(),
        arrival_airport: row.try_get::<String, _>("arrival_airport")?.trim().to_string(),
        departure_time: row.try_get("departure_time")?,
        arrival_time: row.try_get("arrival_time")?,
        pnr: row.try_get::<String, _>("pnr")?.trim().to_string(),
    })
}

async fn insert_pass(tx: &mut Transaction<'_, Postgres>, pass: &BoardingPass) -> CoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO boarding_passes
            (id, check_in_record_id, passenger_id, flight_id, barcode, boarding_pass_number,
             seat_number, boarding_group, boarding_time, gate, is_valid, issued_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(pass.id)
    .bind(pass.check_in_record_id)
    .bind(pass.passenger_id)
    .bind(pass.flight_id)
    .bind(&pass.barcode)
    .bind(&pass.boarding_pass_number)
    .bind(&pass.seat_number)
    .bind(pass.boarding_group.as_str())
    .bind(pass.boarding_time)
    .bind(&pass.gate)
    .bind(pass.is_valid)
    .bind(pass.issued_at)
    .execute(&mut **tx)
    .await
    .map_err(dependency)?;
    Ok(())
}

pub struct PostgresCheckInRepository {
    pub pool: PgPool,
}

#[async_trait]
impl CheckInRepository for PostgresCheckInRepository {
    async fn check_in_context(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        flight_id: Uuid,
    ) -> CoreResult<Option<CheckInContext>> {
        let sql = format!(
            r#"
            SELECT {},
                b.status AS booking_status,
                f.departure_time, f.gate, f.terminal,
                (SELECT s.seat_class FROM seat_selections s
                 WHERE s.passenger_id = p.id AND s.flight_id = p.flight_id) AS selected_class,
                EXISTS (SELECT 1 FROM check_in_records c
                        WHERE c.passenger_id = p.id AND c.flight_id = p.flight_id) AS already_checked_in
            FROM passengers p
            JOIN bookings b ON b.id = p.booking_id
            JOIN flights f ON f.id = p.flight_id
            WHERE p.id = $1 AND p.booking_id = $2 AND p.flight_id = $3
            "#,
            PASSENGER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(passenger_id)
            .bind(booking_id)
            .bind(flight_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(dependency)?;

        row.as_ref().map(context_from_row).transpose().map_err(dependency)
    }

    async fn record_check_in(&self, issue: &CheckInIssue) -> CoreResult<()> {
        let record = &issue.record;
        let mut tx = self.pool.begin().await.map_err(dependency)?;

        // A concurrent cancel holds FOR UPDATE on this row; whoever goes second sees the other's result.
        let booking = sqlx::query("SELECT status, pnr FROM bookings WHERE id = $1 FOR SHARE")
            .bind(record.booking_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(dependency)?
            .ok_or_else(|| CoreError::not_found("Booking", record.booking_id))?;
        let status: BookingStatus = booking
            .try_get("status")
            .and_then(|raw: &str| parse_column("status", raw))
            .map_err(dependency)?;
        if status != BookingStatus::Confirmed {
            let pnr: String = booking.try_get("pnr").map_err(dependency)?;
            return Err(CoreError::InvalidState(format!(
                "booking {} is {}, check-in requires a confirmed booking",
                pnr.trim(),
                status
            )));
        }

        // Serialises with claim_seat, which holds FOR SHARE on the same row.
        let current_seat: Option<String> =
            sqlx::query_scalar("SELECT seat_number FROM passengers WHERE id = $1 FOR UPDATE")
                .bind(record.passenger_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(dependency)?
                .ok_or_else(|| CoreError::not_found("Passenger", record.passenger_id))?;
        if current_seat != record.seat_number {
            return Err(CoreError::InvalidState("seat changed during check-in, retry".into()));
        }

        sqlx::query(
            r#"
            INSERT INTO check_in_records
                (id, booking_id, passenger_id, flight_id, check_in_method, seat_number,
                 boarding_group, boarding_time, gate, terminal, status, checked_in_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id)
        .bind(record.booking_id)
        .bind(record.passenger_id)
        .bind(record.flight_id)
        .bind(&record.method)
        .bind(&record.seat_number)
        .bind(record.boarding_group.as_str())
        .bind(record.boarding_time)
        .bind(&record.gate)
        .bind(&record.terminal)
        .bind(record.status.as_str())
        .bind(record.checked_in_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => CoreError::AlreadyCheckedIn,
            None => dependency(e),
        })?;

        insert_pass(&mut tx, &issue.boarding_pass).await?;

        sqlx::query("UPDATE passengers SET checked_in = TRUE, boarding_pass_issued = TRUE WHERE id = $1")
            .bind(record.passenger_id)
            .execute(&mut *tx)
            .await
            .map_err(dependency)?;

        tx.commit().await.map_err(dependency)?;
        Ok(())
    }

    async fn check_in_record(&self, passenger_id: Uuid, flight_id: Uuid) -> CoreResult<Option<CheckInRecord>> {
        let sql = format!(
            "SELECT {} FROM check_in_records c WHERE c.passenger_id = $1 AND c.flight_id = $2",
            RECORD_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(passenger_id)
            .bind(flight_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(dependency)?;

        row.as_ref().map(record_from_row).transpose().map_err(dependency)
    }

    async fn replace_boarding_pass(&self, replacement: &BoardingPass) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(dependency)?;

        sqlx::query(
            "UPDATE boarding_passes SET is_valid = FALSE WHERE passenger_id = $1 AND flight_id = $2 AND is_valid",
        )
        .bind(replacement.passenger_id)
        .bind(replacement.flight_id)
        .execute(&mut *tx)
        .await
        .map_err(dependency)?;

        insert_pass(&mut tx, replacement).await?;

        tx.commit().await.map_err(dependency)?;
        Ok(())
    }

    async fn check_in_status(&self, booking_id: Uuid) -> CoreResult<Vec<PassengerCheckIn>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id AS passenger_id, p.first_name, p.last_name, p.checked_in, p.boarding_pass_issued,
                   f.id AS flight_id, f.flight_number, f.departure_time,
                   c.boarding_group, c.gate, c.terminal
            FROM passengers p
            JOIN flights f ON f.id = p.flight_id
            LEFT JOIN check_in_records c ON c.passenger_id = p.id AND c.flight_id = p.flight_id
            WHERE p.booking_id = $1
            ORDER BY f.departure_time, p.first_name
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(dependency)?;

        rows.iter()
            .map(status_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(dependency)
    }

    async fn boarding_pass(&self, passenger_id: Uuid, flight_id: Uuid) -> CoreResult<Option<BoardingPassView>> {
        let sql = format!(
            r#"
            SELECT {}, c.terminal, p.first_name, p.last_name,
                   f.flight_number, f.departure_airport, f.arrival_airport, f.departure_time, f.arrival_time,
                   b.pnr
            FROM boarding_passes bp
            JOIN check_in_records c ON c.id = bp.check_in_record_id
            JOIN passengers p ON p.id = bp.passenger_id
            JOIN flights f ON f.id = bp.flight_id
            JOIN bookings b ON b.id = p.booking_id
            WHERE bp.passenger_id = $1 AND bp.flight_id = $2 AND bp.is_valid
            "#,
            PASS_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(passenger_id)
            .bind(flight_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(dependency)?;

        row.as_ref().map(view_from_row).transpose().map_err(dependency)
    }
}
