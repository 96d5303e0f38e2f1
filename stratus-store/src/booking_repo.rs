use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use stratus_shared::Masked;
use tracing::{debug, info};
use uuid::Uuid;

use stratus_core::booking::{
    AncillaryLineItem, Booking, BookingDetails, BookingDraft, BookingRef, BookingStatus, Passenger, PassengerDetails,
};
use stratus_core::flight::CabinClass;
use stratus_core::repository::BookingRepository;
use stratus_core::{CoreError, CoreResult};

use crate::flight_repo::{flight_from_row, FLIGHT_COLUMNS};
use crate::pg::{dependency, parse_column, unique_violation};

const BOOKING_COLUMNS: &str = r#"
    id, pnr, owner, status, payment_status, payment_method, payment_reference,
    total_price, discount_amount, promo_code, currency, contact_email, contact_phone,
    special_requests, created_at, updated_at
"#;

pub(crate) const PASSENGER_COLUMNS: &str = r#"
    p.id, p.booking_id, p.flight_id, p.passenger_type, p.title, p.first_name, p.last_name,
    p.date_of_birth, p.gender, p.nationality, p.passport_number, p.passport_expiry, p.cabin_class,
    p.frequent_flyer_number, p.special_assistance, p.meal_preference, p.baggage_count,
    p.seat_number, p.checked_in, p.boarding_pass_issued
"#;

/// Per-cabin counter column on `flights` and capacity column on `aircraft`.
fn counter_columns(cabin: CabinClass) -> (&'static str, &'static str) {
    match cabin {
        CabinClass::First => ("available_first_class", "first_class_seats"),
        CabinClass::Business => ("available_business_class", "business_class_seats"),
        CabinClass::Economy => ("available_economy", "economy_class_seats"),
    }
}

pub(crate) fn booking_from_row(row: &PgRow) -> Result<Booking, sqlx::Error> {
    Ok(Booking {
        id: row.try_get("id")?,
        pnr: row.try_get::<String, _>("pnr")?.trim().to_string(),
        owner: row.try_get("owner")?,
        status: parse_column("status", row.try_get("status")?)?,
        payment_status: parse_column("payment_status", row.try_get("payment_status")?)?,
        payment_method: row.try_get("payment_method")?,
        payment_reference: row.try_get("payment_reference")?,
        total_price: row.try_get("total_price")?,
        discount_amount: row.try_get("discount_amount")?,
        promo_code: row.try_get("promo_code")?,
        currency: row.try_get::<String, _>("currency")?.trim().to_string(),
        contact_email: Masked(row.try_get("contact_email")?),
        contact_phone: row.try_get::<Option<String>, _>("contact_phone")?.map(Masked),
        special_requests: row.try_get("special_requests")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn passenger_from_row(row: &PgRow) -> Result<Passenger, sqlx::Error> {
    Ok(Passenger {
        id: row.try_get("id")?,
        booking_id: row.try_get("booking_id")?,
        flight_id: row.try_get("flight_id")?,
        details: PassengerDetails {
            passenger_type: parse_column("passenger_type", row.try_get("passenger_type")?)?,
            title: row.try_get("title")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            date_of_birth: row.try_get("date_of_birth")?,
            gender: row.try_get("gender")?,
            nationality: row.try_get("nationality")?,
            passport_number: row.try_get::<Option<String>, _>("passport_number")?.map(Masked),
            passport_expiry: row.try_get("passport_expiry")?,
            cabin_class: parse_column("cabin_class", row.try_get("cabin_class")?)?,
            frequent_flyer_number: row.try_get("frequent_flyer_number")?,
            special_assistance: row.try_get("special_assistance")?,
            meal_preference: row.try_get("meal_preference")?,
            baggage_count: row.try_get("baggage_count")?,
        },
        seat_number: row.try_get("seat_number")?,
        checked_in: row.try_get("checked_in")?,
        boarding_pass_issued: row.try_get("boarding_pass_issued")?,
    })
}

fn ancillary_from_row(row: &PgRow) -> Result<AncillaryLineItem, sqlx::Error> {
    Ok(AncillaryLineItem {
        id: row.try_get("id")?,
        booking_id: row.try_get("booking_id")?,
        service_type: parse_column("service_type", row.try_get("service_type")?)?,
        description: row.try_get("description")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
    })
}

pub struct PostgresBookingRepository {
    pub pool: PgPool,
}

impl PostgresBookingRepository {
    async fn load_details(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: Booking,
    ) -> CoreResult<BookingDetails> {
        let flight_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT flight_id FROM booking_flights WHERE booking_id = $1 ORDER BY leg_order")
                .bind(booking.id)
                .fetch_all(&mut **tx)
                .await
                .map_err(dependency)?;

        let sql = format!(
            "SELECT {} FROM passengers p WHERE p.booking_id = $1 ORDER BY p.created_at, p.last_name, p.first_name, p.id",
            PASSENGER_COLUMNS
        );
        let passengers = sqlx::query(&sql)
            .bind(booking.id)
            .fetch_all(&mut **tx)
            .await
            .map_err(dependency)?
            .iter()
            .map(passenger_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(dependency)?;

        let ancillaries = sqlx::query(
            r#"
            SELECT id, booking_id, service_type, description, quantity, unit_price
            FROM ancillary_services
            WHERE booking_id = $1
            "#,
        )
        .bind(booking.id)
        .fetch_all(&mut **tx)
        .await
        .map_err(dependency)?
        .iter()
        .map(ancillary_from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(dependency)?;

        Ok(BookingDetails {
            booking,
            flight_ids,
            passengers,
            ancillaries,
        })
    }

    async fn lock_booking(tx: &mut Transaction<'_, Postgres>, booking_id: Uuid) -> CoreResult<Booking> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1 FOR UPDATE", BOOKING_COLUMNS);
        sqlx::query(&sql)
            .bind(booking_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(dependency)?
            .as_ref()
            .map(booking_from_row)
            .transpose()
            .map_err(dependency)?
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn insert_booking(&self, draft: &BookingDraft) -> CoreResult<BookingDetails> {
        let mut tx = self.pool.begin().await.map_err(dependency)?;

        // Flight rows are locked in id order so concurrent multi-leg bookings cannot deadlock.
        let sql = format!(
            r#"
            SELECT {} FROM flights f JOIN aircraft a ON a.id = f.aircraft_id
            WHERE f.id = ANY($1)
            ORDER BY f.id
            FOR UPDATE OF f
            "#,
            FLIGHT_COLUMNS
        );
        let flights = sqlx::query(&sql)
            .bind(&draft.flight_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(dependency)?
            .iter()
            .map(flight_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(dependency)?;

        let demand = draft.seat_demand();
        for flight_id in &draft.flight_ids {
            let flight = flights
                .iter()
                .find(|f| f.id == *flight_id)
                .ok_or_else(|| CoreError::not_found("Flight", flight_id))?;
            for cabin in CabinClass::ALL {
                let requested = *demand.get(cabin);
                if requested > flight.available(cabin) {
                    return Err(CoreError::InsufficientSeats {
                        flight_id: flight.id,
                        cabin,
                        requested,
                        available: flight.available(cabin),
                    });
                }
            }
        }

        let sql = format!(
            r#"
            INSERT INTO bookings
                (id, pnr, owner, status, payment_status, payment_method, total_price, discount_amount,
                 promo_code, currency, contact_email, contact_phone, special_requests)
            VALUES ($1, $2, $3, 'pending', 'pending', $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(draft.id)
            .bind(&draft.pnr)
            .bind(&draft.owner)
            .bind(&draft.payment_method)
            .bind(draft.total_price)
            .bind(draft.discount_amount)
            .bind(&draft.promo_code)
            .bind(&draft.currency)
            .bind(draft.contact_email.expose())
            .bind(draft.contact_phone.as_ref().map(|p| p.expose().clone()))
            .bind(&draft.special_requests)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => CoreError::PnrCollision(draft.pnr.clone()),
                None => dependency(e),
            })?;
        let booking = booking_from_row(&row).map_err(dependency)?;

        for (leg_order, flight_id) in draft.flight_ids.iter().enumerate() {
            sqlx::query("INSERT INTO booking_flights (booking_id, flight_id, leg_order) VALUES ($1, $2, $3)")
                .bind(draft.id)
                .bind(flight_id)
                .bind(leg_order as i32)
                .execute(&mut *tx)
                .await
                .map_err(dependency)?;
        }

        for details in &draft.passengers {
            for flight_id in &draft.flight_ids {
                sqlx::query(
                    r#"
                    INSERT INTO passengers
                        (id, booking_id, flight_id, passenger_type, title, first_name, last_name, date_of_birth,
                         gender, nationality, passport_number, passport_expiry, cabin_class, frequent_flyer_number,
                         special_assistance, meal_preference, baggage_count)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(draft.id)
                .bind(flight_id)
                .bind(details.passenger_type.as_str())
                .bind(&details.title)
                .bind(&details.first_name)
                .bind(&details.last_name)
                .bind(details.date_of_birth)
                .bind(&details.gender)
                .bind(&details.nationality)
                .bind(details.passport_number.as_ref().map(|p| p.expose().clone()))
                .bind(details.passport_expiry)
                .bind(details.cabin_class.as_str())
                .bind(&details.frequent_flyer_number)
                .bind(&details.special_assistance)
                .bind(&details.meal_preference)
                .bind(details.baggage_count)
                .execute(&mut *tx)
                .await
                .map_err(dependency)?;
            }
        }

        for item in &draft.ancillaries {
            sqlx::query(
                r#"
                INSERT INTO ancillary_services (id, booking_id, service_type, description, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(draft.id)
            .bind(item.service_type.as_str())
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await
            .map_err(dependency)?;
        }

        for flight_id in &draft.flight_ids {
            sqlx::query(
                r#"
                UPDATE flights SET
                    available_first_class = available_first_class - $2,
                    available_business_class = available_business_class - $3,
                    available_economy = available_economy - $4
                WHERE id = $1
                "#,
            )
            .bind(flight_id)
            .bind(demand.first)
            .bind(demand.business)
            .bind(demand.economy)
            .execute(&mut *tx)
            .await
            .map_err(dependency)?;
        }

        let details = self.load_details(&mut tx, booking).await?;
        tx.commit().await.map_err(dependency)?;
        debug!("Committed booking {} ({} passenger rows)", details.booking.pnr, details.passengers.len());
        Ok(details)
    }

    async fn find_booking(&self, reference: &BookingRef) -> CoreResult<Option<Booking>> {
        let row = match reference {
            BookingRef::Id(id) => {
                let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
                sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await
            }
            BookingRef::Pnr(pnr) => {
                let sql = format!("SELECT {} FROM bookings WHERE pnr = $1", BOOKING_COLUMNS);
                sqlx::query(&sql).bind(pnr).fetch_optional(&self.pool).await
            }
        }
        .map_err(dependency)?;

        row.as_ref().map(booking_from_row).transpose().map_err(dependency)
    }

    async fn booking_details(&self, booking_id: Uuid) -> CoreResult<Option<BookingDetails>> {
        let mut tx = self.pool.begin().await.map_err(dependency)?;
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let booking = sqlx::query(&sql)
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(dependency)?
            .as_ref()
            .map(booking_from_row)
            .transpose()
            .map_err(dependency)?;

        let Some(booking) = booking else {
            return Ok(None);
        };
        let details = self.load_details(&mut tx, booking).await?;
        tx.commit().await.map_err(dependency)?;
        Ok(Some(details))
    }

    async fn list_bookings(&self, owner: &str, status: Option<BookingStatus>) -> CoreResult<Vec<Booking>> {
        let sql = format!(
            r#"
            SELECT {} FROM bookings
            WHERE owner = $1 AND ($2::VARCHAR IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
            BOOKING_COLUMNS
        );
        sqlx::query(&sql)
            .bind(owner)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(dependency)?
            .iter()
            .map(booking_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(dependency)
    }

    async fn confirm_booking(&self, booking_id: Uuid, payment_reference: Option<&str>) -> CoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(dependency)?;
        let current = Self::lock_booking(&mut tx, booking_id).await?;
        match current.status {
            BookingStatus::Pending => {}
            BookingStatus::Cancelled => return Err(CoreError::AlreadyCancelled(current.pnr)),
            other => {
                return Err(CoreError::InvalidState(format!(
                    "booking {} is {}, only pending bookings can be confirmed",
                    current.pnr, other
                )))
            }
        }

        let sql = format!(
            r#"
            UPDATE bookings
            SET status = 'confirmed', payment_status = 'completed', payment_reference = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(booking_id)
            .bind(payment_reference)
            .fetch_one(&mut *tx)
            .await
            .map_err(dependency)?;
        let booking = booking_from_row(&row).map_err(dependency)?;

        tx.commit().await.map_err(dependency)?;
        Ok(booking)
    }

    async fn cancel_booking(&self, booking_id: Uuid) -> CoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(dependency)?;

        // Flights before the booking row, the same order seat claims take.
        let flight_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT flight_id FROM booking_flights WHERE booking_id = $1 ORDER BY flight_id")
                .bind(booking_id)
                .fetch_all(&mut *tx)
                .await
                .map_err(dependency)?;
        sqlx::query("SELECT id FROM flights WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&flight_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(dependency)?;

        let current = Self::lock_booking(&mut tx, booking_id).await?;
        match current.status {
            BookingStatus::Cancelled => return Err(CoreError::AlreadyCancelled(current.pnr)),
            BookingStatus::Completed => {
                return Err(CoreError::InvalidState(format!("booking {} is already completed", current.pnr)))
            }
            BookingStatus::Pending | BookingStatus::Confirmed => {}
        }

        let sql = format!(
            r#"
            UPDATE bookings
            SET status = 'cancelled',
                payment_status = CASE WHEN payment_status = 'completed' THEN 'refunded' ELSE payment_status END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(booking_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(dependency)?;
        let booking = booking_from_row(&row).map_err(dependency)?;

        let released = sqlx::query(
            r#"
            SELECT flight_id, cabin_class, COUNT(*) AS seats
            FROM passengers
            WHERE booking_id = $1
            GROUP BY flight_id, cabin_class
            "#,
        )
        .bind(booking_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(dependency)?;

        for row in &released {
            let flight_id: Uuid = row.try_get("flight_id").map_err(dependency)?;
            let cabin: CabinClass = row
                .try_get("cabin_class")
                .and_then(|raw: &str| parse_column("cabin_class", raw))
                .map_err(dependency)?;
            let seats: i64 = row.try_get("seats").map_err(dependency)?;
            let (available, capacity) = counter_columns(cabin);

            let sql = format!(
                r#"
                UPDATE flights f
                SET {available} = LEAST(f.{available} + $2, a.{capacity})
                FROM aircraft a
                WHERE f.id = $1 AND a.id = f.aircraft_id
                "#,
                available = available,
                capacity = capacity
            );
            sqlx::query(&sql)
                .bind(flight_id)
                .bind(seats as i32)
                .execute(&mut *tx)
                .await
                .map_err(dependency)?;
        }

        sqlx::query("DELETE FROM seat_selections WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await
            .map_err(dependency)?;
        sqlx::query("UPDATE passengers SET seat_number = NULL WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await
            .map_err(dependency)?;
        sqlx::query(
            r#"
            UPDATE boarding_passes SET is_valid = FALSE
            WHERE is_valid
              AND check_in_record_id IN (SELECT id FROM check_in_records WHERE booking_id = $1)
            "#,
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await
        .map_err(dependency)?;

        tx.commit().await.map_err(dependency)?;
        info!("Booking {} cancelled", booking.pnr);
        Ok(booking)
    }
}
