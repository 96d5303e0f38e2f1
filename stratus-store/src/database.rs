use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::booking_repo::PostgresBookingRepository;
use crate::checkin_repo::PostgresCheckInRepository;
use crate::flight_repo::PostgresFlightRepository;
use crate::seat_repo::PostgresSeatRepository;
use crate::Repositories;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            flights: Arc::new(PostgresFlightRepository { pool: self.pool.clone() }),
            seats: Arc::new(PostgresSeatRepository { pool: self.pool.clone() }),
            bookings: Arc::new(PostgresBookingRepository { pool: self.pool.clone() }),
            check_ins: Arc::new(PostgresCheckInRepository { pool: self.pool.clone() }),
        }
    }
}
