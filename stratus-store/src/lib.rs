pub mod app_config;
pub mod booking_repo;
pub mod checkin_repo;
pub mod database;
pub mod events;
pub mod flight_repo;
pub mod memory;
mod pg;
pub mod redis_repo;
pub mod seat_repo;

use std::sync::Arc;
use stratus_core::repository::{BookingRepository, CheckInRepository, FlightRepository, SeatRepository};

pub use database::DbClient;
pub use events::{EventProducer, KafkaNotifier, TracingNotifier};
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;

/// One handle per port, all backed by the same store.
#[derive(Clone)]
pub struct Repositories {
    pub flights: Arc<dyn FlightRepository>,
    pub seats: Arc<dyn SeatRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub check_ins: Arc<dyn CheckInRepository>,
}

impl Repositories {
    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            flights: Arc::new(store.clone()),
            seats: Arc::new(store.clone()),
            bookings: Arc::new(store.clone()),
            check_ins: Arc::new(store),
        }
    }
}
