use std::sync::Arc;
use stratus_booking::{BookingManager, CheckInService};
use stratus_catalog::SeatService;
use stratus_core::notify::BookingNotifier;
use stratus_core::promo::PromoEvaluator;
use stratus_core::rules::BookingRules;
use stratus_store::{RedisClient, Repositories};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct RateLimit {
    pub redis: Arc<RedisClient>,
    pub requests_per_minute: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub seats: Arc<SeatService>,
    pub bookings: Arc<BookingManager>,
    pub check_ins: Arc<CheckInService>,
    /// Requests are not throttled without Redis.
    pub rate_limit: Option<RateLimit>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        promos: Arc<dyn PromoEvaluator>,
        notifier: Arc<dyn BookingNotifier>,
        rules: BookingRules,
        auth: AuthConfig,
    ) -> Self {
        Self {
            seats: Arc::new(SeatService::new(repos.flights.clone(), repos.seats.clone())),
            bookings: Arc::new(BookingManager::new(
                repos.flights.clone(),
                repos.bookings.clone(),
                promos,
                notifier,
                rules.clone(),
            )),
            check_ins: Arc::new(CheckInService::new(repos.bookings, repos.check_ins, rules)),
            rate_limit: None,
            auth,
        }
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, requests_per_minute: i64) -> Self {
        self.rate_limit = Some(RateLimit {
            redis,
            requests_per_minute,
        });
        self
    }
}
