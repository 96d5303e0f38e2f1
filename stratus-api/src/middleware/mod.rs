pub mod auth;
pub mod rate_limit;

pub use auth::{Authenticated, Claims, RequireAdmin};
pub use rate_limit::rate_limit_middleware;
