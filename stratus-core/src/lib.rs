pub mod booking;
pub mod checkin;
pub mod flight;
pub mod notify;
pub mod promo;
pub mod repository;
pub mod rules;
pub mod seat;

use serde::Serialize;
use uuid::Uuid;

use crate::flight::CabinClass;

/// Coarse failure categories. Callers branch on these (or on [`CoreError::code`]),
/// never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Authorization,
    Dependency,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Seat {0} not found in aircraft configuration")]
    SeatNotFound(String),

    #[error("Seat {0} is not available for selection")]
    SeatUnavailable(String),

    #[error("Seat {0} is already taken")]
    SeatTaken(String),

    #[error("Seat {seat_number} is {seat_class} but the passenger is booked in {cabin}")]
    CabinMismatch {
        seat_number: String,
        seat_class: CabinClass,
        cabin: CabinClass,
    },

    #[error("Not enough {cabin} seats on flight {flight_id}: requested {requested}, available {available}")]
    InsufficientSeats {
        flight_id: Uuid,
        cabin: CabinClass,
        requested: i32,
        available: i32,
    },

    #[error("Seat map already exists for aircraft {0}")]
    SeatMapExists(Uuid),

    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(String),

    #[error("Passenger already checked in")]
    AlreadyCheckedIn,

    #[error("Check-in opens {0} hours before departure")]
    CheckInNotYetOpen(i64),

    #[error("Check-in has closed for this flight")]
    CheckInClosed,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Booking code {0} is already in use")]
    PnrCollision(String),

    #[error("Unauthorized: {0}")]
    AuthorizationError(String),

    #[error("Dependency failure: {0}")]
    DependencyFailure(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ValidationError(_) | CoreError::CabinMismatch { .. } => ErrorKind::Validation,
            CoreError::NotFound { .. } | CoreError::SeatNotFound(_) => ErrorKind::NotFound,
            CoreError::SeatUnavailable(_)
            | CoreError::SeatTaken(_)
            | CoreError::InsufficientSeats { .. }
            | CoreError::SeatMapExists(_)
            | CoreError::AlreadyCancelled(_)
            | CoreError::AlreadyCheckedIn
            | CoreError::CheckInNotYetOpen(_)
            | CoreError::CheckInClosed
            | CoreError::InvalidState(_)
            | CoreError::PnrCollision(_) => ErrorKind::Conflict,
            CoreError::AuthorizationError(_) => ErrorKind::Authorization,
            CoreError::DependencyFailure(_) => ErrorKind::Dependency,
        }
    }

    /// Stable machine-readable code, one per variant.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::ValidationError(_) => "VALIDATION_ERROR",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::SeatNotFound(_) => "SEAT_NOT_FOUND",
            CoreError::SeatUnavailable(_) => "SEAT_UNAVAILABLE",
            CoreError::SeatTaken(_) => "SEAT_TAKEN",
            CoreError::CabinMismatch { .. } => "CABIN_MISMATCH",
            CoreError::InsufficientSeats { .. } => "INSUFFICIENT_SEATS",
            CoreError::SeatMapExists(_) => "SEAT_MAP_EXISTS",
            CoreError::AlreadyCancelled(_) => "ALREADY_CANCELLED",
            CoreError::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            CoreError::CheckInNotYetOpen(_) => "CHECK_IN_NOT_YET_OPEN",
            CoreError::CheckInClosed => "CHECK_IN_CLOSED",
            CoreError::InvalidState(_) => "INVALID_STATE",
            CoreError::PnrCollision(_) => "PNR_COLLISION",
            CoreError::AuthorizationError(_) => "UNAUTHORIZED",
            CoreError::DependencyFailure(_) => "DEPENDENCY_FAILURE",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        assert_eq!(CoreError::ValidationError("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(CoreError::not_found("Booking", "ABC123").kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::SeatNotFound("99Z".into()).kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::SeatTaken("12C".into()).kind(), ErrorKind::Conflict);
        assert_eq!(CoreError::CheckInClosed.kind(), ErrorKind::Conflict);
        assert_eq!(CoreError::AuthorizationError("x".into()).kind(), ErrorKind::Authorization);
        assert_eq!(CoreError::DependencyFailure("db".into()).kind(), ErrorKind::Dependency);
    }

    #[test]
    fn test_seat_failures_are_distinct() {
        let codes = [
            CoreError::SeatNotFound("1A".into()).code(),
            CoreError::SeatUnavailable("1A".into()).code(),
            CoreError::SeatTaken("1A".into()).code(),
        ];
        assert_eq!(codes, ["SEAT_NOT_FOUND", "SEAT_UNAVAILABLE", "SEAT_TAKEN"]);
    }

    #[test]
    fn test_not_found_message() {
        let err = CoreError::not_found("Flight", "f-1");
        assert_eq!(err.to_string(), "Flight not found: f-1");
    }
}
