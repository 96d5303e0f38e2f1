use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::booking::{BookingStatus, Passenger};
use crate::flight::CabinClass;

/// Boarding priority bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum BoardingGroup {
    A,
    B,
    C,
}

impl BoardingGroup {
    /// First boards as A, business as B, everyone else (including passengers
    /// without a seat) as C.
    pub fn for_seat_class(seat_class: Option<CabinClass>) -> Self {
        match seat_class {
            Some(CabinClass::First) => BoardingGroup::A,
            Some(CabinClass::Business) => BoardingGroup::B,
            Some(CabinClass::Economy) | None => BoardingGroup::C,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoardingGroup::A => "A",
            BoardingGroup::B => "B",
            BoardingGroup::C => "C",
        }
    }
}

impl fmt::Display for BoardingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardingGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(BoardingGroup::A),
            "B" => Ok(BoardingGroup::B),
            "C" => Ok(BoardingGroup::C),
            other => Err(format!("unknown boarding group: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    CheckedIn,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInStatus::CheckedIn => "checked_in",
        }
    }
}

impl FromStr for CheckInStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checked_in" => Ok(CheckInStatus::CheckedIn),
            other => Err(format!("unknown check-in status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub method: String,
    pub seat_number: Option<String>,
    pub boarding_group: BoardingGroup,
    pub boarding_time: DateTime<Utc>,
    pub gate: Option<String>,
    pub terminal: Option<String>,
    pub status: CheckInStatus,
    pub checked_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardingPass {
    pub id: Uuid,
    pub check_in_record_id: Uuid,
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub barcode: String,
    pub boarding_pass_number: String,
    pub seat_number: Option<String>,
    pub boarding_group: BoardingGroup,
    pub boarding_time: DateTime<Utc>,
    pub gate: Option<String>,
    /// Superseded passes are kept with `is_valid = false`.
    pub is_valid: bool,
    pub issued_at: DateTime<Utc>,
}

/// Everything the check-in guards need, read for one (booking, passenger, flight).
#[derive(Debug, Clone)]
pub struct CheckInContext {
    pub booking_status: BookingStatus,
    pub passenger: Passenger,
    pub departure_time: DateTime<Utc>,
    pub gate: Option<String>,
    pub terminal: Option<String>,
    /// Class of the passenger's active seat selection, if any.
    pub seat_class: Option<CabinClass>,
    pub already_checked_in: bool,
}

/// The records to persist for a successful check-in.
#[derive(Debug, Clone)]
pub struct CheckInIssue {
    pub record: CheckInRecord,
    pub boarding_pass: BoardingPass,
}

/// Boarding pass joined with passenger, flight and booking data for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardingPassView {
    pub boarding_pass: BoardingPass,
    pub terminal: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub pnr: String,
}

/// One row of the per-booking check-in summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerCheckIn {
    pub passenger_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub flight_id: Uuid,
    pub flight_number: String,
    pub departure_time: DateTime<Utc>,
    pub checked_in: bool,
    pub boarding_pass_issued: bool,
    pub boarding_group: Option<BoardingGroup>,
    pub gate: Option<String>,
    pub terminal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boarding_group_is_function_of_seat_class() {
        assert_eq!(BoardingGroup::for_seat_class(Some(CabinClass::First)), BoardingGroup::A);
        assert_eq!(BoardingGroup::for_seat_class(Some(CabinClass::Business)), BoardingGroup::B);
        assert_eq!(BoardingGroup::for_seat_class(Some(CabinClass::Economy)), BoardingGroup::C);
        assert_eq!(BoardingGroup::for_seat_class(None), BoardingGroup::C);
    }
}
