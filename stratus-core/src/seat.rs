use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::flight::CabinClass;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeatType {
    Window,
    Aisle,
    Middle,
    ExitRow,
}

impl SeatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatType::Window => "window",
            SeatType::Aisle => "aisle",
            SeatType::Middle => "middle",
            SeatType::ExitRow => "exit_row",
        }
    }
}

impl fmt::Display for SeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "window" => Ok(SeatType::Window),
            "aisle" => Ok(SeatType::Aisle),
            "middle" => Ok(SeatType::Middle),
            "exit_row" => Ok(SeatType::ExitRow),
            other => Err(format!("unknown seat type: {}", other)),
        }
    }
}

/// A physical seat of an aircraft configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatMapEntry {
    pub aircraft_id: Uuid,
    pub seat_number: String,
    pub row: i32,
    pub column: char,
    pub seat_class: CabinClass,
    pub seat_type: SeatType,
    /// Surcharge in minor currency units.
    pub extra_price: i64,
    /// Operational flag; blocked seats stay in the map but cannot be selected.
    pub selectable: bool,
}

/// Active claim of one seat on one flight by one passenger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatSelection {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub seat_number: String,
    pub seat_class: CabinClass,
    pub extra_charge: i64,
    pub selected_at: DateTime<Utc>,
}

/// Input to the atomic seat claim.
#[derive(Debug, Clone)]
pub struct SeatClaim {
    pub booking_id: Uuid,
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub seat: SeatMapEntry,
}

/// A seat map entry joined with the flight's current selections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatAvailability {
    pub seat_number: String,
    pub row: i32,
    pub column: char,
    pub seat_class: CabinClass,
    pub seat_type: SeatType,
    pub extra_price: i64,
    pub selectable: bool,
    pub is_selected: bool,
    pub passenger_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSeatMap {
    pub flight_id: Uuid,
    pub flight_number: String,
    pub aircraft_id: Uuid,
    pub seats: Vec<SeatAvailability>,
}

/// Orders seats front to back, then left to right.
pub fn sort_seats(seats: &mut [SeatMapEntry]) {
    seats.sort_by(|a, b| a.row.cmp(&b.row).then(a.column.cmp(&b.column)));
}
