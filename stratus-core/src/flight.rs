use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Fare tier. Each tier has its own seat inventory on a flight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
    First,
    Business,
    #[default]
    Economy,
}

impl CabinClass {
    /// Seat-map order: first class rows sit at the front of the aircraft.
    pub const ALL: [CabinClass; 3] = [CabinClass::First, CabinClass::Business, CabinClass::Economy];

    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::First => "first",
            CabinClass::Business => "business",
            CabinClass::Economy => "economy",
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CabinClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(CabinClass::First),
            "business" => Ok(CabinClass::Business),
            "economy" => Ok(CabinClass::Economy),
            other => Err(format!("unknown cabin class: {}", other)),
        }
    }
}

/// One value per cabin class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PerCabin<T> {
    pub first: T,
    pub business: T,
    pub economy: T,
}

impl<T> PerCabin<T> {
    pub fn new(first: T, business: T, economy: T) -> Self {
        Self { first, business, economy }
    }

    pub fn get(&self, cabin: CabinClass) -> &T {
        match cabin {
            CabinClass::First => &self.first,
            CabinClass::Business => &self.business,
            CabinClass::Economy => &self.economy,
        }
    }

    pub fn get_mut(&mut self, cabin: CabinClass) -> &mut T {
        match cabin {
            CabinClass::First => &mut self.first,
            CabinClass::Business => &mut self.business,
            CabinClass::Economy => &mut self.economy,
        }
    }
}

/// Aircraft configuration. Seat maps are generated per configuration and shared by
/// every flight flown with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aircraft {
    pub id: Uuid,
    pub model: String,
    pub seats: PerCabin<i32>,
}

impl Aircraft {
    pub fn total_seats(&self) -> i32 {
        self.seats.first + self.seats.business + self.seats.economy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub aircraft_id: Uuid,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub gate: Option<String>,
    pub terminal: Option<String>,
    /// Base fare per cabin, minor currency units.
    pub base_prices: PerCabin<i64>,
    /// Seats still sellable per cabin. Always within `0..=capacity`.
    pub available_seats: PerCabin<i32>,
    /// Configured capacity of the aircraft flying this leg.
    pub capacity: PerCabin<i32>,
}

impl Flight {
    pub fn base_price(&self, cabin: CabinClass) -> i64 {
        *self.base_prices.get(cabin)
    }

    pub fn available(&self, cabin: CabinClass) -> i32 {
        *self.available_seats.get(cabin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cabin_round_trip_through_str() {
        for cabin in CabinClass::ALL {
            assert_eq!(cabin.as_str().parse::<CabinClass>().unwrap(), cabin);
        }
        assert!("premium".parse::<CabinClass>().is_err());
    }

    #[test]
    fn test_per_cabin_access() {
        let mut seats = PerCabin::new(4, 8, 60);
        *seats.get_mut(CabinClass::Economy) -= 2;
        assert_eq!(*seats.get(CabinClass::Economy), 58);
        assert_eq!(*seats.get(CabinClass::First), 4);
    }
}
