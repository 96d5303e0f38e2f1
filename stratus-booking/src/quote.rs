use serde::Serialize;
use stratus_core::booking::{AncillaryRequest, PassengerDetails};
use stratus_core::flight::Flight;
use stratus_core::{CoreError, CoreResult};

/// Price breakdown of a booking request, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub fares: i64,
    pub ancillaries: i64,
    pub discount: i64,
}

fn overflow() -> CoreError {
    CoreError::ValidationError("booking total is out of range".to_string())
}

fn checked_sum(mut amounts: impl Iterator<Item = Option<i64>>) -> CoreResult<i64> {
    amounts.try_fold(0i64, |acc, amount| amount.and_then(|a| acc.checked_add(a)).ok_or_else(overflow))
}

impl Quote {
    /// Every passenger pays each flight's base price for their cabin. Fails
    /// when any line or sum leaves the `i64` range.
    pub fn new(
        flights: &[Flight],
        passengers: &[PassengerDetails],
        ancillaries: &[AncillaryRequest],
    ) -> CoreResult<Self> {
        let fares = checked_sum(
            flights
                .iter()
                .flat_map(|f| passengers.iter().map(move |p| Some(f.base_price(p.cabin_class)))),
        )?;
        let ancillaries = checked_sum(
            ancillaries
                .iter()
                .map(|a| a.unit_price.checked_mul(i64::from(a.quantity))),
        )?;
        fares.checked_add(ancillaries).ok_or_else(overflow)?;

        Ok(Self {
            fares,
            ancillaries,
            discount: 0,
        })
    }

    pub fn subtotal(&self) -> i64 {
        self.fares + self.ancillaries
    }

    pub fn with_discount(self, discount: i64) -> Self {
        Self {
            discount: discount.clamp(0, self.subtotal().max(0)),
            ..self
        }
    }

    pub fn total(&self) -> i64 {
        self.subtotal() - self.discount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stratus_core::booking::AncillaryType;
    use stratus_core::flight::{CabinClass, PerCabin};
    use uuid::Uuid;

    fn flight(economy: i64, business: i64) -> Flight {
        Flight {
            id: Uuid::new_v4(),
            flight_number: "ST1".into(),
            aircraft_id: Uuid::new_v4(),
            departure_airport: "AAA".into(),
            arrival_airport: "BBB".into(),
            departure_time: Utc::now(),
            arrival_time: Utc::now(),
            gate: None,
            terminal: None,
            base_prices: PerCabin::new(0, business, economy),
            available_seats: PerCabin::default(),
            capacity: PerCabin::default(),
        }
    }

    fn passenger(cabin: CabinClass) -> PassengerDetails {
        PassengerDetails {
            first_name: "A".into(),
            last_name: "B".into(),
            cabin_class: cabin,
            ..Default::default()
        }
    }

    #[test]
    fn test_fares_multiply_passengers_by_flights() {
        let flights = [flight(10000, 30000), flight(20000, 50000)];
        let passengers = [passenger(CabinClass::Economy), passenger(CabinClass::Business)];
        let bags = [AncillaryRequest {
            service_type: AncillaryType::Baggage,
            description: None,
            quantity: 2,
            unit_price: 3500,
        }];

        let quote = Quote::new(&flights, &passengers, &bags).unwrap();
        assert_eq!(quote.fares, 10000 + 30000 + 20000 + 50000);
        assert_eq!(quote.ancillaries, 7000);
        assert_eq!(quote.total(), 117000);
    }

    #[test]
    fn test_discount_never_exceeds_subtotal() {
        let quote = Quote::new(&[flight(10000, 0)], &[passenger(CabinClass::Economy)], &[])
            .unwrap()
            .with_discount(50000);
        assert_eq!(quote.discount, 10000);
        assert_eq!(quote.total(), 0);
    }

    #[test]
    fn test_oversized_ancillary_is_rejected() {
        let bags = [AncillaryRequest {
            service_type: AncillaryType::Baggage,
            description: None,
            quantity: 2,
            unit_price: i64::MAX / 2 + 1,
        }];
        let err = Quote::new(&[flight(10000, 0)], &[passenger(CabinClass::Economy)], &bags).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));

        let bags = [
            AncillaryRequest {
                service_type: AncillaryType::Baggage,
                description: None,
                quantity: 1,
                unit_price: i64::MAX - 5000,
            },
            AncillaryRequest {
                service_type: AncillaryType::Baggage,
                description: None,
                quantity: 1,
                unit_price: 3500,
            },
        ];
        let err = Quote::new(&[flight(10000, 0)], &[passenger(CabinClass::Economy)], &bags).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn test_discount_on_negative_subtotal_is_zero() {
        let quote = Quote {
            fares: 0,
            ancillaries: -10,
            discount: 0,
        }
        .with_discount(500);
        assert_eq!(quote.discount, 0);
        assert_eq!(quote.total(), -10);
    }
}
