use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::pii::Masked;

/// Published once a booking has committed. Consumed by the e-mail and SMS workers.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub pnr: String,
    pub total_price: i64,
    pub currency: String,
    pub passenger_name: String,
    pub contact_email: Masked<String>,
    pub contact_phone: Option<Masked<String>>,
    pub channels: Vec<NotificationChannel>,
    pub flights: Vec<FlightLegSummary>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Sms,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct FlightLegSummary {
    pub flight_id: Uuid,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

impl BookingCreatedEvent {
    /// E-mail is always requested; SMS only when a phone number was supplied.
    pub fn channels_for(contact_phone: Option<&str>) -> Vec<NotificationChannel> {
        let mut channels = vec![NotificationChannel::Email];
        if contact_phone.is_some_and(|p| !p.trim().is_empty()) {
            channels.push(NotificationChannel::Sms);
        }
        channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sms_channel_requires_phone() {
        assert_eq!(BookingCreatedEvent::channels_for(None), vec![NotificationChannel::Email]);
        assert_eq!(BookingCreatedEvent::channels_for(Some("  ")), vec![NotificationChannel::Email]);
        assert_eq!(
            BookingCreatedEvent::channels_for(Some("+15550100")),
            vec![NotificationChannel::Email, NotificationChannel::Sms]
        );
    }
}
