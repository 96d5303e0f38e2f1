use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stratus_shared::Masked;
use uuid::Uuid;

use crate::flight::{CabinClass, PerCabin};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PassengerType {
    #[default]
    Adult,
    Child,
    Infant,
}

impl PassengerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassengerType::Adult => "adult",
            PassengerType::Child => "child",
            PassengerType::Infant => "infant",
        }
    }
}

impl FromStr for PassengerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adult" => Ok(PassengerType::Adult),
            "child" => Ok(PassengerType::Child),
            "infant" => Ok(PassengerType::Infant),
            other => Err(format!("unknown passenger type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AncillaryType {
    Baggage,
    Meal,
    Seat,
    Insurance,
    Lounge,
    Wifi,
}

impl AncillaryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AncillaryType::Baggage => "baggage",
            AncillaryType::Meal => "meal",
            AncillaryType::Seat => "seat",
            AncillaryType::Insurance => "insurance",
            AncillaryType::Lounge => "lounge",
            AncillaryType::Wifi => "wifi",
        }
    }
}

impl FromStr for AncillaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baggage" => Ok(AncillaryType::Baggage),
            "meal" => Ok(AncillaryType::Meal),
            "seat" => Ok(AncillaryType::Seat),
            "insurance" => Ok(AncillaryType::Insurance),
            "lounge" => Ok(AncillaryType::Lounge),
            "wifi" => Ok(AncillaryType::Wifi),
            other => Err(format!("unknown ancillary service: {}", other)),
        }
    }
}

/// Booking header. Never deleted; cancellation is a status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub pnr: String,
    /// Subject of the caller that created the booking, if authenticated.
    pub owner: Option<String>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub total_price: i64,
    pub discount_amount: i64,
    pub promo_code: Option<String>,
    pub currency: String,
    pub contact_email: Masked<String>,
    pub contact_phone: Option<Masked<String>>,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Traveller identity and preferences as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PassengerDetails {
    #[serde(default)]
    pub passenger_type: PassengerType,
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub passport_number: Option<Masked<String>>,
    pub passport_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub cabin_class: CabinClass,
    pub frequent_flyer_number: Option<String>,
    pub special_assistance: Option<String>,
    pub meal_preference: Option<String>,
    #[serde(default)]
    pub baggage_count: i32,
}

impl PassengerDetails {
    pub fn full_name(&self) -> String {
        match &self.title {
            Some(title) => format!("{} {} {}", title, self.first_name, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

/// One traveller on one flight leg of a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub details: PassengerDetails,
    /// Mirror of the passenger's active seat selection on this flight.
    pub seat_number: Option<String>,
    pub checked_in: bool,
    pub boarding_pass_issued: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AncillaryRequest {
    pub service_type: AncillaryType,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AncillaryLineItem {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub service_type: AncillaryType,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
}

impl AncillaryLineItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// Everything the store needs to commit a booking in one unit of work.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub id: Uuid,
    pub pnr: String,
    pub owner: Option<String>,
    pub flight_ids: Vec<Uuid>,
    pub passengers: Vec<PassengerDetails>,
    pub ancillaries: Vec<AncillaryRequest>,
    pub total_price: i64,
    pub discount_amount: i64,
    pub promo_code: Option<String>,
    pub currency: String,
    pub contact_email: Masked<String>,
    pub contact_phone: Option<Masked<String>>,
    pub payment_method: Option<String>,
    pub special_requests: Option<String>,
}

impl BookingDraft {
    /// Seats needed on every flight of the booking, per cabin.
    pub fn seat_demand(&self) -> PerCabin<i32> {
        let mut demand = PerCabin::default();
        for p in &self.passengers {
            *demand.get_mut(p.cabin_class) += 1;
        }
        demand
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub flight_ids: Vec<Uuid>,
    pub passengers: Vec<Passenger>,
    pub ancillaries: Vec<AncillaryLineItem>,
}

/// Bookings are addressed either by surrogate id or by PNR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingRef {
    Id(Uuid),
    Pnr(String),
}

impl BookingRef {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match Uuid::parse_str(raw) {
            Ok(id) => BookingRef::Id(id),
            Err(_) => BookingRef::Pnr(raw.to_uppercase()),
        }
    }
}

impl fmt::Display for BookingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingRef::Id(id) => write!(f, "{}", id),
            BookingRef::Pnr(pnr) => f.write_str(pnr),
        }
    }
}

/// Who is acting on a booking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub subject: Option<String>,
    pub is_admin: bool,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            is_admin: false,
        }
    }

    pub fn admin(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            is_admin: true,
        }
    }

    /// Admins manage everything, owners manage their own bookings, and
    /// bookings made anonymously can be managed by whoever holds the reference.
    pub fn can_manage(&self, booking: &Booking) -> bool {
        if self.is_admin {
            return true;
        }
        match &booking.owner {
            None => true,
            Some(owner) => self.subject.as_deref() == Some(owner.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking_owned_by(owner: Option<&str>) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            pnr: "ABC123".to_string(),
            owner: owner.map(String::from),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            payment_reference: None,
            total_price: 0,
            discount_amount: 0,
            promo_code: None,
            currency: "USD".to_string(),
            contact_email: Masked("a@example.com".to_string()),
            contact_phone: None,
            special_requests: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_booking_ref_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(BookingRef::parse(&id.to_string()), BookingRef::Id(id));
        assert_eq!(BookingRef::parse(" x7k2qa "), BookingRef::Pnr("X7K2QA".to_string()));
    }

    #[test]
    fn test_caller_authorization() {
        let owned = booking_owned_by(Some("user-1"));
        assert!(Caller::user("user-1").can_manage(&owned));
        assert!(!Caller::user("user-2").can_manage(&owned));
        assert!(!Caller::anonymous().can_manage(&owned));
        assert!(Caller::admin("ops").can_manage(&owned));

        let anonymous = booking_owned_by(None);
        assert!(Caller::anonymous().can_manage(&anonymous));
        assert!(Caller::user("user-2").can_manage(&anonymous));
    }

    #[test]
    fn test_seat_demand_counts_by_cabin() {
        let passenger = |cabin| PassengerDetails {
            first_name: "A".into(),
            last_name: "B".into(),
            cabin_class: cabin,
            ..Default::default()
        };
        let draft = BookingDraft {
            id: Uuid::new_v4(),
            pnr: "ABC123".into(),
            owner: None,
            flight_ids: vec![Uuid::new_v4()],
            passengers: vec![
                passenger(CabinClass::Economy),
                passenger(CabinClass::Economy),
                passenger(CabinClass::Business),
            ],
            ancillaries: vec![],
            total_price: 0,
            discount_amount: 0,
            promo_code: None,
            currency: "USD".into(),
            contact_email: Masked("a@example.com".into()),
            contact_phone: None,
            payment_method: None,
            special_requests: None,
        };
        assert_eq!(draft.seat_demand(), PerCabin::new(0, 1, 2));
    }
}
