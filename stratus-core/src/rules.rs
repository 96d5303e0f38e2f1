use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Tunable booking and check-in rules, loaded from the `business_rules` config section.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    #[serde(default = "default_currency")]
    pub currency: String,
    /// How many booking codes to try before giving up on a collision streak.
    #[serde(default = "default_pnr_attempts")]
    pub pnr_attempts: u32,
    #[serde(default = "default_opens_hours")]
    pub check_in_opens_hours: i64,
    #[serde(default = "default_closes_hours")]
    pub check_in_closes_hours: i64,
    #[serde(default = "default_boarding_lead")]
    pub boarding_lead_minutes: i64,
    #[serde(default)]
    pub promotions: Vec<PromoRule>,
}

fn default_currency() -> String { "USD".to_string() }
fn default_pnr_attempts() -> u32 { 5 }
fn default_opens_hours() -> i64 { 24 }
fn default_closes_hours() -> i64 { 1 }
fn default_boarding_lead() -> i64 { 90 }

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            pnr_attempts: default_pnr_attempts(),
            check_in_opens_hours: default_opens_hours(),
            check_in_closes_hours: default_closes_hours(),
            boarding_lead_minutes: default_boarding_lead(),
            promotions: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a percentage of the basket.
    Percentage,
    /// `value` is an amount in minor units.
    FixedAmount,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromoRule {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub max_discount: Option<i64>,
    #[serde(default)]
    pub min_purchase: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool { true }
