use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use stratus_core::promo::PromoEvaluator;
use stratus_core::rules::{DiscountKind, PromoRule};
use stratus_core::{CoreError, CoreResult};

/// Promotions from the `business_rules.promotions` config section, keyed by code.
pub struct ConfiguredPromotions {
    rules: HashMap<String, PromoRule>,
}

impl ConfiguredPromotions {
    pub fn new(rules: Vec<PromoRule>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|r| (r.code.trim().to_uppercase(), r))
                .collect(),
        }
    }

    /// Discount for `basket_total` at `now`, never more than the basket itself.
    pub fn evaluate(&self, code: &str, basket_total: i64, now: DateTime<Utc>) -> CoreResult<i64> {
        let code = code.trim().to_uppercase();
        let rule = self
            .rules
            .get(&code)
            .filter(|r| r.active)
            .ok_or_else(|| CoreError::ValidationError(format!("Invalid promo code {}", code)))?;

        let started = rule.valid_from.map_or(true, |from| now >= from);
        let not_expired = rule.valid_until.map_or(true, |until| now <= until);
        if !started || !not_expired {
            return Err(CoreError::ValidationError(format!("Promo code {} is not valid at this time", code)));
        }
        if basket_total < rule.min_purchase {
            return Err(CoreError::ValidationError(format!(
                "Promo code {} requires a minimum purchase of {}",
                code, rule.min_purchase
            )));
        }

        let discount = match rule.kind {
            DiscountKind::Percentage => {
                let raw = basket_total * rule.value / 100;
                rule.max_discount.map_or(raw, |cap| raw.min(cap))
            }
            DiscountKind::FixedAmount => rule.value,
        };

        Ok(discount.clamp(0, basket_total))
    }
}

#[async_trait]
impl PromoEvaluator for ConfiguredPromotions {
    async fn discount(&self, code: &str, basket_total: i64) -> CoreResult<i64> {
        self.evaluate(code, basket_total, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rule(code: &str, kind: DiscountKind, value: i64) -> PromoRule {
        PromoRule {
            code: code.to_string(),
            kind,
            value,
            max_discount: None,
            min_purchase: 0,
            valid_from: None,
            valid_until: None,
            active: true,
        }
    }

    #[test]
    fn test_percentage_with_cap() {
        let mut capped = rule("WELCOME10", DiscountKind::Percentage, 10);
        capped.max_discount = Some(5000);
        let promos = ConfiguredPromotions::new(vec![capped]);
        let now = Utc::now();

        assert_eq!(promos.evaluate("welcome10", 20000, now).unwrap(), 2000);
        assert_eq!(promos.evaluate("WELCOME10", 100000, now).unwrap(), 5000);
    }

    #[test]
    fn test_fixed_amount_is_clamped_to_basket() {
        let promos = ConfiguredPromotions::new(vec![rule("SAVE25", DiscountKind::FixedAmount, 2500)]);
        assert_eq!(promos.evaluate("SAVE25", 1000, Utc::now()).unwrap(), 1000);
    }

    #[test]
    fn test_ineligible_codes_are_rejected() {
        let now = Utc::now();
        let mut expired = rule("OLD", DiscountKind::FixedAmount, 500);
        expired.valid_until = Some(now - Duration::days(1));
        let mut inactive = rule("OFF", DiscountKind::FixedAmount, 500);
        inactive.active = false;
        let mut minimum = rule("BIG", DiscountKind::FixedAmount, 500);
        minimum.min_purchase = 50000;
        let promos = ConfiguredPromotions::new(vec![expired, inactive, minimum]);

        for code in ["OLD", "OFF", "BIG", "NOPE"] {
            let err = promos.evaluate(code, 10000, now).unwrap_err();
            assert!(matches!(err, CoreError::ValidationError(_)), "{}", code);
        }
    }
}
