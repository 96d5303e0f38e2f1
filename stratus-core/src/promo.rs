use async_trait::async_trait;

use crate::CoreResult;

/// Pricing/promo evaluator: how much a code takes off a basket.
#[async_trait]
pub trait PromoEvaluator: Send + Sync {
    /// Returns the discount in minor units, never more than `basket_total`.
    /// Unknown or ineligible codes fail with `ValidationError`.
    async fn discount(&self, code: &str, basket_total: i64) -> CoreResult<i64>;
}
