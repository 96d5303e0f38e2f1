use async_trait::async_trait;
use stratus_shared::events::BookingCreatedEvent;

use crate::CoreResult;

/// Outbound notification dispatcher (e-mail/SMS fan-out happens downstream).
/// Called after commit; failures are logged by the caller and never surface
/// in the booking result.
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn booking_created(&self, event: &BookingCreatedEvent) -> CoreResult<()>;
}
