//! Event publisher trait for handing domain events to an asynchronous consumer.

use async_trait::async_trait;

use crate::events::DomainEvent;
use crate::result::AppResult;

/// Sink for domain events.
///
/// Implementations must make the event durable before returning `Ok`:
/// once published, the event is delivered to its consumer at least once.
/// Consumers therefore have to tolerate redelivery.
#[async_trait]
pub trait EventPublisher: Send + Sync + std::fmt::Debug + 'static {
    /// Publish a single event.
    async fn publish(&self, event: DomainEvent) -> AppResult<()>;
}
