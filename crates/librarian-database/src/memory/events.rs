//! In-memory event publisher.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use librarian_core::events::DomainEvent;
use librarian_core::result::AppResult;
use librarian_core::traits::EventPublisher;

/// Publisher that records events in order for later inspection.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<DomainEvent>>,
}

impl MemoryEventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every published event.
    pub async fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().await.clone()
    }

    /// Remove and return every published event.
    pub async fn drain(&self) -> Vec<DomainEvent> {
        std::mem::take(&mut *self.events.lock().await)
    }
}

#[async_trait]
impl EventPublisher for MemoryEventLog {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        debug!(event = event.name(), event_id = %event.id, "Recorded event");
        self.events.lock().await.push(event);
        Ok(())
    }
}
