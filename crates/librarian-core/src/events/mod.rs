//! Domain events emitted by Librarian operations.
//!
//! Events are handed to an [`EventPublisher`](crate::traits::EventPublisher)
//! and consumed asynchronously, outside the transaction that produced them.

pub mod conversion;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use conversion::{ConversionEvent, ProvisionCompletion};

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A conversion-related event.
    Conversion(ConversionEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Return a short name for the event, used in logs and job types.
    pub fn name(&self) -> &'static str {
        match &self.payload {
            EventPayload::Conversion(event) => event.name(),
        }
    }
}
