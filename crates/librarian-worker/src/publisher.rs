//! Event publisher that hands domain events to the job queue.

use std::sync::Arc;

use async_trait::async_trait;
use tracing;

use librarian_core::events::DomainEvent;
use librarian_core::result::AppResult;
use librarian_core::traits::EventPublisher;
use librarian_entity::job::{JobPayload, JobPriority};

use crate::queue::JobQueue;

/// Publishes events as `apply_provision_completion` jobs.
///
/// The job row is the durable record of the event; the worker retries it
/// until the consumer succeeds, so delivery is at least once.
#[derive(Debug, Clone)]
pub struct JobQueuePublisher {
    queue: Arc<JobQueue>,
}

impl JobQueuePublisher {
    /// Create a publisher over a job queue
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl EventPublisher for JobQueuePublisher {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        let name = event.name();
        let event_id = event.id;
        let job = self
            .queue
            .enqueue(
                &JobPayload::ApplyProvisionCompletion { event },
                JobPriority::High,
            )
            .await?;
        tracing::info!(
            "Published event '{}' ({}) as job {}",
            name,
            event_id,
            job.id
        );
        Ok(())
    }
}
