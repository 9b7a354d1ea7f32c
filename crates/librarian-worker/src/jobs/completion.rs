//! Provisioning completion job handler.

use async_trait::async_trait;
use serde_json::{Value, json};

use librarian_entity::job::{Job, JobPayload};
use librarian_service::conversion::CompletionConsumer;

use crate::executor::{JobExecutionError, JobHandler, decode_payload};

/// Handles `apply_provision_completion` jobs
#[derive(Debug)]
pub struct ApplyCompletionJobHandler {
    consumer: CompletionConsumer,
}

impl ApplyCompletionJobHandler {
    /// Create a new completion job handler
    pub fn new(consumer: CompletionConsumer) -> Self {
        Self { consumer }
    }
}

#[async_trait]
impl JobHandler for ApplyCompletionJobHandler {
    fn job_type(&self) -> &str {
        "apply_provision_completion"
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let JobPayload::ApplyProvisionCompletion { event } = decode_payload(job)? else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} does not carry a completion event",
                job.id
            )));
        };

        let updated = self
            .consumer
            .apply(&event)
            .await
            .map_err(JobExecutionError::classify)?;

        Ok(Some(json!({ "event_id": event.id, "updated": updated })))
    }
}
