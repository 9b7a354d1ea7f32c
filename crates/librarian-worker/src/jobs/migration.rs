//! Document migration job handler.

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use librarian_entity::job::{Job, JobPayload};
use librarian_service::conversion::DocumentMigrator;

use crate::executor::{JobExecutionError, JobHandler, decode_payload};

/// Handles `migrate_documents` jobs
#[derive(Debug)]
pub struct MigrateDocumentsJobHandler {
    migrator: DocumentMigrator,
}

impl MigrateDocumentsJobHandler {
    /// Create a new migration job handler
    pub fn new(migrator: DocumentMigrator) -> Self {
        Self { migrator }
    }
}

#[async_trait]
impl JobHandler for MigrateDocumentsJobHandler {
    fn job_type(&self) -> &str {
        "migrate_documents"
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let JobPayload::MigrateDocuments { documents } = decode_payload(job)? else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} does not carry a migration payload",
                job.id
            )));
        };

        tracing::info!("Migrating {} documents for job {}", documents.len(), job.id);

        let results = self
            .migrator
            .migrate_or_defer(&documents)
            .await
            .map_err(JobExecutionError::classify)?;

        Ok(Some(serde_json::to_value(&results).map_err(|e| {
            JobExecutionError::Internal(e.into())
        })?))
    }
}
