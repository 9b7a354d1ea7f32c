//! Library provisioning job handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing;

use librarian_database::ConversionRequestStore;
use librarian_entity::job::{Job, JobPayload};
use librarian_service::conversion::LibraryProvisioner;

use crate::executor::{JobExecutionError, JobHandler, decode_payload};

/// Handles `provision_libraries` jobs
#[derive(Debug)]
pub struct ProvisionLibrariesJobHandler {
    /// Request store, to load the requests named in the payload
    requests: Arc<dyn ConversionRequestStore>,
    /// Provisioning service
    provisioner: LibraryProvisioner,
}

impl ProvisionLibrariesJobHandler {
    /// Create a new provisioning job handler
    pub fn new(requests: Arc<dyn ConversionRequestStore>, provisioner: LibraryProvisioner) -> Self {
        Self {
            requests,
            provisioner,
        }
    }
}

#[async_trait]
impl JobHandler for ProvisionLibrariesJobHandler {
    fn job_type(&self) -> &str {
        "provision_libraries"
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let JobPayload::ProvisionLibraries { request_ids } = decode_payload(job)? else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} does not carry a provisioning payload",
                job.id
            )));
        };

        let requests = self
            .requests
            .find_by_ids(&request_ids)
            .await
            .map_err(JobExecutionError::classify)?;

        if requests.len() < request_ids.len() {
            tracing::warn!(
                "Job {}: {} of {} requests no longer exist",
                job.id,
                request_ids.len() - requests.len(),
                request_ids.len()
            );
        }

        let completions = self
            .provisioner
            .provision_libraries(&requests)
            .await
            .map_err(JobExecutionError::classify)?;

        Ok(Some(json!({
            "requested": request_ids.len(),
            "provisioned": completions.len(),
        })))
    }
}
