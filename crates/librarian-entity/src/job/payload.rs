//! Typed job payload definitions.

use serde::{Deserialize, Serialize};

use librarian_core::events::DomainEvent;
use librarian_core::types::id::ConversionRequestId;

use crate::document::Document;

/// Typed payloads for known job types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "job_type")]
pub enum JobPayload {
    /// Create libraries and groups for persisted requests.
    #[serde(rename = "provision_libraries")]
    ProvisionLibraries {
        /// Requests to provision.
        request_ids: Vec<ConversionRequestId>,
    },
    /// Migrate documents into file versions.
    #[serde(rename = "migrate_documents")]
    MigrateDocuments {
        /// Documents exported from the legacy store.
        documents: Vec<Document>,
    },
    /// Record provisioning results on request records.
    #[serde(rename = "apply_provision_completion")]
    ApplyProvisionCompletion {
        /// The published event.
        event: DomainEvent,
    },
}

impl JobPayload {
    /// Job type string stored on the job row.
    pub fn job_type(&self) -> &'static str {
        match self {
            Self::ProvisionLibraries { .. } => "provision_libraries",
            Self::MigrateDocuments { .. } => "migrate_documents",
            Self::ApplyProvisionCompletion { .. } => "apply_provision_completion",
        }
    }

    /// Queue the job is placed on.
    pub fn queue(&self) -> &'static str {
        match self {
            Self::ApplyProvisionCompletion { .. } => "bookkeeping",
            Self::ProvisionLibraries { .. } | Self::MigrateDocuments { .. } => "conversion",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_matches_tag() {
        let payload = JobPayload::ProvisionLibraries {
            request_ids: vec![ConversionRequestId::new()],
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["job_type"], payload.job_type());
        assert_eq!(payload.queue(), "conversion");

        let parsed: JobPayload = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.job_type(), "provision_libraries");
    }
}
