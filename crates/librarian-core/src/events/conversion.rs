//! Conversion-related domain events.

use serde::{Deserialize, Serialize};

use crate::types::id::{ConversionRequestId, LibraryId, PermissionGroupId};

/// The library and group minted for one conversion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProvisionCompletion {
    /// The conversion request that was provisioned.
    pub request_id: ConversionRequestId,
    /// The library backing the request's folder.
    pub library_id: LibraryId,
    /// The permission group mirroring the folder's sharing.
    pub group_id: PermissionGroupId,
}

/// Events related to folder conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConversionEvent {
    /// Libraries and groups were created for a batch of requests. The
    /// request records still need the ids recorded on them.
    LibrariesProvisioned {
        /// One entry per provisioned request.
        completions: Vec<ProvisionCompletion>,
    },
}

impl ConversionEvent {
    /// Return a short name for the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LibrariesProvisioned { .. } => "libraries_provisioned",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DomainEvent, EventPayload};

    #[test]
    fn test_wire_format() {
        let completion = ProvisionCompletion {
            request_id: ConversionRequestId::new(),
            library_id: LibraryId::new(),
            group_id: PermissionGroupId::new(),
        };
        let event = DomainEvent::new(EventPayload::Conversion(
            ConversionEvent::LibrariesProvisioned {
                completions: vec![completion],
            },
        ));

        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["payload"]["domain"], "Conversion");
        assert_eq!(value["payload"]["event"]["type"], "LibrariesProvisioned");
        assert_eq!(
            value["payload"]["event"]["completions"][0]["request_id"],
            completion.request_id.to_string()
        );

        let parsed: DomainEvent = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed, event);
        assert_eq!(parsed.name(), "libraries_provisioned");
    }
}
