//! Applies provisioning completions to conversion requests.

use std::sync::Arc;

use tracing::{info, warn};

use librarian_core::events::{ConversionEvent, DomainEvent, EventPayload};
use librarian_core::result::AppResult;
use librarian_database::ConversionRequestStore;

/// Records library and group ids on conversion requests once a
/// `LibrariesProvisioned` event arrives.
///
/// Updates overwrite by request id, so delivering the same event more than
/// once leaves the records unchanged.
#[derive(Debug, Clone)]
pub struct CompletionConsumer {
    requests: Arc<dyn ConversionRequestStore>,
}

impl CompletionConsumer {
    /// Creates a new consumer.
    pub fn new(requests: Arc<dyn ConversionRequestStore>) -> Self {
        Self { requests }
    }

    /// Applies an event. Returns the number of request records updated.
    pub async fn apply(&self, event: &DomainEvent) -> AppResult<u64> {
        match &event.payload {
            EventPayload::Conversion(ConversionEvent::LibrariesProvisioned { completions }) => {
                let updated = self.requests.record_provisioning(completions).await?;
                if updated < completions.len() as u64 {
                    warn!(
                        event_id = %event.id,
                        expected = completions.len(),
                        updated,
                        "Some provisioned requests no longer exist"
                    );
                }
                info!(event_id = %event.id, updated, "Applied provisioning completion");
                Ok(updated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use librarian_core::events::ProvisionCompletion;
    use librarian_core::types::id::{
        FolderId, LibraryId, PermissionGroupId, PermissionTierId,
    };
    use librarian_database::memory::MemoryConversionRequestStore;
    use librarian_entity::conversion::NewConversionRequest;

    async fn seeded() -> (Arc<MemoryConversionRequestStore>, ProvisionCompletion) {
        let store = Arc::new(MemoryConversionRequestStore::new());
        let outcomes = store
            .insert_each(&[NewConversionRequest {
                folder_id: FolderId::from("F1"),
                folder_name: "Acme".to_string(),
                folder_developer_name: "Acme".to_string(),
                sharing_principals: "P1".to_string(),
                permission_tier_id: PermissionTierId::new(),
            }])
            .await
            .unwrap();
        let request = outcomes.into_iter().next().unwrap().unwrap();
        let completion = ProvisionCompletion {
            request_id: request.id,
            library_id: LibraryId::new(),
            group_id: PermissionGroupId::new(),
        };
        (store, completion)
    }

    fn event(completions: Vec<ProvisionCompletion>) -> DomainEvent {
        DomainEvent::new(EventPayload::Conversion(
            ConversionEvent::LibrariesProvisioned { completions },
        ))
    }

    #[tokio::test]
    async fn test_apply_records_ids() {
        let (store, completion) = seeded().await;
        let consumer = CompletionConsumer::new(store.clone());

        assert_eq!(consumer.apply(&event(vec![completion])).await.unwrap(), 1);

        let request = &store.find_by_ids(&[completion.request_id]).await.unwrap()[0];
        assert_eq!(request.library_id, Some(completion.library_id));
        assert_eq!(request.group_id, Some(completion.group_id));
        assert!(request.is_provisioned());
    }

    #[tokio::test]
    async fn test_applying_twice_is_a_no_op() {
        let (store, completion) = seeded().await;
        let consumer = CompletionConsumer::new(store.clone());
        let event = event(vec![completion]);

        consumer.apply(&event).await.unwrap();
        let once = store.find_by_ids(&[completion.request_id]).await.unwrap();
        consumer.apply(&event).await.unwrap();
        let twice = store.find_by_ids(&[completion.request_id]).await.unwrap();

        assert_eq!(once[0].library_id, twice[0].library_id);
        assert_eq!(once[0].group_id, twice[0].group_id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_request_is_ignored() {
        let (store, mut completion) = seeded().await;
        completion.request_id = librarian_core::types::id::ConversionRequestId::new();
        let consumer = CompletionConsumer::new(store);

        assert_eq!(consumer.apply(&event(vec![completion])).await.unwrap(), 0);
    }
}
