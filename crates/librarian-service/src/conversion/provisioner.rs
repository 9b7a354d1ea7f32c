//! Library and permission group provisioning.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info};

use librarian_core::error::AppError;
use librarian_core::events::{ConversionEvent, DomainEvent, EventPayload, ProvisionCompletion};
use librarian_core::result::AppResult;
use librarian_core::traits::EventPublisher;
use librarian_core::types::id::PermissionGroupId;
use librarian_database::LibraryStore;
use librarian_entity::conversion::ConversionRequest;
use librarian_entity::library::{GroupMember, Library, LibraryMember, PermissionGroup};

/// Creates the library and permission group backing each conversion request.
///
/// Libraries and groups are looked up by derived developer name before being
/// created, so a batch can be provisioned again after a failure without
/// duplicating anything. Group membership is reconciled with the request's
/// sharing and the library grant carries the request's tier, so a folder
/// converted again after its sharing changed ends up with exactly the new
/// access. Request
/// records are not touched here: a `LibrariesProvisioned` event is published
/// and [`CompletionConsumer`](super::CompletionConsumer) records the ids.
#[derive(Debug, Clone)]
pub struct LibraryProvisioner {
    libraries: Arc<dyn LibraryStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl LibraryProvisioner {
    /// Creates a new provisioner.
    pub fn new(libraries: Arc<dyn LibraryStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            libraries,
            publisher,
        }
    }

    /// Provisions libraries, groups, and memberships for the given requests.
    ///
    /// Any store failure aborts the call and the whole batch should be
    /// retried. Returns the completion published for each request.
    pub async fn provision_libraries(
        &self,
        requests: &[ConversionRequest],
    ) -> AppResult<Vec<ProvisionCompletion>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        // Derived name -> display name, one entry per distinct name.
        let wanted: BTreeMap<String, String> = requests
            .iter()
            .map(|r| (r.derived_name(), r.folder_name.clone()))
            .collect();
        let names: Vec<String> = wanted.keys().cloned().collect();

        let groups = self.ensure_groups(&names, &wanted).await?;
        let libraries = self.ensure_libraries(&names, &wanted).await?;

        let mut group_ids = BTreeSet::new();
        let mut group_members = Vec::new();
        let mut library_members = Vec::with_capacity(requests.len());
        let mut completions = Vec::with_capacity(requests.len());

        for request in requests {
            let name = request.derived_name();
            let group = groups
                .get(&name)
                .ok_or_else(|| AppError::internal(format!("Group '{name}' was not provisioned")))?;
            let library = libraries.get(&name).ok_or_else(|| {
                AppError::internal(format!("Library '{name}' was not provisioned"))
            })?;

            group_ids.insert(group.id);
            group_members.extend(
                request
                    .principals()
                    .into_iter()
                    .map(|principal| GroupMember::new(group.id, principal)),
            );
            library_members.push(LibraryMember::new(
                library.id,
                group.id,
                request.permission_tier_id,
            ));
            completions.push(ProvisionCompletion {
                request_id: request.id,
                library_id: library.id,
                group_id: group.id,
            });
        }

        let group_ids: Vec<PermissionGroupId> = group_ids.into_iter().collect();
        let membership = self
            .libraries
            .sync_group_members(&group_ids, &group_members)
            .await?;
        let grants_written = self
            .libraries
            .upsert_library_members(&library_members)
            .await?;

        let event = DomainEvent::new(EventPayload::Conversion(
            ConversionEvent::LibrariesProvisioned {
                completions: completions.clone(),
            },
        ));
        let event_id = event.id;
        self.publisher.publish(event).await?;

        info!(
            requests = requests.len(),
            libraries = libraries.len(),
            members_added = membership.added,
            members_removed = membership.removed,
            grants_written,
            event_id = %event_id,
            "Provisioned libraries"
        );
        Ok(completions)
    }

    async fn ensure_groups(
        &self,
        names: &[String],
        wanted: &BTreeMap<String, String>,
    ) -> AppResult<HashMap<String, PermissionGroup>> {
        let mut groups: HashMap<String, PermissionGroup> = self
            .libraries
            .find_groups_by_names(names)
            .await?
            .into_iter()
            .map(|g| (g.developer_name.clone(), g))
            .collect();

        let missing: Vec<PermissionGroup> = wanted
            .iter()
            .filter(|(name, _)| !groups.contains_key(*name))
            .map(|(name, display)| PermissionGroup::new(name.clone(), display.clone()))
            .collect();

        if !missing.is_empty() {
            self.libraries.insert_groups(&missing).await?;
            debug!(created = missing.len(), "Created permission groups");
            groups.extend(missing.into_iter().map(|g| (g.developer_name.clone(), g)));
        }
        Ok(groups)
    }

    async fn ensure_libraries(
        &self,
        names: &[String],
        wanted: &BTreeMap<String, String>,
    ) -> AppResult<HashMap<String, Library>> {
        let mut libraries: HashMap<String, Library> = self
            .libraries
            .find_libraries_by_names(names)
            .await?
            .into_iter()
            .map(|l| (l.developer_name.clone(), l))
            .collect();

        let missing: Vec<Library> = wanted
            .iter()
            .filter(|(name, _)| !libraries.contains_key(*name))
            .map(|(name, display)| Library::new(name.clone(), display.clone()))
            .collect();

        if !missing.is_empty() {
            self.libraries.insert_libraries(&missing).await?;
            debug!(created = missing.len(), "Created libraries");
            libraries.extend(missing.into_iter().map(|l| (l.developer_name.clone(), l)));
        }
        Ok(libraries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use librarian_core::types::id::{FolderId, PermissionTierId};
    use librarian_database::MembershipSync;
    use librarian_database::memory::{MemoryEventLog, MemoryLibraryStore};
    use librarian_entity::conversion::NewConversionRequest;

    fn request(folder: &str, developer_name: &str, principals: &str) -> ConversionRequest {
        request_with_tier(folder, developer_name, principals, PermissionTierId::new())
    }

    fn request_with_tier(
        folder: &str,
        developer_name: &str,
        principals: &str,
        tier: PermissionTierId,
    ) -> ConversionRequest {
        NewConversionRequest {
            folder_id: FolderId::from(folder),
            folder_name: developer_name.to_string(),
            folder_developer_name: developer_name.to_string(),
            sharing_principals: principals.to_string(),
            permission_tier_id: tier,
        }
        .into_request(Utc::now())
    }

    fn setup() -> (Arc<MemoryLibraryStore>, Arc<MemoryEventLog>, LibraryProvisioner) {
        let store = Arc::new(MemoryLibraryStore::new());
        let events = Arc::new(MemoryEventLog::new());
        let provisioner = LibraryProvisioner::new(store.clone(), events.clone());
        (store, events, provisioner)
    }

    #[tokio::test]
    async fn test_provision_creates_library_group_and_memberships() {
        let (store, events, provisioner) = setup();
        let acme = request("F1", "Acme", "P1,P2");

        let completions = provisioner
            .provision_libraries(std::slice::from_ref(&acme))
            .await
            .unwrap();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].request_id, acme.id);

        let libraries = store
            .find_libraries_by_names(&["doclib_Acme".to_string()])
            .await
            .unwrap();
        assert_eq!(libraries.len(), 1);
        assert_eq!(libraries[0].name, "Acme");
        assert_eq!(libraries[0].id, completions[0].library_id);

        let members = store.find_group_members(completions[0].group_id).await.unwrap();
        let principals: Vec<&str> = members.iter().map(|m| m.principal_id.as_str()).collect();
        assert_eq!(principals, vec!["P1", "P2"]);

        let grants = store.find_library_members(completions[0].library_id).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].permission_tier_id, acme.permission_tier_id);

        let published = events.events().await;
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].payload,
            EventPayload::Conversion(ConversionEvent::LibrariesProvisioned { completions })
        );
    }

    #[tokio::test]
    async fn test_reprovisioning_reuses_and_does_not_duplicate() {
        let (store, events, provisioner) = setup();
        let acme = request("F1", "Acme", "P1,P2");

        let first = provisioner
            .provision_libraries(std::slice::from_ref(&acme))
            .await
            .unwrap();
        let second = provisioner
            .provision_libraries(std::slice::from_ref(&acme))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.library_count().await, 1);
        assert_eq!(store.group_count().await, 1);
        assert_eq!(store.find_group_members(first[0].group_id).await.unwrap().len(), 2);
        assert_eq!(store.find_library_members(first[0].library_id).await.unwrap().len(), 1);
        assert_eq!(events.events().await.len(), 2);
    }

    #[tokio::test]
    async fn test_reconversion_with_narrowed_sharing_revokes_access() {
        let (store, _events, provisioner) = setup();
        let (read_only, read_write) = (PermissionTierId::new(), PermissionTierId::new());

        let before = request_with_tier("F1", "Acme", "P1,P2", read_write);
        let first = provisioner
            .provision_libraries(std::slice::from_ref(&before))
            .await
            .unwrap();

        // Folder reset, then prepared again after P2 lost access and the
        // folder became read-only.
        let after = request_with_tier("F1", "Acme", "P1", read_only);
        let second = provisioner
            .provision_libraries(std::slice::from_ref(&after))
            .await
            .unwrap();
        assert_eq!(first[0].group_id, second[0].group_id);
        assert_eq!(first[0].library_id, second[0].library_id);

        let principals: Vec<String> = store
            .find_group_members(second[0].group_id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.principal_id.as_str().to_string())
            .collect();
        assert_eq!(principals, vec!["P1"]);

        let grants = store.find_library_members(second[0].library_id).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].permission_tier_id, read_only);
    }

    #[tokio::test]
    async fn test_batch_provisions_each_distinct_name_once() {
        let (store, _events, provisioner) = setup();
        let batch = vec![
            request("F1", "Acme", "P1"),
            request("F2", "Globex", ""),
            request("F3", "Initech", "P3"),
        ];

        let completions = provisioner.provision_libraries(&batch).await.unwrap();
        assert_eq!(completions.len(), 3);
        assert_eq!(store.library_count().await, 3);
        assert!(
            store
                .find_group_members(completions[1].group_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    /// Library store whose library insert always fails.
    #[derive(Debug, Default)]
    struct BrokenLibraries {
        inner: MemoryLibraryStore,
    }

    #[async_trait::async_trait]
    impl LibraryStore for BrokenLibraries {
        async fn find_libraries_by_names(&self, names: &[String]) -> AppResult<Vec<Library>> {
            self.inner.find_libraries_by_names(names).await
        }
        async fn find_groups_by_names(&self, names: &[String]) -> AppResult<Vec<PermissionGroup>> {
            self.inner.find_groups_by_names(names).await
        }
        async fn insert_groups(&self, groups: &[PermissionGroup]) -> AppResult<()> {
            self.inner.insert_groups(groups).await
        }
        async fn insert_libraries(&self, _libraries: &[Library]) -> AppResult<()> {
            Err(AppError::database("connection reset"))
        }
        async fn sync_group_members(
            &self,
            group_ids: &[PermissionGroupId],
            members: &[GroupMember],
        ) -> AppResult<MembershipSync> {
            self.inner.sync_group_members(group_ids, members).await
        }
        async fn upsert_library_members(&self, members: &[LibraryMember]) -> AppResult<u64> {
            self.inner.upsert_library_members(members).await
        }
        async fn find_group_members(&self, group_id: PermissionGroupId) -> AppResult<Vec<GroupMember>> {
            self.inner.find_group_members(group_id).await
        }
        async fn find_library_members(
            &self,
            library_id: librarian_core::types::id::LibraryId,
        ) -> AppResult<Vec<LibraryMember>> {
            self.inner.find_library_members(library_id).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_aborts_without_event() {
        let store = Arc::new(BrokenLibraries::default());
        let events = Arc::new(MemoryEventLog::new());
        let provisioner = LibraryProvisioner::new(store.clone(), events.clone());

        let err = provisioner
            .provision_libraries(&[request("F1", "Acme", "P1")])
            .await
            .unwrap_err();
        assert!(err.kind.is_retryable());
        assert!(events.events().await.is_empty());
        assert_eq!(store.inner.library_count().await, 0);

        // Groups created before the failure are reused on retry.
        assert_eq!(store.inner.group_count().await, 1);
    }

    #[tokio::test]
    async fn test_empty_batch_publishes_nothing() {
        let (_store, events, provisioner) = setup();
        assert!(provisioner.provision_libraries(&[]).await.unwrap().is_empty());
        assert!(events.events().await.is_empty());
    }
}
