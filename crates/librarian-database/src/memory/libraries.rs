//! In-memory library, group, and membership store.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use librarian_core::error::AppError;
use librarian_core::result::AppResult;
use librarian_core::types::id::{LibraryId, PermissionGroupId, PrincipalId};
use librarian_entity::library::{GroupMember, Library, LibraryMember, PermissionGroup};

use crate::store::{LibraryStore, MembershipSync};

#[derive(Debug, Default)]
struct LibraryState {
    libraries: HashMap<String, Library>,
    groups: HashMap<String, PermissionGroup>,
    group_members: HashMap<PermissionGroupId, BTreeMap<PrincipalId, GroupMember>>,
    library_members: Vec<LibraryMember>,
}

/// Libraries and groups held in process memory, keyed by developer name.
#[derive(Debug, Default)]
pub struct MemoryLibraryStore {
    state: RwLock<LibraryState>,
}

impl MemoryLibraryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of libraries.
    pub async fn library_count(&self) -> usize {
        self.state.read().await.libraries.len()
    }

    /// Number of groups.
    pub async fn group_count(&self) -> usize {
        self.state.read().await.groups.len()
    }
}

fn duplicate_names<'a>(
    names: impl Iterator<Item = &'a str>,
    existing: impl Fn(&str) -> bool,
) -> Option<String> {
    let mut seen = HashSet::new();
    for name in names {
        if existing(name) || !seen.insert(name) {
            return Some(name.to_string());
        }
    }
    None
}

#[async_trait]
impl LibraryStore for MemoryLibraryStore {
    async fn find_libraries_by_names(&self, names: &[String]) -> AppResult<Vec<Library>> {
        let state = self.state.read().await;
        Ok(names
            .iter()
            .filter_map(|name| state.libraries.get(name).cloned())
            .collect())
    }

    async fn find_groups_by_names(&self, names: &[String]) -> AppResult<Vec<PermissionGroup>> {
        let state = self.state.read().await;
        Ok(names
            .iter()
            .filter_map(|name| state.groups.get(name).cloned())
            .collect())
    }

    async fn insert_groups(&self, groups: &[PermissionGroup]) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(name) = duplicate_names(
            groups.iter().map(|g| g.developer_name.as_str()),
            |name| state.groups.contains_key(name),
        ) {
            return Err(AppError::conflict(format!(
                "group with developer name '{name}' already exists"
            )));
        }
        for group in groups {
            state
                .groups
                .insert(group.developer_name.clone(), group.clone());
        }
        Ok(())
    }

    async fn insert_libraries(&self, libraries: &[Library]) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(name) = duplicate_names(
            libraries.iter().map(|l| l.developer_name.as_str()),
            |name| state.libraries.contains_key(name),
        ) {
            return Err(AppError::conflict(format!(
                "library with developer name '{name}' already exists"
            )));
        }
        for library in libraries {
            state
                .libraries
                .insert(library.developer_name.clone(), library.clone());
        }
        Ok(())
    }

    async fn sync_group_members(
        &self,
        group_ids: &[PermissionGroupId],
        members: &[GroupMember],
    ) -> AppResult<MembershipSync> {
        let mut state = self.state.write().await;
        let mut sync = MembershipSync::default();

        for group_id in group_ids {
            let keep: HashSet<&PrincipalId> = members
                .iter()
                .filter(|m| m.group_id == *group_id)
                .map(|m| &m.principal_id)
                .collect();
            if let Some(current) = state.group_members.get_mut(group_id) {
                let before = current.len();
                current.retain(|principal, _| keep.contains(principal));
                sync.removed += (before - current.len()) as u64;
            }
        }

        for member in members {
            let group = state.group_members.entry(member.group_id).or_default();
            if !group.contains_key(&member.principal_id) {
                group.insert(member.principal_id.clone(), member.clone());
                sync.added += 1;
            }
        }
        Ok(sync)
    }

    async fn upsert_library_members(&self, members: &[LibraryMember]) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let mut written = 0u64;
        for member in members {
            let existing = state
                .library_members
                .iter_mut()
                .find(|m| m.library_id == member.library_id && m.group_id == member.group_id);
            match existing {
                Some(grant) if grant.permission_tier_id == member.permission_tier_id => {}
                Some(grant) => {
                    grant.permission_tier_id = member.permission_tier_id;
                    written += 1;
                }
                None => {
                    state.library_members.push(member.clone());
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    async fn find_group_members(&self, group_id: PermissionGroupId) -> AppResult<Vec<GroupMember>> {
        let state = self.state.read().await;
        Ok(state
            .group_members
            .get(&group_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_library_members(&self, library_id: LibraryId) -> AppResult<Vec<LibraryMember>> {
        let state = self.state.read().await;
        Ok(state
            .library_members
            .iter()
            .filter(|m| m.library_id == library_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::types::id::PermissionTierId;

    #[tokio::test]
    async fn test_insert_libraries_is_all_or_nothing() {
        let store = MemoryLibraryStore::new();
        store
            .insert_libraries(&[Library::new("doclib_A", "A")])
            .await
            .unwrap();

        let err = store
            .insert_libraries(&[Library::new("doclib_B", "B"), Library::new("doclib_A", "A")])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.library_count().await, 1);
    }

    #[tokio::test]
    async fn test_sync_group_members_adds_and_removes() {
        let store = MemoryLibraryStore::new();
        let group = PermissionGroup::new("doclib_A", "A");
        let member = |p: &str| GroupMember::new(group.id, PrincipalId::from(p));

        let sync = store
            .sync_group_members(&[group.id], &[member("P1"), member("P2")])
            .await
            .unwrap();
        assert_eq!(sync, MembershipSync { added: 2, removed: 0 });

        let sync = store
            .sync_group_members(&[group.id], &[member("P1"), member("P3")])
            .await
            .unwrap();
        assert_eq!(sync, MembershipSync { added: 1, removed: 1 });

        let principals: Vec<String> = store
            .find_group_members(group.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.principal_id.as_str().to_string())
            .collect();
        assert_eq!(principals, vec!["P1", "P3"]);

        let sync = store.sync_group_members(&[group.id], &[]).await.unwrap();
        assert_eq!(sync.removed, 2);
        assert!(store.find_group_members(group.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_library_members_rewrites_tier() {
        let store = MemoryLibraryStore::new();
        let library = Library::new("doclib_A", "A");
        let group = PermissionGroup::new("doclib_A", "A");
        let (read_write, read_only) = (PermissionTierId::new(), PermissionTierId::new());

        let grant = LibraryMember::new(library.id, group.id, read_write);
        assert_eq!(store.upsert_library_members(&[grant.clone()]).await.unwrap(), 1);
        let same = LibraryMember::new(library.id, group.id, read_write);
        assert_eq!(store.upsert_library_members(&[same]).await.unwrap(), 0);

        let narrowed = LibraryMember::new(library.id, group.id, read_only);
        assert_eq!(store.upsert_library_members(&[narrowed]).await.unwrap(), 1);

        let grants = store.find_library_members(library.id).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].id, grant.id);
        assert_eq!(grants[0].permission_tier_id, read_only);
    }
}
