//! In-memory file version store.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use librarian_core::error::AppError;
use librarian_core::result::AppResult;
use librarian_core::types::id::{DocumentId, LibraryId};
use librarian_entity::file::FileVersion;

use crate::store::FileVersionStore;

/// File versions held in process memory, unique per origin document.
#[derive(Debug, Default)]
pub struct MemoryFileVersionStore {
    versions: RwLock<HashMap<DocumentId, FileVersion>>,
}

impl MemoryFileVersionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored versions.
    pub async fn len(&self) -> usize {
        self.versions.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.versions.read().await.is_empty()
    }
}

fn already_migrated(document_id: &DocumentId) -> AppError {
    AppError::conflict(format!("Document '{document_id}' has already been migrated"))
}

#[async_trait]
impl FileVersionStore for MemoryFileVersionStore {
    async fn find_migrated_document_ids(
        &self,
        library_ids: &[LibraryId],
        document_ids: &[DocumentId],
    ) -> AppResult<HashSet<DocumentId>> {
        let versions = self.versions.read().await;
        Ok(document_ids
            .iter()
            .filter(|id| {
                versions
                    .get(*id)
                    .is_some_and(|v| library_ids.contains(&v.library_id))
            })
            .cloned()
            .collect())
    }

    async fn insert_all(&self, new_versions: &[FileVersion]) -> AppResult<()> {
        let mut versions = self.versions.write().await;
        let mut seen = HashSet::new();
        for version in new_versions {
            let origin = &version.origin_document_id;
            if versions.contains_key(origin) || !seen.insert(origin) {
                return Err(already_migrated(origin));
            }
        }
        for version in new_versions {
            versions.insert(version.origin_document_id.clone(), version.clone());
        }
        Ok(())
    }

    async fn insert_each(&self, new_versions: &[FileVersion]) -> AppResult<Vec<AppResult<()>>> {
        let mut versions = self.versions.write().await;
        let outcomes = new_versions
            .iter()
            .map(|version| {
                let origin = &version.origin_document_id;
                if versions.contains_key(origin) {
                    return Err(already_migrated(origin));
                }
                versions.insert(origin.clone(), version.clone());
                Ok(())
            })
            .collect();
        Ok(outcomes)
    }

    async fn find_by_library(&self, library_id: LibraryId) -> AppResult<Vec<FileVersion>> {
        let versions = self.versions.read().await;
        let mut found: Vec<FileVersion> = versions
            .values()
            .filter(|v| v.library_id == library_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }
}
