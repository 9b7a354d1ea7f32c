//! In-memory conversion request store.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use librarian_core::error::AppError;
use librarian_core::events::ProvisionCompletion;
use librarian_core::result::AppResult;
use librarian_core::types::id::{ConversionRequestId, FolderId};
use librarian_entity::conversion::{ConversionRequest, NewConversionRequest};

use crate::store::ConversionRequestStore;

/// Conversion requests held in process memory.
#[derive(Debug, Default)]
pub struct MemoryConversionRequestStore {
    records: DashMap<ConversionRequestId, (u64, ConversionRequest)>,
    by_folder: DashMap<FolderId, ConversionRequestId>,
    sequence: AtomicU64,
}

impl MemoryConversionRequestStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert_one(&self, data: &NewConversionRequest) -> AppResult<ConversionRequest> {
        match self.by_folder.entry(data.folder_id.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "A conversion request for folder '{}' already exists",
                data.folder_id
            ))),
            Entry::Vacant(slot) => {
                let request = data.clone().into_request(Utc::now());
                slot.insert(request.id);
                let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
                self.records.insert(request.id, (seq, request.clone()));
                Ok(request)
            }
        }
    }

    fn sorted(&self, mut rows: Vec<(u64, ConversionRequest)>) -> Vec<ConversionRequest> {
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, request)| request).collect()
    }
}

#[async_trait]
impl ConversionRequestStore for MemoryConversionRequestStore {
    async fn find_by_folder_ids(
        &self,
        folder_ids: &[FolderId],
    ) -> AppResult<Vec<ConversionRequest>> {
        let rows = self
            .records
            .iter()
            .filter(|entry| folder_ids.contains(&entry.value().1.folder_id))
            .map(|entry| entry.value().clone())
            .collect();
        Ok(self.sorted(rows))
    }

    async fn find_by_ids(&self, ids: &[ConversionRequestId]) -> AppResult<Vec<ConversionRequest>> {
        let rows = ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|entry| entry.value().clone()))
            .collect();
        Ok(self.sorted(rows))
    }

    async fn find_unprovisioned(&self, limit: i64) -> AppResult<Vec<ConversionRequest>> {
        let rows = self
            .records
            .iter()
            .filter(|entry| entry.value().1.library_id.is_none())
            .map(|entry| entry.value().clone())
            .collect();
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self.sorted(rows).into_iter().take(limit).collect())
    }

    async fn list(&self) -> AppResult<Vec<ConversionRequest>> {
        let rows = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        Ok(self.sorted(rows))
    }

    async fn insert_each(
        &self,
        requests: &[NewConversionRequest],
    ) -> AppResult<Vec<AppResult<ConversionRequest>>> {
        Ok(requests.iter().map(|r| self.insert_one(r)).collect())
    }

    async fn record_provisioning(&self, completions: &[ProvisionCompletion]) -> AppResult<u64> {
        let mut updated = 0u64;
        for completion in completions {
            if let Some(mut entry) = self.records.get_mut(&completion.request_id) {
                let request = &mut entry.value_mut().1;
                request.library_id = Some(completion.library_id);
                request.group_id = Some(completion.group_id);
                request.updated_at = Utc::now();
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_by_folder(&self, folder_id: &FolderId) -> AppResult<Option<ConversionRequest>> {
        let Some((_, id)) = self.by_folder.remove(folder_id) else {
            return Ok(None);
        };
        Ok(self.records.remove(&id).map(|(_, (_, request))| request))
    }
}
