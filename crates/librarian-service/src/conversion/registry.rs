//! Conversion request registration.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use librarian_core::types::id::FolderId;
use librarian_database::ConversionRequestStore;
use librarian_entity::conversion::{
    ConversionRequest, ConversionResult, ConversionStatus, NewConversionRequest, TierMapping,
};
use librarian_entity::folder::{Folder, ResolvedFolder};

use crate::sharing::{Credential, MembershipResolver};

/// Records which folders are queued for conversion.
///
/// A folder is registered at most once. Folders that already have a request
/// are reported as skipped along with the request to delete in order to
/// convert them again.
#[derive(Debug, Clone)]
pub struct ConversionRequestRegistry {
    requests: Arc<dyn ConversionRequestStore>,
    resolver: Arc<dyn MembershipResolver>,
}

impl ConversionRequestRegistry {
    /// Creates a new registry.
    pub fn new(
        requests: Arc<dyn ConversionRequestStore>,
        resolver: Arc<dyn MembershipResolver>,
    ) -> Self {
        Self {
            requests,
            resolver,
        }
    }

    /// Registers folders for conversion.
    ///
    /// Returns one result per input folder, in input order, each ending in
    /// `Skipped`, `Queued`, or `Error`.
    pub async fn prepare_for_conversion(
        &self,
        folders: &[Folder],
        credential: &Credential,
        tiers: &TierMapping,
    ) -> Vec<ConversionResult> {
        let mut results: Vec<ConversionResult> = folders
            .iter()
            .map(|folder| ConversionResult::folder(folder.id.clone()))
            .collect();

        let folder_ids: Vec<FolderId> = distinct(folders.iter().map(|f| f.id.clone()));
        let existing: HashMap<FolderId, ConversionRequest> =
            match self.requests.find_by_folder_ids(&folder_ids).await {
                Ok(found) => found.into_iter().map(|r| (r.folder_id.clone(), r)).collect(),
                Err(e) => {
                    warn!(error = %e, "Failed to look up existing conversion requests");
                    fail_pending(&mut results, &e.to_string());
                    return results;
                }
            };

        let mut candidates = Vec::new();
        for (index, folder) in folders.iter().enumerate() {
            match existing.get(&folder.id) {
                Some(request) => {
                    results[index].mark_with(ConversionStatus::Skipped, already_requested(request));
                }
                None => candidates.push(index),
            }
        }

        if candidates.is_empty() {
            log_summary(&results);
            return results;
        }

        let resolved = self.resolve(folders, &candidates, credential, &mut results).await;
        let (indices, new_requests): (Vec<usize>, Vec<NewConversionRequest>) = resolved
            .into_iter()
            .map(|(index, folder)| (index, NewConversionRequest::from_resolved(&folder, tiers)))
            .unzip();

        if !new_requests.is_empty() {
            self.persist(&indices, &new_requests, &mut results).await;
        }

        log_summary(&results);
        results
    }

    /// Resolves sharing for candidate folders in a single resolver call.
    /// Folders that fail to resolve are marked `Error`.
    async fn resolve(
        &self,
        folders: &[Folder],
        candidates: &[usize],
        credential: &Credential,
        results: &mut [ConversionResult],
    ) -> Vec<(usize, ResolvedFolder)> {
        let names = distinct(
            candidates
                .iter()
                .map(|&index| folders[index].developer_name.clone()),
        );

        let resolutions = match self.resolver.resolve(&names, credential).await {
            Ok(resolutions) => resolutions,
            Err(e) => {
                warn!(folders = names.len(), error = %e, "Sharing resolution failed");
                for &index in candidates {
                    results[index].mark_with(
                        ConversionStatus::Error,
                        format!("Failed to resolve folder sharing: {e}"),
                    );
                }
                return Vec::new();
            }
        };

        let by_name: HashMap<String, Result<ResolvedFolder, String>> = resolutions
            .into_iter()
            .map(|r| (r.developer_name, r.outcome))
            .collect();

        let mut resolved = Vec::with_capacity(candidates.len());
        for &index in candidates {
            let folder = &folders[index];
            match by_name.get(&folder.developer_name) {
                Some(Ok(found)) => resolved.push((index, found.clone())),
                Some(Err(reason)) => {
                    results[index].mark_with(ConversionStatus::Error, reason.clone());
                }
                None => {
                    results[index].mark_with(
                        ConversionStatus::Error,
                        format!(
                            "Sharing resolver returned nothing for folder '{}'",
                            folder.developer_name
                        ),
                    );
                }
            }
        }
        resolved
    }

    /// Persists new requests; each record succeeds or fails on its own.
    async fn persist(
        &self,
        indices: &[usize],
        new_requests: &[NewConversionRequest],
        results: &mut [ConversionResult],
    ) {
        let outcomes = match self.requests.insert_each(new_requests).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!(error = %e, "Failed to persist conversion requests");
                for &index in indices {
                    results[index].mark_with(ConversionStatus::Error, e.to_string());
                }
                return;
            }
        };

        for ((&index, data), outcome) in indices.iter().zip(new_requests).zip(outcomes) {
            let result = &mut results[index];
            match outcome {
                Ok(request) => {
                    info!(
                        folder_id = %request.folder_id,
                        request_id = %request.id,
                        "Queued folder for conversion"
                    );
                    result.mark_with(
                        ConversionStatus::Queued,
                        format!("Queued as conversion request {}", request.id),
                    );
                }
                Err(e) if e.is_conflict() => {
                    result.mark_with(
                        ConversionStatus::Skipped,
                        format!(
                            "Folder {} was queued concurrently. To force re-conversion, \
                             delete its conversion request and try again",
                            data.folder_id
                        ),
                    );
                }
                Err(e) => {
                    result.mark_with(ConversionStatus::Error, e.to_string());
                }
            }
        }
    }
}

fn already_requested(request: &ConversionRequest) -> String {
    format!(
        "Folder {} already has conversion request {}. To force re-conversion, \
         delete conversion request {} and try again",
        request.folder_id, request.id, request.id
    )
}

fn distinct<T: Clone + Eq + std::hash::Hash>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

fn fail_pending(results: &mut [ConversionResult], message: &str) {
    for result in results.iter_mut().filter(|r| !r.is_terminal()) {
        result.mark_with(ConversionStatus::Error, message);
    }
}

fn log_summary(results: &[ConversionResult]) {
    let count = |status| results.iter().filter(|r| r.status == status).count();
    info!(
        folders = results.len(),
        queued = count(ConversionStatus::Queued),
        skipped = count(ConversionStatus::Skipped),
        errors = count(ConversionStatus::Error),
        "Prepared folders for conversion"
    );
}
