//! Store traits the conversion services are written against.
//!
//! Each trait has a PostgreSQL implementation in [`crate::repositories`]
//! and, with the `memory` feature, an in-process one in `crate::memory`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use librarian_core::events::ProvisionCompletion;
use librarian_core::result::AppResult;
use librarian_core::types::id::{
    ConversionRequestId, DocumentId, FolderId, JobId, LibraryId, PermissionGroupId,
};
use librarian_entity::conversion::{ConversionRequest, NewConversionRequest};
use librarian_entity::file::FileVersion;
use librarian_entity::job::{Job, JobStatus};
use librarian_entity::library::{GroupMember, Library, LibraryMember, PermissionGroup};

use crate::repositories::{
    ConversionRequestRepository, FileVersionRepository, JobRepository, LibraryRepository,
};

/// Persistence for conversion requests.
///
/// At most one request exists per folder id; inserting a second one fails
/// with a `Conflict` error.
#[async_trait]
pub trait ConversionRequestStore: Send + Sync + std::fmt::Debug + 'static {
    /// Requests whose folder id is one of `folder_ids`.
    async fn find_by_folder_ids(&self, folder_ids: &[FolderId])
    -> AppResult<Vec<ConversionRequest>>;

    /// Requests with the given ids.
    async fn find_by_ids(&self, ids: &[ConversionRequestId]) -> AppResult<Vec<ConversionRequest>>;

    /// Oldest requests that have no library recorded yet.
    async fn find_unprovisioned(&self, limit: i64) -> AppResult<Vec<ConversionRequest>>;

    /// All requests, oldest first.
    async fn list(&self) -> AppResult<Vec<ConversionRequest>>;

    /// Insert each request independently. Returns one outcome per input,
    /// in input order; a failed record does not affect the others.
    async fn insert_each(
        &self,
        requests: &[NewConversionRequest],
    ) -> AppResult<Vec<AppResult<ConversionRequest>>>;

    /// Record library and group ids on requests, overwriting by request id.
    /// Returns the number of requests updated.
    async fn record_provisioning(&self, completions: &[ProvisionCompletion]) -> AppResult<u64>;

    /// Delete the request for a folder, allowing it to be converted again.
    async fn delete_by_folder(&self, folder_id: &FolderId) -> AppResult<Option<ConversionRequest>>;
}

/// Changes made by [`LibraryStore::sync_group_members`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MembershipSync {
    /// Memberships inserted.
    pub added: u64,
    /// Memberships removed.
    pub removed: u64,
}

/// Persistence for libraries, permission groups, and their memberships.
///
/// Developer names are unique per table. A group holds each principal at
/// most once and a library grants each group exactly one tier.
#[async_trait]
pub trait LibraryStore: Send + Sync + std::fmt::Debug + 'static {
    /// Libraries with one of the given developer names.
    async fn find_libraries_by_names(&self, names: &[String]) -> AppResult<Vec<Library>>;

    /// Groups with one of the given developer names.
    async fn find_groups_by_names(&self, names: &[String]) -> AppResult<Vec<PermissionGroup>>;

    /// Insert groups, all or nothing.
    async fn insert_groups(&self, groups: &[PermissionGroup]) -> AppResult<()>;

    /// Insert libraries, all or nothing.
    async fn insert_libraries(&self, libraries: &[Library]) -> AppResult<()>;

    /// Reconcile the membership of each group in `group_ids` with the
    /// entries of `members` for that group. Missing pairs are inserted and
    /// principals no longer listed are removed, all or nothing.
    async fn sync_group_members(
        &self,
        group_ids: &[PermissionGroupId],
        members: &[GroupMember],
    ) -> AppResult<MembershipSync>;

    /// Grant groups access to libraries. An existing grant for the same
    /// library and group takes the new tier. Returns how many grants were
    /// created or changed.
    async fn upsert_library_members(&self, members: &[LibraryMember]) -> AppResult<u64>;

    /// Members of a group.
    async fn find_group_members(&self, group_id: PermissionGroupId) -> AppResult<Vec<GroupMember>>;

    /// Groups granted access to a library.
    async fn find_library_members(&self, library_id: LibraryId) -> AppResult<Vec<LibraryMember>>;
}

/// Persistence for migrated file versions.
///
/// At most one version exists per origin document.
#[async_trait]
pub trait FileVersionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Which of `document_ids` already have a version in one of `library_ids`.
    async fn find_migrated_document_ids(
        &self,
        library_ids: &[LibraryId],
        document_ids: &[DocumentId],
    ) -> AppResult<HashSet<DocumentId>>;

    /// Insert all versions in one all-or-nothing operation.
    async fn insert_all(&self, versions: &[FileVersion]) -> AppResult<()>;

    /// Insert each version independently; one outcome per input, in order.
    async fn insert_each(&self, versions: &[FileVersion]) -> AppResult<Vec<AppResult<()>>>;

    /// Versions published into a library.
    async fn find_by_library(&self, library_id: LibraryId) -> AppResult<Vec<FileVersion>>;
}

/// Persistence for background jobs.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a new job.
    async fn create(&self, job: &Job) -> AppResult<()>;

    /// Find a job by id.
    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>>;

    /// Atomically claim the next pending job of a queue, marking it running
    /// and counting the attempt.
    async fn claim_next(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>>;

    /// Mark a job completed.
    async fn mark_completed(&self, id: JobId, result: Option<serde_json::Value>) -> AppResult<()>;

    /// Mark a job failed for good.
    async fn mark_failed(&self, id: JobId, error: &str) -> AppResult<()>;

    /// Put a job back to pending after a transient failure. It is not
    /// claimed again before `retry_at`.
    async fn retry(&self, id: JobId, error: &str, retry_at: DateTime<Utc>) -> AppResult<()>;

    /// Count jobs in a status.
    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64>;
}

/// The full set of stores, shared by services and job handlers.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Conversion requests.
    pub requests: Arc<dyn ConversionRequestStore>,
    /// Libraries, groups, and memberships.
    pub libraries: Arc<dyn LibraryStore>,
    /// Migrated file versions.
    pub file_versions: Arc<dyn FileVersionStore>,
    /// Background jobs.
    pub jobs: Arc<dyn JobStore>,
}

impl Stores {
    /// Stores backed by PostgreSQL repositories sharing one pool.
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            requests: Arc::new(ConversionRequestRepository::new(pool.clone())),
            libraries: Arc::new(LibraryRepository::new(pool.clone())),
            file_versions: Arc::new(FileVersionRepository::new(pool.clone())),
            jobs: Arc::new(JobRepository::new(pool.clone())),
        }
    }

    /// Stores held in process memory.
    #[cfg(feature = "memory")]
    pub fn memory() -> Self {
        use crate::memory::{
            MemoryConversionRequestStore, MemoryFileVersionStore, MemoryJobStore,
            MemoryLibraryStore,
        };

        Self {
            requests: Arc::new(MemoryConversionRequestStore::new()),
            libraries: Arc::new(MemoryLibraryStore::new()),
            file_versions: Arc::new(MemoryFileVersionStore::new()),
            jobs: Arc::new(MemoryJobStore::new()),
        }
    }
}
