//! Shared test helpers for end-to-end conversion tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use librarian_core::config::{DocumentBatchMode, WorkerConfig};
use librarian_core::types::id::{DocumentId, FolderId, PermissionTierId, PrincipalId};
use librarian_database::Stores;
use librarian_entity::conversion::TierMapping;
use librarian_entity::document::{Document, DocumentBody};
use librarian_entity::folder::{Folder, FolderAccess, ResolvedFolder};
use librarian_service::conversion::{
    ConversionRequestRegistry, DocumentMigrator, LibraryProvisioner,
};
use librarian_service::sharing::{Credential, StaticMembershipResolver};
use librarian_worker::jobs::conversion_executor;
use librarian_worker::{JobQueue, JobQueuePublisher, WorkerRunner};

/// Test application context wired over in-memory stores
pub struct TestApp {
    /// Every store
    pub stores: Stores,
    /// Job queue shared by publisher and runner
    pub queue: Arc<JobQueue>,
    /// Worker runner for draining queued jobs
    pub runner: WorkerRunner,
    /// Registry over the sharing fixture
    pub registry: ConversionRequestRegistry,
    /// Provisioner publishing onto the job queue
    pub provisioner: LibraryProvisioner,
    /// Migrator in atomic mode
    pub migrator: DocumentMigrator,
    /// Tier mapping used when preparing folders
    pub tiers: TierMapping,
}

impl TestApp {
    /// Create a new test application whose resolver knows `folders`
    pub fn new(folders: Vec<ResolvedFolder>) -> Self {
        let stores = Stores::memory();
        let queue = Arc::new(JobQueue::new(stores.jobs.clone(), "integration", 3));
        let publisher = Arc::new(JobQueuePublisher::new(queue.clone()));

        let executor = conversion_executor(&stores, publisher.clone(), DocumentBatchMode::Atomic);
        let runner = WorkerRunner::new(queue.clone(), Arc::new(executor), WorkerConfig::default());

        let registry = ConversionRequestRegistry::new(
            stores.requests.clone(),
            Arc::new(StaticMembershipResolver::new(folders)),
        );
        let provisioner = LibraryProvisioner::new(stores.libraries.clone(), publisher);
        let migrator = DocumentMigrator::new(
            stores.requests.clone(),
            stores.libraries.clone(),
            stores.file_versions.clone(),
            DocumentBatchMode::Atomic,
        );

        Self {
            stores,
            queue,
            runner,
            registry,
            provisioner,
            migrator,
            tiers: TierMapping::new(PermissionTierId::new(), PermissionTierId::new()),
        }
    }

    /// Credential accepted by the static resolver
    pub fn credential(&self) -> Credential {
        Credential::new("integration-token")
    }
}

/// A folder and its sharing
pub fn shared_folder(
    id: &str,
    developer_name: &str,
    access: FolderAccess,
    principals: &[&str],
) -> (Folder, ResolvedFolder) {
    let folder = Folder::new(id, developer_name, developer_name);
    let resolved = ResolvedFolder {
        id: folder.id.clone(),
        name: folder.name.clone(),
        developer_name: folder.developer_name.clone(),
        access,
        principals: principals.iter().map(|p| PrincipalId::from(*p)).collect(),
    };
    (folder, resolved)
}

/// A link document
pub fn url_document(id: &str, folder: &str, url: &str) -> Document {
    Document {
        id: DocumentId::from(id),
        folder_id: FolderId::from(folder),
        body: DocumentBody::Url {
            url: url.to_string(),
        },
        title: format!("Link {id}"),
        description: Some("Imported link".to_string()),
        keywords: Some("imported".to_string()),
        extension: None,
        author_id: PrincipalId::from("author"),
        created_by: PrincipalId::from("author"),
        created_at: Utc.with_ymd_and_hms(2018, 3, 4, 5, 6, 7).unwrap(),
        last_modified_by: PrincipalId::from("editor"),
        last_modified_at: Utc.with_ymd_and_hms(2021, 8, 9, 10, 11, 12).unwrap(),
    }
}

/// A binary document
pub fn binary_document(id: &str, folder: &str, bytes: &[u8]) -> Document {
    Document {
        body: DocumentBody::Binary {
            data: bytes.to_vec(),
        },
        extension: Some("bin".to_string()),
        ..url_document(id, folder, "")
    }
}
