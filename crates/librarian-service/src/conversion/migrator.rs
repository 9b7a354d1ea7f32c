//! Document migration into file versions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use librarian_core::config::DocumentBatchMode;
use librarian_core::error::AppError;
use librarian_core::result::AppResult;
use librarian_core::types::id::{DocumentId, FolderId, LibraryId};
use librarian_database::{ConversionRequestStore, FileVersionStore, LibraryStore};
use librarian_entity::conversion::{ConversionResult, ConversionStatus};
use librarian_entity::document::Document;
use librarian_entity::file::FileVersion;

/// Converts documents of provisioned folders into file versions.
///
/// A document is migrated at most once. Documents already migrated are
/// reported `Skipped`; documents whose folder has no library yet are
/// reported `Error` and can be retried after provisioning.
#[derive(Debug, Clone)]
pub struct DocumentMigrator {
    requests: Arc<dyn ConversionRequestStore>,
    libraries: Arc<dyn LibraryStore>,
    file_versions: Arc<dyn FileVersionStore>,
    batch_mode: DocumentBatchMode,
}

impl DocumentMigrator {
    /// Creates a new migrator.
    pub fn new(
        requests: Arc<dyn ConversionRequestStore>,
        libraries: Arc<dyn LibraryStore>,
        file_versions: Arc<dyn FileVersionStore>,
        batch_mode: DocumentBatchMode,
    ) -> Self {
        Self {
            requests,
            libraries,
            file_versions,
            batch_mode,
        }
    }

    /// Migrates documents. Returns one result per input document, in input
    /// order.
    ///
    /// In `atomic` mode a failed insert fails the whole call; in `partial`
    /// mode it becomes an `Error` result for that document.
    pub async fn migrate_documents(
        &self,
        documents: &[Document],
    ) -> AppResult<Vec<ConversionResult>> {
        Ok(self.migrate(documents).await?.results)
    }

    /// Migrates the documents whose folder has a library, then fails with a
    /// `Precondition` error naming the documents still waiting for one.
    ///
    /// Used where the caller retries: documents migrated by an earlier
    /// attempt are skipped on the next one.
    pub async fn migrate_or_defer(
        &self,
        documents: &[Document],
    ) -> AppResult<Vec<ConversionResult>> {
        let migration = self.migrate(documents).await?;
        if migration.awaiting_library.is_empty() {
            return Ok(migration.results);
        }

        let waiting: Vec<String> = migration
            .awaiting_library
            .iter()
            .map(|&index| documents[index].id.to_string())
            .collect();
        Err(AppError::precondition(format!(
            "{} of {} documents are waiting for their folder's library: {}",
            waiting.len(),
            documents.len(),
            waiting.join(", ")
        )))
    }

    async fn migrate(&self, documents: &[Document]) -> AppResult<Migration> {
        let mut results: Vec<ConversionResult> = documents
            .iter()
            .map(|doc| ConversionResult::document(doc.id.clone()))
            .collect();
        let mut awaiting_library = Vec::new();
        if documents.is_empty() {
            return Ok(Migration {
                results,
                awaiting_library,
            });
        }

        let libraries = self.libraries_by_folder(documents).await?;
        let library_ids: Vec<LibraryId> = distinct(libraries.values().copied());
        let document_ids: Vec<DocumentId> = distinct(documents.iter().map(|d| d.id.clone()));
        let migrated = if library_ids.is_empty() {
            HashSet::new()
        } else {
            self.file_versions
                .find_migrated_document_ids(&library_ids, &document_ids)
                .await?
        };

        let mut batch: Vec<(usize, FileVersion)> = Vec::new();
        let mut seen: HashSet<&DocumentId> = HashSet::new();
        for (index, doc) in documents.iter().enumerate() {
            let result = &mut results[index];
            let Some(&library_id) = libraries.get(&doc.folder_id) else {
                awaiting_library.push(index);
                result.mark_with(
                    ConversionStatus::Error,
                    format!(
                        "Folder {} has no library yet. Retry after it has been provisioned",
                        doc.folder_id
                    ),
                );
                continue;
            };
            if migrated.contains(&doc.id) {
                result.mark_with(ConversionStatus::Skipped, "Document was already migrated");
                continue;
            }
            if !seen.insert(&doc.id) {
                result.mark_with(
                    ConversionStatus::Skipped,
                    "Document appears more than once in the batch",
                );
                continue;
            }
            batch.push((index, FileVersion::from_document(doc, library_id)));
        }

        if !batch.is_empty() {
            self.persist(batch, &mut results).await?;
        }

        let count = |status| results.iter().filter(|r| r.status == status).count();
        info!(
            documents = documents.len(),
            mode = %self.batch_mode,
            converted = count(ConversionStatus::Converted),
            skipped = count(ConversionStatus::Skipped),
            errors = count(ConversionStatus::Error),
            "Migrated documents"
        );
        Ok(Migration {
            results,
            awaiting_library,
        })
    }

    /// Maps each input folder to its library, found by derived name.
    async fn libraries_by_folder(
        &self,
        documents: &[Document],
    ) -> AppResult<HashMap<FolderId, LibraryId>> {
        let folder_ids: Vec<FolderId> = distinct(documents.iter().map(|d| d.folder_id.clone()));
        let requests = self.requests.find_by_folder_ids(&folder_ids).await?;

        let names: Vec<String> = requests.iter().map(|r| r.derived_name()).collect();
        let by_name: HashMap<String, LibraryId> = self
            .libraries
            .find_libraries_by_names(&names)
            .await?
            .into_iter()
            .map(|l| (l.developer_name, l.id))
            .collect();

        Ok(requests
            .into_iter()
            .filter_map(|r| {
                by_name
                    .get(&r.derived_name())
                    .map(|&library_id| (r.folder_id, library_id))
            })
            .collect())
    }

    async fn persist(
        &self,
        batch: Vec<(usize, FileVersion)>,
        results: &mut [ConversionResult],
    ) -> AppResult<()> {
        let (indices, versions): (Vec<usize>, Vec<FileVersion>) = batch.into_iter().unzip();

        match self.batch_mode {
            DocumentBatchMode::Atomic => {
                self.file_versions.insert_all(&versions).await?;
                for (&index, version) in indices.iter().zip(&versions) {
                    results[index].mark_with(
                        ConversionStatus::Converted,
                        format!("Migrated into library {}", version.library_id),
                    );
                }
            }
            DocumentBatchMode::Partial => {
                let outcomes = self.file_versions.insert_each(&versions).await?;
                for ((&index, version), outcome) in indices.iter().zip(&versions).zip(outcomes) {
                    let result = &mut results[index];
                    match outcome {
                        Ok(()) => {
                            result.mark_with(
                                ConversionStatus::Converted,
                                format!("Migrated into library {}", version.library_id),
                            );
                        }
                        Err(e) if e.is_conflict() => {
                            result.mark_with(
                                ConversionStatus::Skipped,
                                "Document was already migrated",
                            );
                        }
                        Err(e) => {
                            warn!(
                                document_id = %version.origin_document_id,
                                error = %e,
                                "Failed to migrate document"
                            );
                            result.mark_with(ConversionStatus::Error, e.to_string());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Outcome of one migration pass.
struct Migration {
    results: Vec<ConversionResult>,
    /// Indices of documents whose folder has no library yet.
    awaiting_library: Vec<usize>,
}

fn distinct<T: Clone + Eq + std::hash::Hash>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::Utc;
    use librarian_core::error::ErrorKind;
    use librarian_core::types::id::{PermissionTierId, PrincipalId};
    use librarian_database::memory::{
        MemoryConversionRequestStore, MemoryFileVersionStore, MemoryLibraryStore,
    };
    use librarian_entity::conversion::NewConversionRequest;
    use librarian_entity::document::DocumentBody;
    use librarian_entity::library::Library;

    struct Fixture {
        requests: Arc<MemoryConversionRequestStore>,
        libraries: Arc<MemoryLibraryStore>,
        versions: Arc<MemoryFileVersionStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                requests: Arc::new(MemoryConversionRequestStore::new()),
                libraries: Arc::new(MemoryLibraryStore::new()),
                versions: Arc::new(MemoryFileVersionStore::new()),
            }
        }

        /// Registers folder `F` with developer name `dev` and creates its library.
        async fn provisioned(&self, folder: &str, dev: &str) -> LibraryId {
            self.queued(folder, dev).await;
            let library = Library::new(format!("doclib_{dev}"), dev);
            self.libraries
                .insert_libraries(std::slice::from_ref(&library))
                .await
                .unwrap();
            library.id
        }

        async fn queued(&self, folder: &str, dev: &str) {
            self.requests
                .insert_each(&[NewConversionRequest {
                    folder_id: FolderId::from(folder),
                    folder_name: dev.to_string(),
                    folder_developer_name: dev.to_string(),
                    sharing_principals: String::new(),
                    permission_tier_id: PermissionTierId::new(),
                }])
                .await
                .unwrap();
        }

        fn migrator(&self, mode: DocumentBatchMode) -> DocumentMigrator {
            DocumentMigrator::new(
                self.requests.clone(),
                self.libraries.clone(),
                self.versions.clone(),
                mode,
            )
        }
    }

    fn url_document(id: &str, folder: &str) -> Document {
        let now = Utc::now();
        Document {
            id: DocumentId::from(id),
            folder_id: FolderId::from(folder),
            body: DocumentBody::Url {
                url: format!("https://intranet/{id}"),
            },
            title: id.to_string(),
            description: None,
            keywords: None,
            extension: None,
            author_id: PrincipalId::from("U1"),
            created_by: PrincipalId::from("U1"),
            created_at: now,
            last_modified_by: PrincipalId::from("U2"),
            last_modified_at: now,
        }
    }

    #[tokio::test]
    async fn test_url_document_migrates_once() {
        let fixture = Fixture::new();
        let library_id = fixture.provisioned("F", "Acme").await;
        let migrator = fixture.migrator(DocumentBatchMode::Atomic);
        let doc = url_document("D", "F");

        let first = migrator
            .migrate_documents(std::slice::from_ref(&doc))
            .await
            .unwrap();
        assert_eq!(first[0].status, ConversionStatus::Converted);

        let versions = fixture.versions.find_by_library(library_id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].content_url.as_deref(), Some("https://intranet/D"));
        assert!(versions[0].version_data.is_none());
        assert_eq!(versions[0].origin_document_id, doc.id);
        assert_eq!(versions[0].origin_folder_id, doc.folder_id);

        let second = migrator
            .migrate_documents(std::slice::from_ref(&doc))
            .await
            .unwrap();
        assert_eq!(second[0].status, ConversionStatus::Skipped);
        assert_eq!(fixture.versions.len().await, 1);
    }

    #[tokio::test]
    async fn test_only_unmigrated_document_is_converted() {
        let fixture = Fixture::new();
        fixture.provisioned("F", "Acme").await;
        let migrator = fixture.migrator(DocumentBatchMode::Atomic);

        migrator
            .migrate_documents(&[url_document("D1", "F")])
            .await
            .unwrap();
        let results = migrator
            .migrate_documents(&[url_document("D1", "F"), url_document("D2", "F")])
            .await
            .unwrap();

        assert_eq!(results[0].status, ConversionStatus::Skipped);
        assert_eq!(results[1].status, ConversionStatus::Converted);
        assert_eq!(fixture.versions.len().await, 2);
    }

    #[tokio::test]
    async fn test_folder_without_library_is_reported() {
        let fixture = Fixture::new();
        fixture.provisioned("F", "Acme").await;
        fixture.queued("G", "Globex").await;
        let migrator = fixture.migrator(DocumentBatchMode::Atomic);

        let results = migrator
            .migrate_documents(&[
                url_document("D1", "G"),
                url_document("D2", "F"),
                url_document("D3", "unknown"),
            ])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, ConversionStatus::Error);
        assert!(results[0].messages.iter().any(|m| m.contains("Retry")));
        assert_eq!(results[1].status, ConversionStatus::Converted);
        assert_eq!(results[2].status, ConversionStatus::Error);
    }

    #[tokio::test]
    async fn test_defer_fails_until_every_folder_has_a_library() {
        let fixture = Fixture::new();
        fixture.provisioned("A", "Acme").await;
        fixture.queued("B", "Globex").await;
        let migrator = fixture.migrator(DocumentBatchMode::Atomic);
        let docs = vec![url_document("D1", "A"), url_document("D2", "B")];

        let err = migrator.migrate_or_defer(&docs).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Precondition);
        assert!(err.kind.is_retryable());
        assert!(err.message.contains("D2"));
        assert!(!err.message.contains("D1"));
        // The ready document was still migrated.
        assert_eq!(fixture.versions.len().await, 1);

        fixture
            .libraries
            .insert_libraries(&[Library::new("doclib_Globex", "Globex")])
            .await
            .unwrap();

        let results = migrator.migrate_or_defer(&docs).await.unwrap();
        assert_eq!(results[0].status, ConversionStatus::Skipped);
        assert_eq!(results[1].status, ConversionStatus::Converted);
        assert_eq!(fixture.versions.len().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_document_in_batch_is_skipped() {
        let fixture = Fixture::new();
        fixture.provisioned("F", "Acme").await;
        let migrator = fixture.migrator(DocumentBatchMode::Atomic);

        let results = migrator
            .migrate_documents(&[url_document("D1", "F"), url_document("D1", "F")])
            .await
            .unwrap();
        assert_eq!(results[0].status, ConversionStatus::Converted);
        assert_eq!(results[1].status, ConversionStatus::Skipped);
        assert_eq!(fixture.versions.len().await, 1);
    }

    /// File version store that rejects one document and accepts the rest.
    #[derive(Debug)]
    struct RejectingVersions {
        inner: MemoryFileVersionStore,
        reject: DocumentId,
    }

    #[async_trait]
    impl FileVersionStore for RejectingVersions {
        async fn find_migrated_document_ids(
            &self,
            library_ids: &[LibraryId],
            document_ids: &[DocumentId],
        ) -> AppResult<HashSet<DocumentId>> {
            self.inner
                .find_migrated_document_ids(library_ids, document_ids)
                .await
        }

        async fn insert_all(&self, versions: &[FileVersion]) -> AppResult<()> {
            if versions.iter().any(|v| v.origin_document_id == self.reject) {
                return Err(AppError::database("value too long for column"));
            }
            self.inner.insert_all(versions).await
        }

        async fn insert_each(&self, versions: &[FileVersion]) -> AppResult<Vec<AppResult<()>>> {
            let mut outcomes = Vec::new();
            for version in versions {
                outcomes.push(self.insert_all(std::slice::from_ref(version)).await);
            }
            Ok(outcomes)
        }

        async fn find_by_library(&self, library_id: LibraryId) -> AppResult<Vec<FileVersion>> {
            self.inner.find_by_library(library_id).await
        }
    }

    fn rejecting_migrator(
        fixture: &Fixture,
        mode: DocumentBatchMode,
    ) -> (Arc<RejectingVersions>, DocumentMigrator) {
        let versions = Arc::new(RejectingVersions {
            inner: MemoryFileVersionStore::new(),
            reject: DocumentId::from("bad"),
        });
        let migrator = DocumentMigrator::new(
            fixture.requests.clone(),
            fixture.libraries.clone(),
            versions.clone(),
            mode,
        );
        (versions, migrator)
    }

    #[tokio::test]
    async fn test_atomic_mode_fails_whole_batch() {
        let fixture = Fixture::new();
        fixture.provisioned("F", "Acme").await;
        let (versions, migrator) = rejecting_migrator(&fixture, DocumentBatchMode::Atomic);

        let result = migrator
            .migrate_documents(&[url_document("good", "F"), url_document("bad", "F")])
            .await;
        assert!(result.is_err());
        assert!(versions.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_partial_mode_isolates_failures() {
        let fixture = Fixture::new();
        fixture.provisioned("F", "Acme").await;
        let (versions, migrator) = rejecting_migrator(&fixture, DocumentBatchMode::Partial);

        let results = migrator
            .migrate_documents(&[url_document("bad", "F"), url_document("good", "F")])
            .await
            .unwrap();
        assert_eq!(results[0].status, ConversionStatus::Error);
        assert!(results[0].messages.iter().any(|m| m.contains("value too long")));
        assert_eq!(results[1].status, ConversionStatus::Converted);
        assert_eq!(versions.inner.len().await, 1);
    }
}
