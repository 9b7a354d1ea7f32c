//! File version repository implementation.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use librarian_core::error::{AppError, ErrorKind};
use librarian_core::result::AppResult;
use librarian_core::types::id::{DocumentId, LibraryId};
use librarian_entity::file::FileVersion;

use crate::store::FileVersionStore;

/// Repository for migrated file versions.
#[derive(Debug, Clone)]
pub struct FileVersionRepository {
    pool: PgPool,
}

impl FileVersionRepository {
    /// Create a new file version repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_version<'e, E>(executor: E, version: &FileVersion) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO file_versions \
         (id, library_id, content_url, version_data, path_on_client, title, description, tags, \
          owner_id, created_by, created_at, last_modified_by, last_modified_at, \
          origin_document_id, origin_folder_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(version.id)
    .bind(version.library_id)
    .bind(&version.content_url)
    .bind(&version.version_data)
    .bind(&version.path_on_client)
    .bind(&version.title)
    .bind(&version.description)
    .bind(&version.tags)
    .bind(&version.owner_id)
    .bind(&version.created_by)
    .bind(version.created_at)
    .bind(&version.last_modified_by)
    .bind(version.last_modified_at)
    .bind(&version.origin_document_id)
    .bind(&version.origin_folder_id)
    .execute(executor)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err)
            if db_err.constraint() == Some("file_versions_origin_document_id_key") =>
        {
            AppError::conflict(format!(
                "Document '{}' has already been migrated",
                version.origin_document_id
            ))
        }
        _ => AppError::with_source(
            ErrorKind::Database,
            format!("Failed to insert file version: {e}"),
            e,
        ),
    })?;
    Ok(())
}

#[async_trait]
impl FileVersionStore for FileVersionRepository {
    async fn find_migrated_document_ids(
        &self,
        library_ids: &[LibraryId],
        document_ids: &[DocumentId],
    ) -> AppResult<HashSet<DocumentId>> {
        let libraries: Vec<Uuid> = library_ids.iter().map(|id| id.into_uuid()).collect();
        let documents: Vec<String> = document_ids
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();

        let rows: Vec<DocumentId> = sqlx::query_scalar(
            "SELECT origin_document_id FROM file_versions \
             WHERE library_id = ANY($1) AND origin_document_id = ANY($2)",
        )
        .bind(libraries)
        .bind(documents)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find migrated documents", e)
        })?;

        Ok(rows.into_iter().collect())
    }

    async fn insert_all(&self, versions: &[FileVersion]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for version in versions {
            insert_version(&mut *tx, version).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_each(&self, versions: &[FileVersion]) -> AppResult<Vec<AppResult<()>>> {
        let mut outcomes = Vec::with_capacity(versions.len());
        for version in versions {
            outcomes.push(insert_version(&self.pool, version).await);
        }
        Ok(outcomes)
    }

    async fn find_by_library(&self, library_id: LibraryId) -> AppResult<Vec<FileVersion>> {
        sqlx::query_as::<_, FileVersion>(
            "SELECT * FROM file_versions WHERE library_id = $1 ORDER BY created_at ASC",
        )
        .bind(library_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list file versions", e))
    }
}
