//! Conversion request repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use librarian_core::error::{AppError, ErrorKind};
use librarian_core::events::ProvisionCompletion;
use librarian_core::result::AppResult;
use librarian_core::types::id::{ConversionRequestId, FolderId};
use librarian_entity::conversion::{ConversionRequest, NewConversionRequest};

use crate::store::ConversionRequestStore;

/// Repository for conversion request records.
#[derive(Debug, Clone)]
pub struct ConversionRequestRepository {
    pool: PgPool,
}

impl ConversionRequestRepository {
    /// Create a new conversion request repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_one(&self, data: &NewConversionRequest) -> AppResult<ConversionRequest> {
        let request = data.clone().into_request(Utc::now());
        sqlx::query_as::<_, ConversionRequest>(
            "INSERT INTO conversion_requests \
             (id, folder_id, folder_name, folder_developer_name, sharing_principals, \
              permission_tier_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(request.id)
        .bind(&request.folder_id)
        .bind(&request.folder_name)
        .bind(&request.folder_developer_name)
        .bind(&request.sharing_principals)
        .bind(request.permission_tier_id)
        .bind(request.created_at)
        .bind(request.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("conversion_requests_folder_id_key") =>
            {
                AppError::conflict(format!(
                    "A conversion request for folder '{}' already exists",
                    data.folder_id
                ))
            }
            _ => AppError::with_source(
                ErrorKind::Database,
                format!("Failed to create conversion request: {e}"),
                e,
            ),
        })
    }
}

#[async_trait]
impl ConversionRequestStore for ConversionRequestRepository {
    async fn find_by_folder_ids(
        &self,
        folder_ids: &[FolderId],
    ) -> AppResult<Vec<ConversionRequest>> {
        let ids: Vec<String> = folder_ids.iter().map(|id| id.as_str().to_string()).collect();
        sqlx::query_as::<_, ConversionRequest>(
            "SELECT * FROM conversion_requests WHERE folder_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find conversion requests", e)
        })
    }

    async fn find_by_ids(&self, ids: &[ConversionRequestId]) -> AppResult<Vec<ConversionRequest>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        sqlx::query_as::<_, ConversionRequest>(
            "SELECT * FROM conversion_requests WHERE id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find conversion requests", e)
        })
    }

    async fn find_unprovisioned(&self, limit: i64) -> AppResult<Vec<ConversionRequest>> {
        sqlx::query_as::<_, ConversionRequest>(
            "SELECT * FROM conversion_requests WHERE library_id IS NULL \
             ORDER BY created_at ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                "Failed to list unprovisioned requests",
                e,
            )
        })
    }

    async fn list(&self) -> AppResult<Vec<ConversionRequest>> {
        sqlx::query_as::<_, ConversionRequest>(
            "SELECT * FROM conversion_requests ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list conversion requests", e)
        })
    }

    async fn insert_each(
        &self,
        requests: &[NewConversionRequest],
    ) -> AppResult<Vec<AppResult<ConversionRequest>>> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.insert_one(request).await);
        }
        debug!(
            attempted = requests.len(),
            inserted = outcomes.iter().filter(|o| o.is_ok()).count(),
            "Inserted conversion requests"
        );
        Ok(outcomes)
    }

    async fn record_provisioning(&self, completions: &[ProvisionCompletion]) -> AppResult<u64> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let mut updated = 0u64;
        for completion in completions {
            let result = sqlx::query(
                "UPDATE conversion_requests \
                 SET library_id = $2, group_id = $3, updated_at = NOW() WHERE id = $1",
            )
            .bind(completion.request_id)
            .bind(completion.library_id)
            .bind(completion.group_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to record provisioning", e)
            })?;
            updated += result.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit provisioning", e)
        })?;
        Ok(updated)
    }

    async fn delete_by_folder(&self, folder_id: &FolderId) -> AppResult<Option<ConversionRequest>> {
        sqlx::query_as::<_, ConversionRequest>(
            "DELETE FROM conversion_requests WHERE folder_id = $1 RETURNING *",
        )
        .bind(folder_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to delete conversion request", e)
        })
    }
}
