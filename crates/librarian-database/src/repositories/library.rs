//! Library and permission group repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use librarian_core::error::{AppError, ErrorKind};
use librarian_core::result::AppResult;
use librarian_core::types::id::{LibraryId, PermissionGroupId};
use librarian_entity::library::{GroupMember, Library, LibraryMember, PermissionGroup};

use crate::store::{LibraryStore, MembershipSync};

/// Repository for libraries, groups, and memberships.
#[derive(Debug, Clone)]
pub struct LibraryRepository {
    pool: PgPool,
}

impl LibraryRepository {
    /// Create a new library repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(e: sqlx::Error, constraint: &str, what: &str) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some(constraint) => {
            AppError::conflict(format!("{what} with this developer name already exists"))
        }
        _ => AppError::with_source(ErrorKind::Database, format!("Failed to insert {what}"), e),
    }
}

#[async_trait]
impl LibraryStore for LibraryRepository {
    async fn find_libraries_by_names(&self, names: &[String]) -> AppResult<Vec<Library>> {
        sqlx::query_as::<_, Library>("SELECT * FROM libraries WHERE developer_name = ANY($1)")
            .bind(names)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find libraries", e))
    }

    async fn find_groups_by_names(&self, names: &[String]) -> AppResult<Vec<PermissionGroup>> {
        sqlx::query_as::<_, PermissionGroup>(
            "SELECT * FROM permission_groups WHERE developer_name = ANY($1)",
        )
        .bind(names)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find groups", e))
    }

    async fn insert_groups(&self, groups: &[PermissionGroup]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for group in groups {
            sqlx::query(
                "INSERT INTO permission_groups (id, developer_name, name, created_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(group.id)
            .bind(&group.developer_name)
            .bind(&group.name)
            .bind(group.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, "permission_groups_developer_name_key", "group"))?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_libraries(&self, libraries: &[Library]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for library in libraries {
            sqlx::query(
                "INSERT INTO libraries (id, developer_name, name, created_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(library.id)
            .bind(&library.developer_name)
            .bind(&library.name)
            .bind(library.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, "libraries_developer_name_key", "library"))?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn sync_group_members(
        &self,
        group_ids: &[PermissionGroupId],
        members: &[GroupMember],
    ) -> AppResult<MembershipSync> {
        let mut tx = self.pool.begin().await?;
        let mut sync = MembershipSync::default();

        for group_id in group_ids {
            let keep: Vec<String> = members
                .iter()
                .filter(|m| m.group_id == *group_id)
                .map(|m| m.principal_id.as_str().to_string())
                .collect();
            let result = sqlx::query(
                "DELETE FROM group_members \
                 WHERE group_id = $1 AND NOT (principal_id = ANY($2))",
            )
            .bind(group_id)
            .bind(keep)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to remove group members", e)
            })?;
            sync.removed += result.rows_affected();
        }

        for member in members {
            let result = sqlx::query(
                "INSERT INTO group_members (id, group_id, principal_id) VALUES ($1, $2, $3) \
                 ON CONFLICT (group_id, principal_id) DO NOTHING",
            )
            .bind(member.id)
            .bind(member.group_id)
            .bind(&member.principal_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert group member", e)
            })?;
            sync.added += result.rows_affected();
        }

        tx.commit().await?;
        Ok(sync)
    }

    async fn upsert_library_members(&self, members: &[LibraryMember]) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;
        for member in members {
            let result = sqlx::query(
                "INSERT INTO library_members (id, library_id, group_id, permission_tier_id) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (library_id, group_id) DO UPDATE \
                 SET permission_tier_id = EXCLUDED.permission_tier_id \
                 WHERE library_members.permission_tier_id IS DISTINCT FROM EXCLUDED.permission_tier_id",
            )
            .bind(member.id)
            .bind(member.library_id)
            .bind(member.group_id)
            .bind(member.permission_tier_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to write library member", e)
            })?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    async fn find_group_members(&self, group_id: PermissionGroupId) -> AppResult<Vec<GroupMember>> {
        sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM group_members WHERE group_id = $1 ORDER BY principal_id ASC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list group members", e))
    }

    async fn find_library_members(&self, library_id: LibraryId) -> AppResult<Vec<LibraryMember>> {
        sqlx::query_as::<_, LibraryMember>("SELECT * FROM library_members WHERE library_id = $1")
            .bind(library_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list library members", e)
            })
    }
}
