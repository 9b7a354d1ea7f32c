//! The PostgreSQL pool behind the repository store set.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use librarian_core::config::DatabaseConfig;
use librarian_core::error::{AppError, ErrorKind};

use crate::store::Stores;

/// Connection pool shared by every PostgreSQL repository.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Open the pool described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = pool_options(config)
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Conversion database is unreachable: {e}"),
                    e,
                )
            })?;

        tracing::info!(
            max_connections = pool.options().get_max_connections(),
            "Conversion database connected"
        );
        Ok(Self { pool })
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        crate::migration::run_migrations(&self.pool).await
    }

    /// Repository-backed stores sharing this pool.
    pub fn stores(&self) -> Stores {
        Stores::postgres(&self.pool)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Conversion database pool closed");
    }
}

/// A pool always keeps at least one connection slot, and never more idle
/// connections than it may open.
fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    let max = config.max_connections.max(1);
    PgPoolOptions::new()
        .max_connections(max)
        .min_connections(config.min_connections.min(max))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
}
