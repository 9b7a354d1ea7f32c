//! Librarian worker daemon.
//!
//! Connects to the database, applies migrations, and processes conversion
//! jobs until a shutdown signal arrives.

use std::sync::Arc;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use librarian_core::config::AppConfig;
use librarian_core::error::AppError;
use librarian_database::DatabasePool;
use librarian_worker::jobs::conversion_executor;
use librarian_worker::{JobQueue, JobQueuePublisher, WorkerRunner};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Worker error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("LIBRARIAN_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    AppConfig::load(&config_path)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main worker run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Librarian worker v{}", env!("CARGO_PKG_VERSION"));

    if !config.worker.enabled {
        tracing::info!("Background worker disabled, nothing to do");
        return Ok(());
    }

    // ── Step 1: Database connection + migrations ─────────────────
    let pool = DatabasePool::connect(&config.database).await?;
    pool.migrate().await?;
    tracing::info!("Database migrations complete");

    // ── Step 2: Queue, publisher, handlers ───────────────────────
    let stores = pool.stores();
    let worker_id = format!("worker-{}", std::process::id());
    let queue = Arc::new(JobQueue::new(
        stores.jobs.clone(),
        worker_id,
        config.worker.max_attempts,
    ));
    let publisher = Arc::new(JobQueuePublisher::new(Arc::clone(&queue)));
    let executor = conversion_executor(&stores, publisher, config.conversion.document_batch_mode);
    tracing::info!("Registered job types: {:?}", executor.registered_types());

    let runner = WorkerRunner::new(Arc::clone(&queue), Arc::new(executor), config.worker.clone());

    // ── Step 3: Run until shutdown ───────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = tokio::spawn(async move {
        runner.run(shutdown_rx).await;
    });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping worker...");
    let _ = shutdown_tx.send(true);

    if let Err(e) = worker_handle.await {
        tracing::error!("Worker task ended abnormally: {}", e);
    }

    if let Ok(stats) = queue.stats().await {
        tracing::info!(
            "Queue at shutdown: pending={}, running={}, failed={}",
            stats.pending,
            stats.running,
            stats.failed
        );
    }

    pool.close().await;
    tracing::info!("Librarian worker shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
