//! CLI command definitions and dispatch.

pub mod convert;
pub mod db;
pub mod requests;

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use crate::output::OutputFormat;
use librarian_core::config::AppConfig;
use librarian_core::error::{AppError, ErrorKind};
use librarian_database::{DatabasePool, Stores};
use librarian_worker::JobQueue;

/// Librarian: legacy folder to library conversion
#[derive(Debug, Parser)]
#[command(name = "librarian", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database management
    Db(db::DbArgs),
    /// Folder and document conversion
    Convert(convert::ConvertArgs),
    /// Conversion request management
    Requests(requests::RequestsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Db(args) => db::execute(args, &self.config).await,
            Commands::Convert(args) => convert::execute(args, &self.config, self.format).await,
            Commands::Requests(args) => requests::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: connect to the database and build the store set
pub async fn connect_stores(config: &AppConfig) -> Result<Stores, AppError> {
    tracing::debug!("Connecting to database");
    let pool = DatabasePool::connect(&config.database).await?;
    Ok(pool.stores())
}

/// Helper: job queue used for enqueuing work from the CLI
pub fn cli_queue(stores: &Stores, config: &AppConfig) -> Arc<JobQueue> {
    let worker_id = format!("librarian-cli-{}", std::process::id());
    Arc::new(JobQueue::new(
        stores.jobs.clone(),
        worker_id,
        config.worker.max_attempts,
    ))
}

/// Helper: read a JSON input file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    tracing::debug!("Reading {}", path.display());
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::with_source(
            ErrorKind::Validation,
            format!("Failed to read {}", path.display()),
            e,
        )
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| AppError::validation(format!("Invalid JSON in {}: {}", path.display(), e)))
}
