//! Database management commands.

use clap::{Args, Subcommand};

use crate::output;
use librarian_core::error::AppError;
use librarian_database::DatabasePool;

/// Arguments for the db command
#[derive(Debug, Args)]
pub struct DbArgs {
    /// Database subcommand
    #[command(subcommand)]
    pub command: DbCommand,
}

/// Database subcommands
#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Run all pending migrations
    Migrate,
}

/// Execute database commands
pub async fn execute(args: &DbArgs, config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = DatabasePool::connect(&config.database).await?;

    match &args.command {
        DbCommand::Migrate => {
            println!("Running database migrations...");
            pool.migrate().await?;
            output::print_success("All migrations applied successfully.");
        }
    }

    pool.close().await;
    Ok(())
}
