//! Conversion request management commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat, RequestRow};
use librarian_core::error::AppError;
use librarian_core::types::id::FolderId;
use librarian_database::ConversionRequestStore;

/// Arguments for request commands
#[derive(Debug, Args)]
pub struct RequestsArgs {
    /// Request subcommand
    #[command(subcommand)]
    pub command: RequestsCommand,
}

/// Request subcommands
#[derive(Debug, Subcommand)]
pub enum RequestsCommand {
    /// List conversion requests
    List {
        /// Only show requests without a library yet
        #[arg(long)]
        pending: bool,
    },
    /// Delete a folder's conversion request so it can be converted again
    Reset {
        /// Legacy folder id
        folder_id: String,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

/// Execute request commands
pub async fn execute(
    args: &RequestsArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let stores = super::connect_stores(&config).await?;

    match &args.command {
        RequestsCommand::List { pending } => {
            let requests = if *pending {
                stores.requests.find_unprovisioned(i64::MAX).await?
            } else {
                stores.requests.list().await?
            };
            output::print_list(&output::rows::<_, RequestRow>(&requests), format);
        }
        RequestsCommand::Reset { folder_id, force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Delete the conversion request for folder '{}'? \
                         Its library and migrated files are kept.",
                        folder_id
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            match stores.requests.delete_by_folder(&FolderId::new(folder_id.as_str())).await? {
                Some(request) => output::print_success(&format!(
                    "Deleted conversion request {} for folder {}.",
                    request.id, request.folder_id
                )),
                None => output::print_warning(&format!(
                    "Folder '{}' has no conversion request.",
                    folder_id
                )),
            }
        }
    }

    Ok(())
}
