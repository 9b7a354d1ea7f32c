//! Conversion commands: prepare folders, provision libraries, migrate documents.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};

use crate::output::{self, CompletionRow, OutputFormat, ResultRow};
use librarian_core::error::AppError;
use librarian_database::ConversionRequestStore;
use librarian_entity::conversion::{ConversionStatus, TierMapping};
use librarian_entity::document::Document;
use librarian_entity::folder::Folder;
use librarian_entity::job::{JobPayload, JobPriority};
use librarian_service::conversion::{
    ConversionRequestRegistry, DocumentMigrator, LibraryProvisioner,
};
use librarian_service::sharing::{Credential, StaticMembershipResolver};
use librarian_worker::JobQueuePublisher;

/// Arguments for conversion commands
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Conversion subcommand
    #[command(subcommand)]
    pub command: ConvertCommand,
}

/// Conversion subcommands
#[derive(Debug, Subcommand)]
pub enum ConvertCommand {
    /// Register folders for conversion
    Prepare {
        /// JSON file with an array of folders
        #[arg(long)]
        folders: PathBuf,
        /// JSON sharing manifest describing each folder's access and principals
        #[arg(long)]
        manifest: PathBuf,
        /// Credential passed to the sharing resolver
        #[arg(long)]
        credential: String,
    },
    /// Create libraries and groups for queued folders
    Provision {
        /// Maximum number of requests to provision
        #[arg(short, long, default_value = "500")]
        limit: i64,
        /// Enqueue a worker job instead of provisioning now
        #[arg(long)]
        enqueue: bool,
    },
    /// Migrate documents into their folders' libraries
    Documents {
        /// JSON file with an array of documents
        #[arg(long)]
        documents: PathBuf,
        /// Enqueue a worker job instead of migrating now
        #[arg(long)]
        enqueue: bool,
    },
}

/// Execute conversion commands
pub async fn execute(
    args: &ConvertArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let stores = super::connect_stores(&config).await?;
    let queue = super::cli_queue(&stores, &config);

    match &args.command {
        ConvertCommand::Prepare {
            folders,
            manifest,
            credential,
        } => {
            let tiers = TierMapping::from_config(&config.conversion)?;
            let folders: Vec<Folder> = super::read_json(folders)?;
            let resolver = StaticMembershipResolver::from_json_file(manifest)?;
            let registry = ConversionRequestRegistry::new(stores.requests.clone(), Arc::new(resolver));

            let results = registry
                .prepare_for_conversion(&folders, &Credential::new(credential.as_str()), &tiers)
                .await;
            output::print_list(&output::rows::<_, ResultRow>(&results), format);

            let queued = results
                .iter()
                .filter(|r| r.status == ConversionStatus::Queued)
                .count();
            output::print_success(&format!("{} of {} folders queued.", queued, results.len()));
        }
        ConvertCommand::Provision { limit, enqueue } => {
            let requests = stores.requests.find_unprovisioned(*limit).await?;
            if requests.is_empty() {
                output::print_warning("No unprovisioned conversion requests.");
                return Ok(());
            }

            if *enqueue {
                let payload = JobPayload::ProvisionLibraries {
                    request_ids: requests.iter().map(|r| r.id).collect(),
                };
                let job = queue.enqueue(&payload, JobPriority::Normal).await?;
                output::print_success(&format!(
                    "Enqueued job {} to provision {} requests.",
                    job.id,
                    requests.len()
                ));
                return Ok(());
            }

            let publisher = Arc::new(JobQueuePublisher::new(queue));
            let provisioner = LibraryProvisioner::new(stores.libraries.clone(), publisher);
            let completions = provisioner.provision_libraries(&requests).await?;
            output::print_list(&output::rows::<_, CompletionRow>(&completions), format);
            output::print_success(&format!(
                "Provisioned {} requests. The worker records the ids on each request.",
                completions.len()
            ));
        }
        ConvertCommand::Documents { documents, enqueue } => {
            let documents: Vec<Document> = super::read_json(documents)?;

            if *enqueue {
                let count = documents.len();
                let job = queue
                    .enqueue(&JobPayload::MigrateDocuments { documents }, JobPriority::Normal)
                    .await?;
                output::print_success(&format!(
                    "Enqueued job {} to migrate {} documents.",
                    job.id, count
                ));
                return Ok(());
            }

            let migrator = DocumentMigrator::new(
                stores.requests.clone(),
                stores.libraries.clone(),
                stores.file_versions.clone(),
                config.conversion.document_batch_mode,
            );
            let results = migrator.migrate_documents(&documents).await?;
            output::print_list(&output::rows::<_, ResultRow>(&results), format);
        }
    }

    Ok(())
}
