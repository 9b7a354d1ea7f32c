//! Job handler implementations.

pub mod completion;
pub mod migration;
pub mod provision;

use std::sync::Arc;

use librarian_core::config::DocumentBatchMode;
use librarian_core::traits::EventPublisher;
use librarian_database::Stores;
use librarian_service::conversion::{CompletionConsumer, DocumentMigrator, LibraryProvisioner};

use crate::executor::JobExecutor;

pub use completion::ApplyCompletionJobHandler;
pub use migration::MigrateDocumentsJobHandler;
pub use provision::ProvisionLibrariesJobHandler;

/// Build an executor with every conversion handler registered.
pub fn conversion_executor(
    stores: &Stores,
    publisher: Arc<dyn EventPublisher>,
    batch_mode: DocumentBatchMode,
) -> JobExecutor {
    let provisioner = LibraryProvisioner::new(stores.libraries.clone(), publisher);
    let migrator = DocumentMigrator::new(
        stores.requests.clone(),
        stores.libraries.clone(),
        stores.file_versions.clone(),
        batch_mode,
    );
    let consumer = CompletionConsumer::new(stores.requests.clone());

    let mut executor = JobExecutor::new();
    executor.register(Arc::new(ProvisionLibrariesJobHandler::new(
        stores.requests.clone(),
        provisioner,
    )));
    executor.register(Arc::new(MigrateDocumentsJobHandler::new(migrator)));
    executor.register(Arc::new(ApplyCompletionJobHandler::new(consumer)));
    executor
}
