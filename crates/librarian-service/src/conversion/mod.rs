//! Folder conversion orchestration.

pub mod completion;
pub mod migrator;
pub mod provisioner;
pub mod registry;

pub use completion::CompletionConsumer;
pub use migrator::DocumentMigrator;
pub use provisioner::LibraryProvisioner;
pub use registry::ConversionRequestRegistry;
