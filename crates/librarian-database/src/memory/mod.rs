//! In-process store implementations.
//!
//! These hold the same invariants as the PostgreSQL repositories (unique
//! folder ids, unique developer names, unique origin documents, idempotent
//! membership inserts) and are used by tests and dry runs.

pub mod events;
pub mod file_versions;
pub mod jobs;
pub mod libraries;
pub mod requests;

pub use events::MemoryEventLog;
pub use file_versions::MemoryFileVersionStore;
pub use jobs::MemoryJobStore;
pub use libraries::MemoryLibraryStore;
pub use requests::MemoryConversionRequestStore;
