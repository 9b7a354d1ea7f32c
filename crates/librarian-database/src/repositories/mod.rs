//! PostgreSQL implementations of the store traits.

pub mod conversion_request;
pub mod file_version;
pub mod job;
pub mod library;

pub use conversion_request::ConversionRequestRepository;
pub use file_version::FileVersionRepository;
pub use job::JobRepository;
pub use library::LibraryRepository;
