//! # librarian-database
//!
//! Persistence for Librarian. [`store`] defines the traits the conversion
//! services depend on; [`repositories`] implements them on PostgreSQL and
//! the `memory` feature provides in-process implementations used by tests
//! and dry runs.

pub mod connection;
#[cfg(feature = "memory")]
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{
    ConversionRequestStore, FileVersionStore, JobStore, LibraryStore, MembershipSync, Stores,
};
