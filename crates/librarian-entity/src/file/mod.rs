//! Migrated file entities.

pub mod version;

pub use version::{FileVersion, VersionContent};
