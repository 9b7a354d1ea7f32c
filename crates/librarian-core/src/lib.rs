//! # librarian-core
//!
//! Core crate for Librarian, the folder-to-library conversion service.
//! Contains configuration schemas, typed identifiers, domain events,
//! the event publishing seam, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Librarian crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
