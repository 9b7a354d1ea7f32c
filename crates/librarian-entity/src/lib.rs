//! # librarian-entity
//!
//! Domain entity models for Librarian. Structs in this crate represent
//! either a row of a Librarian table (and derive `sqlx::FromRow`) or a
//! value object exchanged with the legacy store and with callers.

pub mod conversion;
pub mod document;
pub mod file;
pub mod folder;
pub mod job;
pub mod library;
