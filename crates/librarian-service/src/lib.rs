//! # librarian-service
//!
//! Business logic for converting legacy folders into libraries.
//!
//! - [`conversion::ConversionRequestRegistry`] records which folders are
//!   queued for conversion.
//! - [`conversion::LibraryProvisioner`] creates the library and permission
//!   group for each queued folder and announces the result.
//! - [`conversion::CompletionConsumer`] records announced results on the
//!   request records.
//! - [`conversion::DocumentMigrator`] turns documents into file versions.
//! - [`sharing::MembershipResolver`] is the seam to whatever knows how a
//!   legacy folder is shared.

pub mod conversion;
pub mod sharing;
