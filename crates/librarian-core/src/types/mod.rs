//! Shared value types used across Librarian crates.

pub mod id;

pub use id::{
    ConversionRequestId, DocumentId, FileVersionId, FolderId, GroupMemberId, JobId, LibraryId,
    LibraryMemberId, PermissionGroupId, PermissionTierId, PrincipalId,
};
