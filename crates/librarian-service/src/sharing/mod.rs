//! Folder sharing resolution.

pub mod resolver;

pub use resolver::{Credential, FolderResolution, MembershipResolver, StaticMembershipResolver};
