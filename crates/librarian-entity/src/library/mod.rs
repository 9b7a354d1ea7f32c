//! Target-side library and permission group entities.

pub mod model;
pub mod naming;

pub use model::{GroupMember, Library, LibraryMember, PermissionGroup};
pub use naming::{DERIVED_NAME_PREFIX, derived_developer_name};
