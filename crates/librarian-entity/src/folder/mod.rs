//! Legacy folder entities.

pub mod model;

pub use model::{Folder, FolderAccess, ResolvedFolder};
