//! Deterministic naming of libraries and groups derived from folders.

/// Prefix shared by every derived library and group developer name.
pub const DERIVED_NAME_PREFIX: &str = "doclib";

/// Developer name of the library and group created for a folder.
///
/// Folder developer names are unique in the legacy store, so the derived
/// name is unique too.
pub fn derived_developer_name(folder_developer_name: &str) -> String {
    format!("{DERIVED_NAME_PREFIX}_{folder_developer_name}")
}
