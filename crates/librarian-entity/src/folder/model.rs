//! Folder models as seen by the converter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use librarian_core::AppError;
use librarian_core::types::id::{FolderId, PrincipalId};

/// A folder in the legacy store, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Legacy folder identifier.
    pub id: FolderId,
    /// Stable API name; the join key for derived library names.
    pub developer_name: String,
    /// Display name.
    pub name: String,
}

impl Folder {
    /// Create a folder value.
    pub fn new(
        id: impl Into<FolderId>,
        developer_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            developer_name: developer_name.into(),
            name: name.into(),
        }
    }
}

/// Public access level of a legacy folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FolderAccess {
    /// Members may read documents.
    ReadOnly,
    /// Members may read and modify documents.
    ReadWrite,
}

impl FolderAccess {
    /// Return the access level as its legacy string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "ReadOnly",
            Self::ReadWrite => "ReadWrite",
        }
    }
}

impl fmt::Display for FolderAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FolderAccess {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "readonly" | "read_only" => Ok(Self::ReadOnly),
            "readwrite" | "read_write" => Ok(Self::ReadWrite),
            _ => Err(AppError::validation(format!("Invalid folder access: '{s}'"))),
        }
    }
}

/// A folder together with the sharing resolved for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFolder {
    /// Legacy folder identifier.
    pub id: FolderId,
    /// Display name.
    pub name: String,
    /// Stable API name.
    pub developer_name: String,
    /// Public access level.
    pub access: FolderAccess,
    /// Every principal that should be able to see the folder's documents.
    pub principals: Vec<PrincipalId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_parse() {
        assert_eq!("ReadWrite".parse::<FolderAccess>().unwrap(), FolderAccess::ReadWrite);
        assert_eq!("read_only".parse::<FolderAccess>().unwrap(), FolderAccess::ReadOnly);
        assert!("hidden".parse::<FolderAccess>().is_err());
    }
}
