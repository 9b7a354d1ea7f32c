//! Conversion behaviour configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::id::PermissionTierId;

/// How a batch of migrated file versions is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentBatchMode {
    /// One all-or-nothing insert; any failure aborts the whole batch.
    #[default]
    Atomic,
    /// Each version is inserted on its own; failures are reported per document.
    Partial,
}

impl DocumentBatchMode {
    /// Return the mode as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::Partial => "partial",
        }
    }
}

impl fmt::Display for DocumentBatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DocumentBatchMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "atomic" => Ok(Self::Atomic),
            "partial" => Ok(Self::Partial),
            _ => Err(AppError::validation(format!(
                "Invalid document batch mode: '{s}'"
            ))),
        }
    }
}

/// Conversion settings shared by the CLI and the worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Persistence discipline for migrated documents.
    #[serde(default)]
    pub document_batch_mode: DocumentBatchMode,
    /// Permission tier granted to groups of read-only folders.
    #[serde(default)]
    pub read_only_tier: Option<PermissionTierId>,
    /// Permission tier granted to groups of read-write folders.
    #[serde(default)]
    pub read_write_tier: Option<PermissionTierId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_mode_parse() {
        assert_eq!("Partial".parse::<DocumentBatchMode>().unwrap(), DocumentBatchMode::Partial);
        assert_eq!("atomic".parse::<DocumentBatchMode>().unwrap(), DocumentBatchMode::Atomic);
        assert!("sometimes".parse::<DocumentBatchMode>().is_err());
    }

    #[test]
    fn test_batch_mode_serde_lowercase() {
        let json = serde_json::to_string(&DocumentBatchMode::Partial).unwrap();
        assert_eq!(json, "\"partial\"");
    }
}
