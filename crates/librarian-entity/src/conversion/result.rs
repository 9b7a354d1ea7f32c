//! Conversion result model reported back to callers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use librarian_core::types::id::{DocumentId, FolderId};

/// Outcome of converting a single folder or document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConversionStatus {
    /// Not yet decided. Never returned to callers.
    Pending,
    /// A conversion request was persisted.
    Queued,
    /// The item was migrated.
    Converted,
    /// Nothing to do: already converted or queued.
    Skipped,
    /// The item could not be converted.
    Error,
}

impl ConversionStatus {
    /// Check if the status is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Return the status as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Queued => "QUEUED",
            Self::Converted => "CONVERTED",
            Self::Skipped => "SKIPPED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a result is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ConversionSubject {
    /// A legacy folder.
    Folder(FolderId),
    /// A legacy document.
    Document(DocumentId),
}

impl ConversionSubject {
    /// The subject's identifier.
    pub fn id(&self) -> &str {
        match self {
            Self::Folder(id) => id.as_str(),
            Self::Document(id) => id.as_str(),
        }
    }
}

/// Status and messages for one folder or document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// The folder or document this result describes.
    pub subject: ConversionSubject,
    /// Current status.
    pub status: ConversionStatus,
    /// Human-readable details. Identical messages collapse.
    pub messages: BTreeSet<String>,
}

impl ConversionResult {
    /// A pending result for a folder.
    pub fn folder(id: FolderId) -> Self {
        Self::pending(ConversionSubject::Folder(id))
    }

    /// A pending result for a document.
    pub fn document(id: DocumentId) -> Self {
        Self::pending(ConversionSubject::Document(id))
    }

    fn pending(subject: ConversionSubject) -> Self {
        Self {
            subject,
            status: ConversionStatus::Pending,
            messages: BTreeSet::new(),
        }
    }

    /// Set the status.
    pub fn mark(&mut self, status: ConversionStatus) -> &mut Self {
        self.status = status;
        self
    }

    /// Set the status and record a message.
    pub fn mark_with(&mut self, status: ConversionStatus, message: impl Into<String>) -> &mut Self {
        self.status = status;
        self.messages.insert(message.into());
        self
    }

    /// Record a message without changing the status.
    pub fn add_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.messages.insert(message.into());
        self
    }

    /// Whether the result has reached a final status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_collapse() {
        let mut result = ConversionResult::folder(FolderId::new("00lA"));
        result
            .mark_with(ConversionStatus::Error, "resolver timed out")
            .add_message("resolver timed out");
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.status, ConversionStatus::Error);
    }

    #[test]
    fn test_pending_is_not_terminal() {
        let mut result = ConversionResult::document(DocumentId::new("015A"));
        assert!(!result.is_terminal());
        result.mark(ConversionStatus::Skipped);
        assert!(result.is_terminal());
    }

    #[test]
    fn test_subject_wire_format() {
        let result = ConversionResult::folder(FolderId::new("00lA"));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["subject"], serde_json::json!({ "kind": "folder", "id": "00lA" }));
        assert_eq!(value["status"], "PENDING");
        assert_eq!(result.subject.id(), "00lA");
    }
}
