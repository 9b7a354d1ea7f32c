//! Document model as exported from the legacy store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use librarian_core::types::id::{DocumentId, FolderId, PrincipalId};

/// Content of a legacy document: either an external link or an inline payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DocumentBody {
    /// The document points at an external URL.
    Url {
        /// Target URL.
        url: String,
    },
    /// The document carries its bytes. Encoded as base64 in JSON.
    Binary {
        /// Raw content.
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
}

impl DocumentBody {
    /// Whether the body is a URL reference.
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url { .. })
    }
}

/// A content item inside a legacy folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Legacy document identifier.
    pub id: DocumentId,
    /// Folder the document lives in.
    pub folder_id: FolderId,
    /// Link or payload.
    pub body: DocumentBody,
    /// Document title.
    pub title: String,
    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional keywords, carried over as tags.
    #[serde(default)]
    pub keywords: Option<String>,
    /// File extension of a binary payload (without the dot).
    #[serde(default)]
    pub extension: Option<String>,
    /// The original author.
    pub author_id: PrincipalId,
    /// Principal that created the record.
    pub created_by: PrincipalId,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Principal that last modified the record.
    pub last_modified_by: PrincipalId,
    /// When the record was last modified.
    pub last_modified_at: DateTime<Utc>,
}

impl Document {
    /// Client path of the migrated file: the URL for links, otherwise the
    /// title with the extension appended when one is known.
    pub fn path_on_client(&self) -> String {
        match &self.body {
            DocumentBody::Url { url } => url.clone(),
            DocumentBody::Binary { .. } => match self.extension.as_deref() {
                Some(ext) if !ext.is_empty() => format!("{}.{}", self.title, ext),
                _ => self.title.clone(),
            },
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
