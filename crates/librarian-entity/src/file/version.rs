//! File version entity: the migrated form of a legacy document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use librarian_core::types::id::{DocumentId, FileVersionId, FolderId, LibraryId, PrincipalId};

use crate::document::{Document, DocumentBody};

/// Content carried by a file version, borrowed from the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionContent<'a> {
    /// A link to external content.
    Url(&'a str),
    /// Inline bytes.
    Data(&'a [u8]),
}

/// A file version created from a legacy document.
///
/// Exactly one of `content_url` and `version_data` is set. The origin
/// fields point back at the source document and folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileVersion {
    /// Unique version identifier.
    pub id: FileVersionId,
    /// Library the version was published into.
    pub library_id: LibraryId,
    /// External content URL, for link documents.
    pub content_url: Option<String>,
    /// Inline content, for binary documents.
    pub version_data: Option<Vec<u8>>,
    /// Client path (file name or URL).
    pub path_on_client: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Tags taken from the document keywords.
    pub tags: Option<String>,
    /// Owner; always the original author.
    pub owner_id: PrincipalId,
    /// Creator; always the original author.
    pub created_by: PrincipalId,
    /// Creation timestamp copied from the document.
    pub created_at: DateTime<Utc>,
    /// Last modifier copied from the document.
    pub last_modified_by: PrincipalId,
    /// Last modification timestamp copied from the document.
    pub last_modified_at: DateTime<Utc>,
    /// Document this version was migrated from.
    pub origin_document_id: DocumentId,
    /// Folder the document was migrated from.
    pub origin_folder_id: FolderId,
}

impl FileVersion {
    /// Build the version that migrates `document` into `library_id`.
    ///
    /// Audit fields are copied from the document; owner and creator are
    /// both the original author.
    pub fn from_document(document: &Document, library_id: LibraryId) -> Self {
        let (content_url, version_data) = match &document.body {
            DocumentBody::Url { url } => (Some(url.clone()), None),
            DocumentBody::Binary { data } => (None, Some(data.clone())),
        };

        Self {
            id: FileVersionId::new(),
            library_id,
            content_url,
            version_data,
            path_on_client: document.path_on_client(),
            title: document.title.clone(),
            description: document.description.clone(),
            tags: document.keywords.clone(),
            owner_id: document.author_id.clone(),
            created_by: document.author_id.clone(),
            created_at: document.created_at,
            last_modified_by: document.last_modified_by.clone(),
            last_modified_at: document.last_modified_at,
            origin_document_id: document.id.clone(),
            origin_folder_id: document.folder_id.clone(),
        }
    }

    /// The version's content.
    pub fn content(&self) -> VersionContent<'_> {
        match (&self.content_url, &self.version_data) {
            (Some(url), _) => VersionContent::Url(url),
            (None, Some(data)) => VersionContent::Data(data),
            (None, None) => VersionContent::Data(&[]),
        }
    }
}
