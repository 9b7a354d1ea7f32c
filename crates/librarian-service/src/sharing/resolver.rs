//! The membership resolver seam and a static implementation of it.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use librarian_core::error::{AppError, ErrorKind};
use librarian_core::result::AppResult;
use librarian_entity::folder::ResolvedFolder;

/// Opaque credential handed through to the resolver.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a credential value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw credential value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the credential is blank.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Outcome of resolving one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderResolution {
    /// Developer name that was asked for.
    pub developer_name: String,
    /// The resolved folder, or the failure text.
    pub outcome: Result<ResolvedFolder, String>,
}

impl FolderResolution {
    /// A successful resolution.
    pub fn resolved(folder: ResolvedFolder) -> Self {
        Self {
            developer_name: folder.developer_name.clone(),
            outcome: Ok(folder),
        }
    }

    /// A failed resolution.
    pub fn failed(developer_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            developer_name: developer_name.into(),
            outcome: Err(reason.into()),
        }
    }
}

/// Resolves how legacy folders are shared.
///
/// Given developer names, returns each folder's access level and the
/// principals it is shared with. Implementations are called once per batch
/// and should return one resolution per requested name. An `Err` means the
/// whole call failed.
#[async_trait]
pub trait MembershipResolver: Send + Sync + fmt::Debug + 'static {
    /// Resolve sharing for the named folders.
    async fn resolve(
        &self,
        developer_names: &[String],
        credential: &Credential,
    ) -> AppResult<Vec<FolderResolution>>;
}

#[derive(Debug, Deserialize)]
struct SharingManifest {
    folders: Vec<ResolvedFolder>,
}

/// Resolver backed by a fixed set of folders, such as an exported sharing
/// manifest.
#[derive(Debug, Clone, Default)]
pub struct StaticMembershipResolver {
    folders: HashMap<String, ResolvedFolder>,
}

impl StaticMembershipResolver {
    /// Create a resolver over the given folders.
    pub fn new(folders: impl IntoIterator<Item = ResolvedFolder>) -> Self {
        Self {
            folders: folders
                .into_iter()
                .map(|f| (f.developer_name.clone(), f))
                .collect(),
        }
    }

    /// Load a manifest of the form `{"folders": [ResolvedFolder, ...]}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Failed to read sharing manifest {}", path.display()),
                e,
            )
        })?;
        let manifest: SharingManifest = serde_json::from_str(&raw)?;
        debug!(
            path = %path.display(),
            folders = manifest.folders.len(),
            "Loaded sharing manifest"
        );
        Ok(Self::new(manifest.folders))
    }

    /// Number of known folders.
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Whether no folders are known.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

#[async_trait]
impl MembershipResolver for StaticMembershipResolver {
    async fn resolve(
        &self,
        developer_names: &[String],
        credential: &Credential,
    ) -> AppResult<Vec<FolderResolution>> {
        if credential.is_empty() {
            return Err(AppError::validation(
                "A credential is required to resolve folder sharing",
            ));
        }

        Ok(developer_names
            .iter()
            .map(|name| match self.folders.get(name) {
                Some(folder) => FolderResolution::resolved(folder.clone()),
                None => FolderResolution::failed(
                    name.clone(),
                    format!("No sharing information found for folder '{name}'"),
                ),
            })
            .collect())
    }
}
