//! Conversion request entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use librarian_core::config::ConversionConfig;
use librarian_core::error::AppError;
use librarian_core::result::AppResult;
use librarian_core::types::id::{
    ConversionRequestId, FolderId, LibraryId, PermissionGroupId, PermissionTierId, PrincipalId,
};

use crate::folder::{FolderAccess, ResolvedFolder};
use crate::library::naming::derived_developer_name;

/// Separator used to store sharing principals in a single column.
pub const PRINCIPAL_DELIMITER: char = ',';

/// Join principal ids into the stored column value.
pub fn join_principals(principals: &[PrincipalId]) -> String {
    principals
        .iter()
        .map(PrincipalId::as_str)
        .collect::<Vec<_>>()
        .join(&PRINCIPAL_DELIMITER.to_string())
}

/// Split a stored column value back into principal ids. Empty segments are dropped.
pub fn split_principals(value: &str) -> Vec<PrincipalId> {
    value
        .split(PRINCIPAL_DELIMITER)
        .filter(|segment| !segment.is_empty())
        .map(PrincipalId::from)
        .collect()
}

/// Maps a folder's access level to the library permission tier its group receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMapping {
    /// Tier for read-only folders.
    pub read_only: PermissionTierId,
    /// Tier for read-write folders.
    pub read_write: PermissionTierId,
}

impl TierMapping {
    /// Create a mapping from the two tier ids.
    pub fn new(read_only: PermissionTierId, read_write: PermissionTierId) -> Self {
        Self {
            read_only,
            read_write,
        }
    }

    /// Build the mapping from configuration. Both tiers must be set.
    pub fn from_config(config: &ConversionConfig) -> AppResult<Self> {
        match (config.read_only_tier, config.read_write_tier) {
            (Some(read_only), Some(read_write)) => Ok(Self::new(read_only, read_write)),
            _ => Err(AppError::configuration(
                "conversion.read_only_tier and conversion.read_write_tier must both be set",
            )),
        }
    }

    /// Return the tier for an access level.
    pub fn tier_for(&self, access: FolderAccess) -> PermissionTierId {
        match access {
            FolderAccess::ReadOnly => self.read_only,
            FolderAccess::ReadWrite => self.read_write,
        }
    }
}

/// Durable per-folder record tracking conversion progress.
///
/// Its existence means the folder is queued or further along.
/// `library_id` and `group_id` are filled in once provisioning completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConversionRequest {
    /// Unique request identifier.
    pub id: ConversionRequestId,
    /// The legacy folder.
    pub folder_id: FolderId,
    /// Folder display name.
    pub folder_name: String,
    /// Folder developer name.
    pub folder_developer_name: String,
    /// Sharing principals, joined with [`PRINCIPAL_DELIMITER`].
    pub sharing_principals: String,
    /// Tier granted to the group on the library.
    pub permission_tier_id: PermissionTierId,
    /// Library created for the folder.
    pub library_id: Option<LibraryId>,
    /// Group created for the folder.
    pub group_id: Option<PermissionGroupId>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ConversionRequest {
    /// Sharing principals as a list.
    pub fn principals(&self) -> Vec<PrincipalId> {
        split_principals(&self.sharing_principals)
    }

    /// Developer name of the library and group derived from this folder.
    pub fn derived_name(&self) -> String {
        derived_developer_name(&self.folder_developer_name)
    }

    /// Whether the provisioning ids have been recorded.
    pub fn is_provisioned(&self) -> bool {
        self.library_id.is_some() && self.group_id.is_some()
    }
}

/// Data required to create a new conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConversionRequest {
    /// The legacy folder.
    pub folder_id: FolderId,
    /// Folder display name.
    pub folder_name: String,
    /// Folder developer name.
    pub folder_developer_name: String,
    /// Joined sharing principals.
    pub sharing_principals: String,
    /// Tier granted to the group on the library.
    pub permission_tier_id: PermissionTierId,
}

impl NewConversionRequest {
    /// Build a request from a resolved folder.
    pub fn from_resolved(folder: &ResolvedFolder, tiers: &TierMapping) -> Self {
        Self {
            folder_id: folder.id.clone(),
            folder_name: folder.name.clone(),
            folder_developer_name: folder.developer_name.clone(),
            sharing_principals: join_principals(&folder.principals),
            permission_tier_id: tiers.tier_for(folder.access),
        }
    }

    /// Turn into a stored record with a fresh id.
    pub fn into_request(self, now: DateTime<Utc>) -> ConversionRequest {
        ConversionRequest {
            id: ConversionRequestId::new(),
            folder_id: self.folder_id,
            folder_name: self.folder_name,
            folder_developer_name: self.folder_developer_name,
            sharing_principals: self.sharing_principals,
            permission_tier_id: self.permission_tier_id,
            library_id: None,
            group_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<PrincipalId> {
        values.iter().map(|v| PrincipalId::from(*v)).collect()
    }

    #[test]
    fn test_join_split_is_lossless() {
        let principals = ids(&["005A", "00GB", "00E_role"]);
        let joined = join_principals(&principals);
        assert_eq!(joined, "005A,00GB,00E_role");
        assert_eq!(split_principals(&joined), principals);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_principals("").is_empty());
        assert_eq!(join_principals(&[]), "");
    }

    #[test]
    fn test_tier_mapping_requires_both_tiers() {
        let mut config = ConversionConfig {
            read_only_tier: Some(PermissionTierId::new()),
            ..Default::default()
        };
        assert!(TierMapping::from_config(&config).is_err());

        config.read_write_tier = Some(PermissionTierId::new());
        let tiers = TierMapping::from_config(&config).unwrap();
        assert_eq!(tiers.tier_for(FolderAccess::ReadOnly), config.read_only_tier.unwrap());
    }

    #[test]
    fn test_from_resolved_maps_tier() {
        let ro = PermissionTierId::new();
        let rw = PermissionTierId::new();
        let tiers = TierMapping::new(ro, rw);
        let folder = ResolvedFolder {
            id: FolderId::new("00lA"),
            name: "Acme".to_string(),
            developer_name: "Acme".to_string(),
            access: FolderAccess::ReadWrite,
            principals: ids(&["P1", "P2"]),
        };

        let request = NewConversionRequest::from_resolved(&folder, &tiers);
        assert_eq!(request.permission_tier_id, rw);
        assert_eq!(request.sharing_principals, "P1,P2");

        let stored = request.into_request(Utc::now());
        assert!(!stored.is_provisioned());
        assert_eq!(stored.principals(), ids(&["P1", "P2"]));
        assert_eq!(stored.derived_name(), "doclib_Acme");
    }
}
