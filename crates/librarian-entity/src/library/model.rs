//! Library, group, and membership entity models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use librarian_core::types::id::{
    GroupMemberId, LibraryId, LibraryMemberId, PermissionGroupId, PermissionTierId, PrincipalId,
};

/// A content library: the target container for migrated documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Library {
    /// Unique library identifier.
    pub id: LibraryId,
    /// Derived developer name (unique).
    pub developer_name: String,
    /// Display name.
    pub name: String,
    /// When the library was created.
    pub created_at: DateTime<Utc>,
}

impl Library {
    /// Create a new library value with a fresh id.
    pub fn new(developer_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: LibraryId::new(),
            developer_name: developer_name.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// A group of principals granted uniform access to one library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PermissionGroup {
    /// Unique group identifier.
    pub id: PermissionGroupId,
    /// Derived developer name (unique).
    pub developer_name: String,
    /// Display name.
    pub name: String,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
}

impl PermissionGroup {
    /// Create a new group value with a fresh id.
    pub fn new(developer_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: PermissionGroupId::new(),
            developer_name: developer_name.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Membership of a principal in a permission group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    /// Unique membership identifier.
    pub id: GroupMemberId,
    /// The group.
    pub group_id: PermissionGroupId,
    /// The member principal.
    pub principal_id: PrincipalId,
}

impl GroupMember {
    /// Create a new membership with a fresh id.
    pub fn new(group_id: PermissionGroupId, principal_id: PrincipalId) -> Self {
        Self {
            id: GroupMemberId::new(),
            group_id,
            principal_id,
        }
    }
}

/// Grant of a permission tier on a library to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LibraryMember {
    /// Unique membership identifier.
    pub id: LibraryMemberId,
    /// The library.
    pub library_id: LibraryId,
    /// The group receiving access.
    pub group_id: PermissionGroupId,
    /// Tier granted.
    pub permission_tier_id: PermissionTierId,
}

impl LibraryMember {
    /// Create a new library membership with a fresh id.
    pub fn new(
        library_id: LibraryId,
        group_id: PermissionGroupId,
        permission_tier_id: PermissionTierId,
    ) -> Self {
        Self {
            id: LibraryMemberId::new(),
            library_id,
            group_id,
            permission_tier_id,
        }
    }
}
