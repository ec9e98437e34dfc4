//! Role and permission domain models

use crate::error::{AppError, Result};
use crate::permissions::PermissionSelection;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    /// 0 = active
    pub status: i64,
    pub is_template: bool,
}

/// Grant of one hierarchy node to a role.
///
/// Exactly one of `module_id`, `page_id`, `operation_id` is set. New rows
/// are only ever built from a [`PermissionTarget`], so the gateway cannot
/// write a row that violates this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RolePermission {
    pub id: i64,
    pub role_id: i64,
    pub page_id: Option<i64>,
    pub module_id: Option<i64>,
    pub operation_id: Option<i64>,
}

impl RolePermission {
    /// Strict classification: errors unless exactly one level is set.
    pub fn target(&self) -> Result<PermissionTarget> {
        match (self.module_id, self.page_id, self.operation_id) {
            (Some(id), None, None) => Ok(PermissionTarget::Module(id)),
            (None, Some(id), None) => Ok(PermissionTarget::Page(id)),
            (None, None, Some(id)) => Ok(PermissionTarget::Operation(id)),
            _ => Err(AppError::validation(format!(
                "Role permission {} must reference exactly one of module, page or operation",
                self.id
            ))),
        }
    }

    /// Lenient classification for rows already in storage.
    ///
    /// Operation wins over page, page over module. Returns `None` for a row
    /// with no level at all.
    pub fn classify(&self) -> Option<PermissionTarget> {
        if let Some(id) = self.operation_id {
            Some(PermissionTarget::Operation(id))
        } else if let Some(id) = self.page_id {
            Some(PermissionTarget::Page(id))
        } else {
            self.module_id.map(PermissionTarget::Module)
        }
    }
}

/// Hierarchy level of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    Module,
    Page,
    Operation,
}

/// The single node a permission row grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "level", content = "id", rename_all = "snake_case")]
pub enum PermissionTarget {
    Module(i64),
    Page(i64),
    Operation(i64),
}

impl PermissionTarget {
    pub fn level(&self) -> PermissionLevel {
        match self {
            PermissionTarget::Module(_) => PermissionLevel::Module,
            PermissionTarget::Page(_) => PermissionLevel::Page,
            PermissionTarget::Operation(_) => PermissionLevel::Operation,
        }
    }

    pub fn id(&self) -> i64 {
        match *self {
            PermissionTarget::Module(id)
            | PermissionTarget::Page(id)
            | PermissionTarget::Operation(id) => id,
        }
    }

    /// Column values in ROLEPERMISSIONS order: (PageID, ModuleID, OperationID).
    pub fn columns(&self) -> (Option<i64>, Option<i64>, Option<i64>) {
        match *self {
            PermissionTarget::Module(id) => (None, Some(id), None),
            PermissionTarget::Page(id) => (Some(id), None, None),
            PermissionTarget::Operation(id) => (None, None, Some(id)),
        }
    }
}

/// User <-> role association (read-only here)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRole {
    pub role_id: i64,
    pub user_id: i64,
}

/// Role list entry
#[derive(Debug, Clone, Serialize)]
pub struct RoleSummary {
    #[serde(flatten)]
    pub role: Role,
    pub permission_count: usize,
    pub user_count: i64,
}

/// Role with its grants and the tree selection they seed
#[derive(Debug, Clone, Serialize)]
pub struct RoleDetail {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<RolePermission>,
    pub user_count: i64,
    pub selection: PermissionSelection,
}

/// Values for a new role row
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub status: i64,
    pub is_template: bool,
}

/// Create role request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub selection: PermissionSelection,
}

/// Update role request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub status: Option<i64>,
}

/// Clone role request; without a name the clone is called "Copy of <source>"
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CloneRoleRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
}

/// Default name offered for a clone of `source`.
pub fn default_clone_name(source: &Role) -> String {
    format!("Copy of {}", source.name)
}

/// Save permissions request
#[derive(Debug, Deserialize)]
pub struct ApplyPermissionsRequest {
    pub selection: PermissionSelection,
}

/// Preview permission changes request; `name` previews a rename as well
#[derive(Debug, Deserialize, Validate)]
pub struct PreviewPermissionsRequest {
    pub selection: PermissionSelection,
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
}

/// Role list query
#[derive(Debug, Default, Deserialize)]
pub struct RoleListQuery {
    pub filter: Option<String>,
}

/// Rejects blank names; length is checked by `Validate`.
pub fn validate_role_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Role name must not be empty"));
    }
    Ok(trimmed)
}
