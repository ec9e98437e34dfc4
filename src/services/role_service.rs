//! 角色管理服务
//!
//! 组合仓储、权限树和 SQL 生成器，提供各页面需要的操作。

use crate::{
    error::AppError,
    models::{
        default_clone_name, validate_role_name, CloneRoleRequest, CreateRoleRequest, NewRole,
        PreviewPermissionsRequest, Role, RoleDetail, RoleSummary, UpdateRoleRequest,
    },
    permissions::{
        compute_change_set, ChangeSet, GrantSet, Hierarchy, PermissionMap, PermissionSelection,
        SelectionChange, SelectionTree,
    },
    repository::{CatalogRepository, RoleRepository},
    sql,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use validator::Validate;

/// SQL preview of a permission save
#[derive(Debug, Clone, Serialize)]
pub struct PermissionPreview {
    pub change_set: ChangeSet,
    pub sql: String,
}

/// Selection after a [`SelectionChange`]
#[derive(Debug, Clone, Serialize)]
pub struct SelectionOutcome {
    pub selection: PermissionSelection,
    pub all_selected: bool,
}

pub struct RoleService {
    db: SqlitePool,
}

impl RoleService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    fn roles(&self) -> RoleRepository {
        RoleRepository::new(self.db.clone())
    }

    /// 权限树（模块 → 页面 → 操作）
    pub async fn hierarchy(&self) -> Result<Hierarchy, AppError> {
        CatalogRepository::new(self.db.clone()).load_hierarchy().await
    }

    /// 角色列表：模板在前，其余按名称排序；`filter` 为不区分大小写的子串匹配
    pub async fn list_roles(&self, filter: Option<&str>) -> Result<Vec<RoleSummary>, AppError> {
        let repo = self.roles();
        let roles = repo.list().await?;
        let permission_counts = repo.permission_counts().await?;
        let user_counts = repo.user_counts().await?;

        Ok(summarize(roles, filter, &permission_counts, &user_counts))
    }

    /// 角色详情，附带由已有授权生成的选择状态
    pub async fn get_role_detail(&self, id: i64) -> Result<RoleDetail, AppError> {
        let repo = self.roles();
        let role = self.require_role(id).await?;
        let permissions = repo.list_permissions(id).await?;
        let user_count = repo.count_users(id).await?;
        let selection = PermissionMap::from_permissions(permissions.iter().cloned()).selection();

        Ok(RoleDetail {
            role,
            permissions,
            user_count,
            selection,
        })
    }

    /// 创建角色并写入所选授权
    pub async fn create_role(&self, req: CreateRoleRequest) -> Result<Role, AppError> {
        req.validate()?;
        let name = validate_role_name(&req.name)?.to_string();
        let grants = req.selection.granted();
        self.ensure_known(&grants).await?;

        let role = NewRole {
            name,
            status: req.status,
            is_template: false,
        };
        self.roles().create_role_with_permissions(&role, &grants).await
    }

    /// 新角色的 SQL 预览
    pub async fn preview_create_role(&self, req: &CreateRoleRequest) -> Result<String, AppError> {
        req.validate()?;
        let name = validate_role_name(&req.name)?;
        let grants = req.selection.granted();
        self.ensure_known(&grants).await?;

        Ok(sql::create_role_script(name, req.status, &grants))
    }

    /// 修改角色名称或状态（模板角色不可修改）
    pub async fn update_role(&self, id: i64, mut req: UpdateRoleRequest) -> Result<Role, AppError> {
        req.validate()?;
        let role = self.require_role(id).await?;
        ensure_editable(&role)?;

        if let Some(name) = req.name.take() {
            req.name = Some(validate_role_name(&name)?.to_string());
        }

        self.roles()
            .update(id, &req)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Role with ID {}", id)))
    }

    /// 删除角色（模板角色、仍有用户的角色不可删除）
    pub async fn delete_role(&self, id: i64) -> Result<(), AppError> {
        let repo = self.roles();
        let role = self.require_role(id).await?;
        ensure_editable(&role)?;

        let users = repo.count_users(id).await?;
        if users > 0 {
            return Err(AppError::Conflict(format!(
                "Role '{}' is still assigned to {} user(s)",
                role.name, users
            )));
        }

        if !repo.delete(id).await? {
            return Err(AppError::not_found(format!("Role with ID {}", id)));
        }
        Ok(())
    }

    /// 直接保存授权，返回实际执行的变更
    pub async fn apply_permissions(
        &self,
        id: i64,
        selection: &PermissionSelection,
    ) -> Result<ChangeSet, AppError> {
        let role = self.require_role(id).await?;
        ensure_editable(&role)?;
        self.ensure_known(&selection.granted()).await?;

        self.roles().update_role_permissions(id, selection).await
    }

    /// 保存授权的 SQL 预览；`req.name` 与当前名称不同时附带改名语句
    pub async fn preview_permission_changes(
        &self,
        id: i64,
        req: &PreviewPermissionsRequest,
    ) -> Result<PermissionPreview, AppError> {
        req.validate()?;
        let role = self.require_role(id).await?;
        let permissions = self.roles().list_permissions(id).await?;
        let change_set =
            compute_change_set(&PermissionMap::from_permissions(permissions), &req.selection);

        let rename = match req.name.as_deref() {
            Some(name) => {
                let name = validate_role_name(name)?;
                (name != role.name).then_some(name)
            }
            None => None,
        };

        let sql = sql::permission_change_script(id, &change_set, rename);
        Ok(PermissionPreview { change_set, sql })
    }

    /// 克隆角色
    pub async fn clone_role(&self, source_id: i64, req: CloneRoleRequest) -> Result<Role, AppError> {
        req.validate()?;
        let name = match req.name {
            Some(name) => validate_role_name(&name)?.to_string(),
            None => default_clone_name(&self.require_role(source_id).await?),
        };

        self.roles().clone_role(source_id, &name).await
    }

    /// 克隆的 SQL 预览
    pub async fn preview_clone(
        &self,
        source_id: i64,
        req: &CloneRoleRequest,
    ) -> Result<String, AppError> {
        req.validate()?;
        let source = self.require_role(source_id).await?;
        let name = match req.name.as_deref() {
            Some(name) => validate_role_name(name)?.to_string(),
            None => default_clone_name(&source),
        };

        Ok(sql::clone_role_script(&source, &name))
    }

    /// 在权限树上应用一次勾选变更
    pub async fn apply_selection_change(
        &self,
        selection: PermissionSelection,
        change: SelectionChange,
    ) -> Result<SelectionOutcome, AppError> {
        let hierarchy = self.hierarchy().await?;
        let mut tree = SelectionTree::new(&hierarchy, selection);
        tree.apply(change)?;

        let all_selected = tree.is_all_selected();
        Ok(SelectionOutcome {
            selection: tree.into_selection(),
            all_selected,
        })
    }

    /// 单个模板角色的重建脚本
    pub async fn template_sql(&self, id: i64) -> Result<String, AppError> {
        let role = self.require_role(id).await?;
        if !role.is_template {
            return Err(AppError::validation(format!(
                "Role '{}' is not a template role",
                role.name
            )));
        }

        let permissions = self.roles().list_permissions(id).await?;
        Ok(sql::template_role_script(&role, &permissions))
    }

    /// 所有模板角色的重建脚本
    pub async fn all_templates_sql(&self) -> Result<String, AppError> {
        let repo = self.roles();
        let roles = repo.list().await?;
        let permissions = repo.list_all_permissions().await?;

        Ok(sql::all_templates_script(&roles, &permissions))
    }

    async fn require_role(&self, id: i64) -> Result<Role, AppError> {
        self.roles()
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Role with ID {}", id)))
    }

    /// Granted ids must exist in the catalog.
    async fn ensure_known(&self, grants: &GrantSet) -> Result<(), AppError> {
        if grants.is_empty() {
            return Ok(());
        }

        let hierarchy = self.hierarchy().await?;
        let unknown: Vec<String> = grants
            .module_ids
            .iter()
            .filter(|&&id| hierarchy.module(id).is_none())
            .map(|id| format!("module {}", id))
            .chain(
                grants
                    .page_ids
                    .iter()
                    .filter(|&&id| hierarchy.page(id).is_none())
                    .map(|id| format!("page {}", id)),
            )
            .chain(
                grants
                    .operation_ids
                    .iter()
                    .filter(|&&id| hierarchy.operation(id).is_none())
                    .map(|id| format!("operation {}", id)),
            )
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Unknown permission targets: {}",
                unknown.join(", ")
            )))
        }
    }
}

fn ensure_editable(role: &Role) -> Result<(), AppError> {
    if role.is_template {
        return Err(AppError::validation(format!(
            "Template role '{}' cannot be modified",
            role.name
        )));
    }
    Ok(())
}

fn summarize(
    roles: Vec<Role>,
    filter: Option<&str>,
    permission_counts: &HashMap<i64, i64>,
    user_counts: &HashMap<i64, i64>,
) -> Vec<RoleSummary> {
    let needle = filter
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_lowercase);

    let mut summaries: Vec<RoleSummary> = roles
        .into_iter()
        .filter(|role| match &needle {
            Some(needle) => role.name.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .map(|role| RoleSummary {
            permission_count: permission_counts.get(&role.id).copied().unwrap_or(0) as usize,
            user_count: user_counts.get(&role.id).copied().unwrap_or(0),
            role,
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.role
            .is_template
            .cmp(&a.role.is_template)
            .then_with(|| a.role.name.to_lowercase().cmp(&b.role.name.to_lowercase()))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: i64, name: &str, is_template: bool) -> Role {
        Role {
            id,
            name: name.to_string(),
            status: 0,
            is_template,
        }
    }

    fn sample() -> Vec<Role> {
        vec![
            role(30, "warehouse clerk", false),
            role(22, "User", true),
            role(31, "Auditor", false),
            role(2, "SuperUser", true),
        ]
    }

    #[test]
    fn test_templates_listed_first_then_by_name() {
        let summaries = summarize(sample(), None, &HashMap::new(), &HashMap::new());
        let names: Vec<&str> = summaries.iter().map(|s| s.role.name.as_str()).collect();
        assert_eq!(names, vec!["SuperUser", "User", "Auditor", "warehouse clerk"]);
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let summaries = summarize(sample(), Some("  USER "), &HashMap::new(), &HashMap::new());
        let names: Vec<&str> = summaries.iter().map(|s| s.role.name.as_str()).collect();
        assert_eq!(names, vec!["SuperUser", "User"]);

        let blank = summarize(sample(), Some(""), &HashMap::new(), &HashMap::new());
        assert_eq!(blank.len(), 4);
    }

    #[test]
    fn test_counts_default_to_zero() {
        let permissions = HashMap::from([(2, 4)]);
        let users = HashMap::from([(2, 2), (22, 1)]);
        let summaries = summarize(sample(), Some("super"), &permissions, &users);
        assert_eq!(summaries[0].permission_count, 4);
        assert_eq!(summaries[0].user_count, 2);

        let auditor = summarize(sample(), Some("auditor"), &permissions, &users);
        assert_eq!(auditor[0].permission_count, 0);
        assert_eq!(auditor[0].user_count, 0);
    }

    #[test]
    fn test_templates_are_not_editable() {
        assert!(ensure_editable(&role(2, "SuperUser", true)).is_err());
        assert!(ensure_editable(&role(30, "Clerk", false)).is_ok());
    }
}
