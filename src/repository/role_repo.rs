//! Role repository (角色与授权数据访问)
//!
//! 多语句写操作都在单个事务中执行：成功则提交，任一步失败则回滚并把错误返回给调用方。

use crate::{
    error::AppError,
    models::{NewRole, PermissionTarget, Role, RolePermission, UpdateRoleRequest, UserRole},
    permissions::{compute_change_set, ChangeSet, GrantSet, PermissionMap, PermissionSelection},
};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::HashMap;
use tracing::{error, info, warn};

const ROLE_COLUMNS: &str =
    "RoleID AS id, RoleName AS name, Status AS status, IsTemplate AS is_template";

const PERMISSION_COLUMNS: &str = "RolePermissionID AS id, RoleID AS role_id, PageID AS page_id, \
     ModuleID AS module_id, OperationID AS operation_id";

pub struct RoleRepository {
    db: SqlitePool,
}

impl RoleRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ==================== Roles ====================

    /// 列出所有角色
    pub async fn list(&self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM ROLES ORDER BY RoleID"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    /// 根据 ID 查找角色
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Role>, AppError> {
        let mut conn = self.db.acquire().await?;
        find_role(&mut conn, id).await
    }

    /// 根据名称查找角色
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM ROLES WHERE RoleName = ?"
        ))
        .bind(name)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    /// 创建角色（重名由唯一约束拒绝，映射为 Conflict）
    pub async fn create(&self, role: &NewRole) -> Result<Role, AppError> {
        let mut conn = self.db.acquire().await?;
        let created = insert_role(&mut conn, role).await?;

        info!(role_id = created.id, name = %created.name, "Role created");
        Ok(created)
    }

    /// 更新角色名称 / 状态
    pub async fn update(&self, id: i64, req: &UpdateRoleRequest) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            UPDATE ROLES
            SET RoleName = COALESCE(?1, RoleName),
                Status = COALESCE(?2, Status)
            WHERE RoleID = ?3
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(&req.name)
        .bind(req.status)
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| match &req.name {
            Some(name) => name_taken(name, e.into()),
            None => e.into(),
        })?;

        if let Some(role) = &role {
            info!(role_id = role.id, name = %role.name, status = role.status, "Role updated");
        }

        Ok(role)
    }

    /// 删除角色及其全部授权
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.begin().await?;
        let result = delete_role(&mut tx, id).await;
        let deleted = finish(tx, result, "delete_role").await?;

        if deleted {
            info!(role_id = id, "Role deleted");
        }
        Ok(deleted)
    }

    /// 创建角色并写入授权（单个事务）
    pub async fn create_role_with_permissions(
        &self,
        role: &NewRole,
        grants: &GrantSet,
    ) -> Result<Role, AppError> {
        let mut tx = self.begin().await?;
        let result = create_with_grants(&mut tx, role, grants).await;
        let created = finish(tx, result, "create_role_with_permissions").await?;

        info!(
            role_id = created.id,
            name = %created.name,
            grants = grants.len(),
            "Role created with permissions"
        );
        Ok(created)
    }

    /// 克隆角色：复制状态与全部授权，新角色不是模板。
    /// 源角色不存在时返回 NotFound，且不会写入任何行。
    pub async fn clone_role(&self, source_id: i64, new_name: &str) -> Result<Role, AppError> {
        let mut tx = self.begin().await?;
        let result = clone_into(&mut tx, source_id, new_name).await;
        let (created, copied) = finish(tx, result, "clone_role").await?;

        info!(
            source_role_id = source_id,
            role_id = created.id,
            name = %created.name,
            copied_permissions = copied,
            "Role cloned"
        );
        Ok(created)
    }

    // ==================== Permissions ====================

    /// 获取角色的所有授权
    pub async fn list_permissions(&self, role_id: i64) -> Result<Vec<RolePermission>, AppError> {
        let mut conn = self.db.acquire().await?;
        list_permissions(&mut conn, role_id).await
    }

    /// 获取全部授权（用于模板导出）
    pub async fn list_all_permissions(&self) -> Result<Vec<RolePermission>, AppError> {
        let permissions = sqlx::query_as::<_, RolePermission>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM ROLEPERMISSIONS ORDER BY RolePermissionID"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// 为角色添加一条授权
    pub async fn add_permission(
        &self,
        role_id: i64,
        target: PermissionTarget,
    ) -> Result<RolePermission, AppError> {
        let mut conn = self.db.acquire().await?;
        insert_permission(&mut conn, role_id, target).await
    }

    /// 删除一条授权
    pub async fn delete_permission(&self, id: i64) -> Result<bool, AppError> {
        let mut conn = self.db.acquire().await?;
        delete_permission(&mut conn, id).await
    }

    /// 让存储的授权与给定选择一致。
    ///
    /// 差异计算与 SQL 预览共用 [`compute_change_set`]，先删除后插入。
    pub async fn update_role_permissions(
        &self,
        role_id: i64,
        selection: &PermissionSelection,
    ) -> Result<ChangeSet, AppError> {
        let mut tx = self.begin().await?;
        let result = apply_selection(&mut tx, role_id, selection).await;
        let change_set = finish(tx, result, "update_role_permissions").await?;

        info!(
            role_id,
            added = change_set.to_add.len(),
            removed = change_set.to_remove.len(),
            "Role permissions updated"
        );
        Ok(change_set)
    }

    /// 每个角色的授权数量
    pub async fn permission_counts(&self) -> Result<HashMap<i64, i64>, AppError> {
        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT RoleID, COUNT(*) FROM ROLEPERMISSIONS GROUP BY RoleID")
                .fetch_all(&self.db)
                .await?;

        Ok(rows.into_iter().collect())
    }

    // ==================== User Roles ====================

    /// 分配给角色的用户
    pub async fn list_user_roles(&self, role_id: i64) -> Result<Vec<UserRole>, AppError> {
        let user_roles = sqlx::query_as::<_, UserRole>(
            "SELECT RoleID AS role_id, UserID AS user_id FROM USERROLES WHERE RoleID = ? ORDER BY UserID",
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(user_roles)
    }

    /// 分配给角色的用户数量
    pub async fn count_users(&self, role_id: i64) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM USERROLES WHERE RoleID = ?")
            .bind(role_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    /// 每个角色的用户数量
    pub async fn user_counts(&self) -> Result<HashMap<i64, i64>, AppError> {
        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT RoleID, COUNT(*) FROM USERROLES GROUP BY RoleID")
                .fetch_all(&self.db)
                .await?;

        Ok(rows.into_iter().collect())
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::transaction(format!("Failed to begin transaction: {}", e))
        })
    }
}

/// 提交或回滚事务
async fn finish<T>(
    tx: Transaction<'static, Sqlite>,
    result: Result<T, AppError>,
    operation: &'static str,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(|e| {
                error!(operation, error = %e, "Failed to commit transaction");
                AppError::transaction(format!("Failed to commit {}: {}", operation, e))
            })?;
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = tx.rollback().await {
                error!(operation, error = %e, "Failed to roll back transaction");
            }
            warn!(operation, error = %err, "Transaction rolled back");
            Err(err)
        }
    }
}

async fn find_role(conn: &mut SqliteConnection, id: i64) -> Result<Option<Role>, AppError> {
    let role = sqlx::query_as::<_, Role>(&format!(
        "SELECT {ROLE_COLUMNS} FROM ROLES WHERE RoleID = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(role)
}

async fn insert_role(conn: &mut SqliteConnection, role: &NewRole) -> Result<Role, AppError> {
    let created = sqlx::query_as::<_, Role>(&format!(
        r#"
        INSERT INTO ROLES (RoleName, Status, IsTemplate)
        VALUES (?, ?, ?)
        RETURNING {ROLE_COLUMNS}
        "#
    ))
    .bind(&role.name)
    .bind(role.status)
    .bind(role.is_template)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| name_taken(&role.name, AppError::in_transaction("insert role", e)))?;

    Ok(created)
}

/// 唯一约束冲突改写为角色名冲突
fn name_taken(name: &str, err: AppError) -> AppError {
    match err {
        AppError::Conflict(_) => AppError::Conflict(format!("Role name '{}' already exists", name)),
        other => other,
    }
}

async fn list_permissions(
    conn: &mut SqliteConnection,
    role_id: i64,
) -> Result<Vec<RolePermission>, AppError> {
    let permissions = sqlx::query_as::<_, RolePermission>(&format!(
        "SELECT {PERMISSION_COLUMNS} FROM ROLEPERMISSIONS WHERE RoleID = ? ORDER BY RolePermissionID"
    ))
    .bind(role_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(permissions)
}

async fn insert_permission(
    conn: &mut SqliteConnection,
    role_id: i64,
    target: PermissionTarget,
) -> Result<RolePermission, AppError> {
    let (page_id, module_id, operation_id) = target.columns();

    let permission = sqlx::query_as::<_, RolePermission>(&format!(
        r#"
        INSERT INTO ROLEPERMISSIONS (RoleID, PageID, ModuleID, OperationID)
        VALUES (?, ?, ?, ?)
        RETURNING {PERMISSION_COLUMNS}
        "#
    ))
    .bind(role_id)
    .bind(page_id)
    .bind(module_id)
    .bind(operation_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::in_transaction("insert role permission", e))?;

    Ok(permission)
}

async fn delete_permission(conn: &mut SqliteConnection, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM ROLEPERMISSIONS WHERE RolePermissionID = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::in_transaction("delete role permission", e))?;

    Ok(result.rows_affected() > 0)
}

async fn delete_role(conn: &mut SqliteConnection, id: i64) -> Result<bool, AppError> {
    sqlx::query("DELETE FROM ROLEPERMISSIONS WHERE RoleID = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::in_transaction("delete role permissions", e))?;

    let result = sqlx::query("DELETE FROM ROLES WHERE RoleID = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::in_transaction("delete role", e))?;

    Ok(result.rows_affected() > 0)
}

async fn create_with_grants(
    conn: &mut SqliteConnection,
    role: &NewRole,
    grants: &GrantSet,
) -> Result<Role, AppError> {
    let created = insert_role(conn, role).await?;
    for target in grants.targets() {
        insert_permission(conn, created.id, target).await?;
    }
    Ok(created)
}

async fn clone_into(
    conn: &mut SqliteConnection,
    source_id: i64,
    new_name: &str,
) -> Result<(Role, u64), AppError> {
    let source = find_role(conn, source_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Role with ID {}", source_id)))?;

    let created = insert_role(
        conn,
        &NewRole {
            name: new_name.to_string(),
            status: source.status,
            is_template: false,
        },
    )
    .await?;

    let copied = sqlx::query(
        r#"
        INSERT INTO ROLEPERMISSIONS (RoleID, PageID, ModuleID, OperationID)
        SELECT ?, PageID, ModuleID, OperationID
        FROM ROLEPERMISSIONS
        WHERE RoleID = ?
        ORDER BY RolePermissionID
        "#,
    )
    .bind(created.id)
    .bind(source.id)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::in_transaction("copy role permissions", e))?
    .rows_affected();

    Ok((created, copied))
}

async fn apply_selection(
    conn: &mut SqliteConnection,
    role_id: i64,
    selection: &PermissionSelection,
) -> Result<ChangeSet, AppError> {
    if find_role(conn, role_id).await?.is_none() {
        return Err(AppError::not_found(format!("Role with ID {}", role_id)));
    }

    let stored = list_permissions(conn, role_id).await?;
    let change_set = compute_change_set(&PermissionMap::from_permissions(stored), selection);

    for permission in &change_set.to_remove {
        delete_permission(conn, permission.id).await?;
    }
    for target in change_set.to_add.targets() {
        insert_permission(conn, role_id, target).await?;
    }

    Ok(change_set)
}
