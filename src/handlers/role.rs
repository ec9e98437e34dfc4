//! 角色管理的 HTTP 处理器

use crate::{error::AppError, middleware::AppState, models::role::*};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

// ==================== Roles ====================

/// 列出角色（模板在前）
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoleListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let roles = state.role_service.list_roles(query.filter.as_deref()).await?;

    Ok(Json(json!({
        "roles": roles,
        "count": roles.len()
    })))
}

/// 创建角色（含初始授权）
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.role_service.create_role(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "角色创建成功",
            "role": role
        })),
    ))
}

/// 新角色的 SQL 预览
pub async fn preview_create_role(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let sql = state.role_service.preview_create_role(&req).await?;

    Ok(Json(json!({ "sql": sql })))
}

/// 获取角色详情
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.role_service.get_role_detail(id).await?;

    Ok(Json(detail))
}

/// 更新角色
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.role_service.update_role(id, req).await?;

    Ok(Json(json!({
        "message": "角色更新成功",
        "role": role
    })))
}

/// 删除角色
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.role_service.delete_role(id).await?;

    Ok(Json(json!({
        "message": "角色删除成功"
    })))
}

// ==================== Permissions ====================

/// 获取角色的授权及选择状态
pub async fn get_role_permissions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.role_service.get_role_detail(id).await?;

    Ok(Json(json!({
        "role_id": id,
        "permissions": detail.permissions,
        "selection": detail.selection
    })))
}

/// 保存授权
pub async fn apply_role_permissions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ApplyPermissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let change_set = state
        .role_service
        .apply_permissions(id, &req.selection)
        .await?;

    Ok(Json(json!({
        "message": "权限保存成功",
        "change_set": change_set
    })))
}

/// 授权变更的 SQL 预览
pub async fn preview_role_permissions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<PreviewPermissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let preview = state
        .role_service
        .preview_permission_changes(id, &req)
        .await?;

    Ok(Json(preview))
}

// ==================== Clone ====================

/// 克隆角色
pub async fn clone_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CloneRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.role_service.clone_role(id, req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "角色克隆成功",
            "source_role_id": id,
            "role": role
        })),
    ))
}

/// 克隆的 SQL 预览
pub async fn preview_clone_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CloneRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let sql = state.role_service.preview_clone(id, &req).await?;

    Ok(Json(json!({ "sql": sql })))
}
