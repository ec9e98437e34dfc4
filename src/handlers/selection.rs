//! 权限树勾选处理器
//!
//! 选择状态由客户端保存，每次请求带上当前状态和一次变更，返回传播后的结果。

use crate::{
    error::AppError,
    middleware::AppState,
    permissions::{PermissionSelection, SelectionChange},
};
use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;

/// Apply selection change request
#[derive(Debug, Deserialize)]
pub struct SelectionChangeRequest {
    #[serde(default)]
    pub selection: PermissionSelection,
    pub change: SelectionChange,
}

/// 应用一次勾选变更
pub async fn apply_selection_change(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectionChangeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .role_service
        .apply_selection_change(req.selection, req.change)
        .await?;

    Ok(Json(outcome))
}
