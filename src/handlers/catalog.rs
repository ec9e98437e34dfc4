//! 权限树处理器

use crate::{error::AppError, middleware::AppState};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

/// 获取完整的权限树（模块 → 页面 → 操作）
pub async fn get_hierarchy(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let hierarchy = state.role_service.hierarchy().await?;

    Ok(Json(json!({
        "modules": hierarchy,
        "module_count": hierarchy.modules().len(),
        "page_count": hierarchy.page_count(),
        "operation_count": hierarchy.operation_count()
    })))
}
