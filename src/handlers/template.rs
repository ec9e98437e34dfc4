//! 模板角色 SQL 导出

use crate::{error::AppError, middleware::AppState};
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;

const SQL_CONTENT_TYPE: &str = "application/sql; charset=utf-8";

fn sql_attachment(filename: String, sql: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, SQL_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        sql,
    )
}

/// 导出所有模板角色
pub async fn export_all_templates(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let sql = state.role_service.all_templates_sql().await?;

    Ok(sql_attachment("all-template-roles.sql".to_string(), sql))
}

/// 导出单个模板角色
pub async fn export_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = state.role_service.template_sql(id).await?;

    Ok(sql_attachment(format!("template-role-{}.sql", id), sql))
}
