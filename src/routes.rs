//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, middleware::AppState};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    let api_routes = Router::new()
        // 权限树
        .route("/api/v1/hierarchy", get(handlers::catalog::get_hierarchy))
        .route(
            "/api/v1/selection",
            post(handlers::selection::apply_selection_change),
        )

        // 角色
        .route(
            "/api/v1/roles",
            get(handlers::role::list_roles).post(handlers::role::create_role),
        )
        .route(
            "/api/v1/roles/preview",
            post(handlers::role::preview_create_role),
        )
        .route(
            "/api/v1/roles/{id}",
            get(handlers::role::get_role)
                .put(handlers::role::update_role)
                .delete(handlers::role::delete_role),
        )

        // 授权
        .route(
            "/api/v1/roles/{id}/permissions",
            get(handlers::role::get_role_permissions).put(handlers::role::apply_role_permissions),
        )
        .route(
            "/api/v1/roles/{id}/permissions/preview",
            post(handlers::role::preview_role_permissions),
        )

        // 克隆
        .route("/api/v1/roles/{id}/clone", post(handlers::role::clone_role))
        .route(
            "/api/v1/roles/{id}/clone/preview",
            post(handlers::role::preview_clone_role),
        )

        // 模板导出
        .route(
            "/api/v1/templates/sql",
            get(handlers::template::export_all_templates),
        )
        .route(
            "/api/v1/templates/{id}/sql",
            get(handlers::template::export_template),
        );

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
