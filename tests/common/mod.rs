//! 测试公共模块
//! 提供测试辅助函数和测试工具

#![allow(dead_code)]

use axum::{body::Body, http::Request, response::Response, Router};
use http_body_util::BodyExt;
use role_manager::{
    config::{AppConfig, DatabaseConfig, LoggingConfig, ServerConfig},
    db,
    middleware::AppState,
    models::PermissionTarget,
    repository::RoleRepository,
    routes,
};
use secrecy::Secret;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;

/// 种子数据中的角色 ID
pub const ADMIN_ROLE_ID: i64 = 1;
pub const SUPER_USER_ROLE_ID: i64 = 2;
pub const USER_ROLE_ID: i64 = 22;

/// 创建测试配置（内存数据库）
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: Secret::new("sqlite::memory:".to_string()),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout_secs: 5,
            busy_timeout_ms: 1000,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// 初始化测试数据库（表结构 + 种子数据），每次调用都是独立的库
pub async fn setup_test_db(config: &AppConfig) -> SqlitePool {
    let pool = db::create_pool(&config.database)
        .await
        .expect("Failed to create test database pool");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// 创建测试应用状态
pub async fn create_test_app_state(pool: SqlitePool) -> Arc<AppState> {
    Arc::new(AppState::new(create_test_config(), pool))
}

/// 创建带种子数据的测试路由
pub async fn create_test_app() -> (Router, SqlitePool) {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_app_state(pool.clone()).await;
    (routes::create_router(state), pool)
}

/// 创建一个非模板角色，返回其 ID
pub async fn create_test_role(
    pool: &SqlitePool,
    name: &str,
    grants: &[PermissionTarget],
) -> Result<i64, Box<dyn std::error::Error>> {
    let repo = RoleRepository::new(pool.clone());
    let role = repo
        .create(&role_manager::models::NewRole {
            name: name.to_string(),
            status: 0,
            is_template: false,
        })
        .await?;

    for target in grants {
        repo.add_permission(role.id, *target).await?;
    }

    Ok(role.id)
}

/// 为用户分配角色
pub async fn assign_role_to_user(
    pool: &SqlitePool,
    user_id: i64,
    role_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    sqlx::query("INSERT INTO USERROLES (RoleID, UserID) VALUES (?, ?)")
        .bind(role_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// 表中行数
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows");
    count
}

/// 发送请求
pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone()
        .oneshot(request)
        .await
        .expect("Request failed")
}

/// GET 请求
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

/// 带 JSON 请求体的请求
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

/// 读取响应体为字符串
pub async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

/// 读取响应体为 JSON
pub async fn body_json(response: Response) -> serde_json::Value {
    let text = body_text(response).await;
    serde_json::from_str(&text).expect("Body is not JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_test_config() {
        let config = create_test_config();
        assert_eq!(config.server.addr, "127.0.0.1:0");
        assert!(config.database.is_in_memory());
        assert!(config.validate().is_ok());
    }
}
