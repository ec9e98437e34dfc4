//! 角色管理服务库
//! 权限树、角色授权差异计算、SQL 脚本生成与 SQLite 持久化

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod repository;
pub mod routes;
pub mod services;
pub mod sql;
pub mod telemetry;
