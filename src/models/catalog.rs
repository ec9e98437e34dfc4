//! Permission catalog: modules, pages and operations.
//!
//! These are seed data. The service only ever reads them.

use serde::{Deserialize, Serialize};

/// Application area, the top level of the permission hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Module {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub application_type: i64,
}

/// Screen inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    pub id: i64,
    pub module_id: i64,
    pub name: String,
    pub code: String,
    pub url: Option<String>,
}

/// Action on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Operation {
    pub id: i64,
    pub page_id: i64,
    pub code: String,
    pub name: String,
}
