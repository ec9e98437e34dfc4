//! Catalog repository (模块 / 页面 / 操作 只读访问)

use crate::{
    error::AppError,
    models::{Module, Operation, Page},
    permissions::{build_hierarchy, Hierarchy},
};
use sqlx::SqlitePool;

pub struct CatalogRepository {
    db: SqlitePool,
}

impl CatalogRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// 列出所有模块（按 ID 排序）
    pub async fn list_modules(&self) -> Result<Vec<Module>, AppError> {
        let modules = sqlx::query_as::<_, Module>(
            r#"
            SELECT ModuleID AS id, ModuleName AS name, ModuleCode AS code,
                   ApplicationType AS application_type
            FROM MODULES
            ORDER BY ModuleID
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(modules)
    }

    /// 列出所有页面（按 ID 排序）
    pub async fn list_pages(&self) -> Result<Vec<Page>, AppError> {
        let pages = sqlx::query_as::<_, Page>(
            r#"
            SELECT PageID AS id, ModuleID AS module_id, PageName AS name,
                   PageCode AS code, PageURL AS url
            FROM PAGES
            ORDER BY PageID
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(pages)
    }

    /// 列出所有操作（按 ID 排序）
    pub async fn list_operations(&self) -> Result<Vec<Operation>, AppError> {
        let operations = sqlx::query_as::<_, Operation>(
            r#"
            SELECT OperationID AS id, PageID AS page_id, OperationCode AS code,
                   OperationName AS name
            FROM OPERATIONS
            ORDER BY OperationID
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(operations)
    }

    /// 加载完整的权限树
    pub async fn load_hierarchy(&self) -> Result<Hierarchy, AppError> {
        let modules = self.list_modules().await?;
        let pages = self.list_pages().await?;
        let operations = self.list_operations().await?;

        let hierarchy = build_hierarchy(modules, pages, operations);
        tracing::debug!(
            modules = hierarchy.modules().len(),
            pages = hierarchy.page_count(),
            operations = hierarchy.operation_count(),
            "Permission hierarchy loaded"
        );

        Ok(hierarchy)
    }
}
