//! SQL script generation for operator review.
//!
//! Scripts target the downstream SQL Server schema: they keep the
//! `DECLARE @X INT = SCOPE_IDENTITY();` idiom and leave the final
//! `COMMIT` / `ROLLBACK` commented out for the operator to choose. Nothing
//! here is executed by this service; writes go through the repository.

mod role_script;
mod template_script;

pub use role_script::{clone_role_script, create_role_script, permission_change_script, NO_CHANGES};
pub use template_script::{all_templates_script, template_role_script};

use crate::models::PermissionTarget;

pub(crate) const BEGIN: &str = "BEGIN TRANSACTION;";
pub(crate) const COMMIT_HINT: &str = "-- COMMIT TRANSACTION;";
pub(crate) const ROLLBACK_HINT: &str = "-- ROLLBACK TRANSACTION;";

/// Renders `value` as a single-quoted string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Flattens line breaks so `value` stays inside a `--` comment.
pub fn comment_text(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn sql_value(id: Option<i64>) -> String {
    id.map_or_else(|| "NULL".to_string(), |id| id.to_string())
}

/// `role_ref` is either a literal id or a variable such as `@NewRoleId`.
pub(crate) fn permission_insert(role_ref: &str, target: PermissionTarget, table: &str) -> String {
    let (page_id, module_id, operation_id) = target.columns();
    format!(
        "INSERT INTO {table} (RoleId, PageId, ModuleId, OperationId)\nVALUES ({role_ref}, {}, {}, {});",
        sql_value(page_id),
        sql_value(module_id),
        sql_value(operation_id),
    )
}

/// Heading comment for a block of inserts at one level.
pub(crate) fn section_heading(target: PermissionTarget) -> &'static str {
    match target {
        PermissionTarget::Module(_) => "-- Add module permissions",
        PermissionTarget::Page(_) => "-- Add page permissions",
        PermissionTarget::Operation(_) => "-- Add operation permissions",
    }
}

/// Appends one headed block per level, each followed by a blank line.
/// `targets` must already be grouped by level.
pub(crate) fn push_grant_sections(
    lines: &mut Vec<String>,
    role_ref: &str,
    table: &str,
    targets: impl IntoIterator<Item = PermissionTarget>,
) {
    let mut current = None;
    for target in targets {
        if current != Some(target.level()) {
            if current.is_some() {
                lines.push(String::new());
            }
            lines.push(section_heading(target).to_string());
            current = Some(target.level());
        }
        lines.push(permission_insert(role_ref, target, table));
    }
    if current.is_some() {
        lines.push(String::new());
    }
}
