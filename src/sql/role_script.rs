use super::{comment_text, push_grant_sections, quote_literal, BEGIN, COMMIT_HINT, ROLLBACK_HINT};
use crate::models::Role;
use crate::permissions::{ChangeSet, GrantSet};

const TABLE: &str = "ROLEPERMISSIONS";
const NEW_ROLE_ID: &str = "@NewRoleId";

/// Rendered instead of a script when there is nothing to apply.
pub const NO_CHANGES: &str = "-- No changes to save";

fn close_transaction(lines: &mut Vec<String>) {
    lines.push(COMMIT_HINT.to_string());
    lines.push(ROLLBACK_HINT.to_string());
}

fn role_insert(name: &str, status: i64) -> String {
    format!(
        "INSERT INTO ROLES (RoleName, Status)\nVALUES ({}, {});",
        quote_literal(name),
        status
    )
}

/// New role plus one insert per granted node.
pub fn create_role_script(name: &str, status: i64, grants: &GrantSet) -> String {
    let mut lines = vec![BEGIN.to_string(), String::new()];

    lines.push(role_insert(name, status));
    lines.push("-- Get the new role ID".to_string());
    lines.push(format!("DECLARE {NEW_ROLE_ID} INT = SCOPE_IDENTITY();"));
    lines.push(String::new());

    push_grant_sections(&mut lines, NEW_ROLE_ID, TABLE, grants.targets());
    close_transaction(&mut lines);

    lines.join("\n")
}

/// Deletes for `to_remove`, then inserts for `to_add`.
///
/// `rename` prefixes an `UPDATE` of the role name. With no rename and an
/// empty change set the result is [`NO_CHANGES`].
pub fn permission_change_script(role_id: i64, change_set: &ChangeSet, rename: Option<&str>) -> String {
    if change_set.is_empty() && rename.is_none() {
        return NO_CHANGES.to_string();
    }

    let mut lines = Vec::new();

    if let Some(name) = rename {
        lines.push("-- Rename role".to_string());
        lines.push(format!(
            "UPDATE ROLES SET RoleName = {} WHERE RoleId = {};",
            quote_literal(name),
            role_id
        ));
        lines.push(String::new());
    }

    lines.push(BEGIN.to_string());
    lines.push(String::new());

    if !change_set.to_remove.is_empty() {
        lines.push("-- Remove permissions".to_string());
        for permission in &change_set.to_remove {
            lines.push(format!(
                "DELETE FROM {TABLE} WHERE RolePermissionId = {};",
                permission.id
            ));
        }
        lines.push(String::new());
    }

    let role_ref = role_id.to_string();
    push_grant_sections(&mut lines, &role_ref, TABLE, change_set.to_add.targets());
    close_transaction(&mut lines);

    lines.join("\n")
}

/// New role copied from `source` with one set-based permission copy.
/// The new row takes the source's status, matching the repository clone.
pub fn clone_role_script(source: &Role, new_name: &str) -> String {
    let lines = vec![
        format!(
            "-- Clone role: {} from role ID: {}",
            comment_text(new_name),
            source.id
        ),
        BEGIN.to_string(),
        String::new(),
        role_insert(new_name, source.status),
        String::new(),
        format!("DECLARE {NEW_ROLE_ID} INT = SCOPE_IDENTITY();"),
        String::new(),
        "-- Copy permissions from source role".to_string(),
        format!("INSERT INTO {TABLE} (RoleId, PageId, ModuleId, OperationId)"),
        format!("SELECT {NEW_ROLE_ID}, PageId, ModuleId, OperationId"),
        format!("FROM {TABLE}"),
        format!("WHERE RoleId = {};", source.id),
        String::new(),
        COMMIT_HINT.to_string(),
        ROLLBACK_HINT.to_string(),
    ];

    lines.join("\n")
}
