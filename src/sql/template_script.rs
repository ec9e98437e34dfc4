use super::{comment_text, push_grant_sections, quote_literal};
use crate::models::{PermissionLevel, PermissionTarget, Role, RolePermission};

const TABLE: &str = "RolePermissions";
const ROLE_ID: &str = "@RoleId";

/// Script that recreates one role and its grants from scratch.
///
/// Grants are grouped module, page, operation; each group keeps the order
/// of `permissions`. Rows for other roles are ignored.
pub fn template_role_script(role: &Role, permissions: &[RolePermission]) -> String {
    let mut lines = vec![
        format!("-- SQL to create template role: {}", comment_text(&role.name)),
        format!(
            "INSERT INTO Roles (RoleName, Status)\nVALUES ({}, {});",
            quote_literal(&role.name),
            role.status
        ),
        String::new(),
        format!("DECLARE {ROLE_ID} INT = SCOPE_IDENTITY();"),
        String::new(),
    ];

    let targets: Vec<PermissionTarget> = permissions
        .iter()
        .filter(|p| p.role_id == role.id)
        .filter_map(RolePermission::classify)
        .collect();

    let grouped = [
        PermissionLevel::Module,
        PermissionLevel::Page,
        PermissionLevel::Operation,
    ]
    .into_iter()
    .flat_map(|level| targets.iter().copied().filter(move |t| t.level() == level));

    push_grant_sections(&mut lines, ROLE_ID, TABLE, grouped);

    lines.join("\n")
}

/// Concatenated scripts for every template role in `roles`.
pub fn all_templates_script(roles: &[Role], permissions: &[RolePermission]) -> String {
    let mut script = String::from("-- SQL to recreate all template roles\n\n");
    for role in roles.iter().filter(|r| r.is_template) {
        script.push_str(&template_role_script(role, permissions));
        script.push_str("\n\n");
    }
    script
}
