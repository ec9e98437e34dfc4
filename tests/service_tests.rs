//! 服务层集成测试

use role_manager::{
    error::AppError,
    models::{
        CloneRoleRequest, CreateRoleRequest, PermissionTarget, PreviewPermissionsRequest,
        UpdateRoleRequest,
    },
    permissions::{PermissionSelection, SelectionChange},
    services::RoleService,
    sql::NO_CHANGES,
};

mod common;
use common::{create_test_config, create_test_role, SUPER_USER_ROLE_ID, USER_ROLE_ID};

async fn service() -> (RoleService, sqlx::SqlitePool) {
    let pool = common::setup_test_db(&create_test_config()).await;
    (RoleService::new(pool.clone()), pool)
}

fn preview_request(selection: &PermissionSelection, name: Option<&str>) -> PreviewPermissionsRequest {
    PreviewPermissionsRequest {
        selection: selection.clone(),
        name: name.map(str::to_string),
    }
}

fn selection(targets: &[PermissionTarget]) -> PermissionSelection {
    let mut selection = PermissionSelection::default();
    for target in targets {
        selection.set(*target, true);
    }
    selection
}

// ==================== Listing ====================

#[tokio::test]
async fn test_list_roles_templates_first() {
    let (service, pool) = service().await;
    create_test_role(&pool, "auditor", &[]).await.unwrap();
    create_test_role(&pool, "Accounts", &[PermissionTarget::Module(1)]).await.unwrap();

    let roles = service.list_roles(None).await.unwrap();
    let names: Vec<&str> = roles.iter().map(|r| r.role.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["eManagerAdministrator", "SuperUser", "User", "Accounts", "auditor"]
    );

    let super_user = &roles[1];
    assert_eq!(super_user.permission_count, 4);
    assert_eq!(super_user.user_count, 2);
}

#[tokio::test]
async fn test_list_roles_filter() {
    let (service, _pool) = service().await;

    let roles = service.list_roles(Some("USER")).await.unwrap();
    let names: Vec<&str> = roles.iter().map(|r| r.role.name.as_str()).collect();
    assert_eq!(names, vec!["SuperUser", "User"]);
}

#[tokio::test]
async fn test_role_detail_seeds_selection() {
    let (service, _pool) = service().await;

    let detail = service.get_role_detail(USER_ROLE_ID).await.unwrap();
    assert_eq!(detail.permissions.len(), 2);
    assert_eq!(detail.user_count, 1);
    assert!(detail.selection.is_page_checked(1));
    assert!(detail.selection.is_operation_checked(1));
    assert!(!detail.selection.is_module_checked(1));

    assert!(matches!(
        service.get_role_detail(9999).await,
        Err(AppError::NotFound(_))
    ));
}

// ==================== Create / update / delete ====================

#[tokio::test]
async fn test_create_role_and_preview() {
    let (service, _pool) = service().await;
    let req = || CreateRoleRequest {
        name: "  Warehouse clerk ".to_string(),
        status: 0,
        selection: selection(&[
            PermissionTarget::Module(5),
            PermissionTarget::Page(15),
            PermissionTarget::Page(17),
        ]),
    };

    let sql = service.preview_create_role(&req()).await.unwrap();
    assert!(sql.contains("VALUES ('Warehouse clerk', 0);"));
    assert!(sql.contains("VALUES (@NewRoleId, NULL, 5, NULL);"));

    let role = service.create_role(req()).await.unwrap();
    assert_eq!(role.name, "Warehouse clerk");

    let detail = service.get_role_detail(role.id).await.unwrap();
    assert_eq!(detail.permissions.len(), 3);
}

#[tokio::test]
async fn test_create_role_rejects_blank_and_unknown() {
    let (service, _pool) = service().await;

    let blank = service
        .create_role(CreateRoleRequest {
            name: "   ".to_string(),
            status: 0,
            selection: PermissionSelection::default(),
        })
        .await;
    assert!(matches!(blank, Err(AppError::Validation(_))));

    let unknown = service
        .create_role(CreateRoleRequest {
            name: "Ghost grants".to_string(),
            status: 0,
            selection: selection(&[PermissionTarget::Page(999)]),
        })
        .await;
    assert!(matches!(unknown, Err(AppError::Validation(msg)) if msg.contains("page 999")));
}

#[tokio::test]
async fn test_template_roles_are_read_only() {
    let (service, _pool) = service().await;

    let update = service
        .update_role(
            SUPER_USER_ROLE_ID,
            UpdateRoleRequest {
                name: Some("Renamed".to_string()),
                status: None,
            },
        )
        .await;
    assert!(matches!(update, Err(AppError::Validation(_))));

    let delete = service.delete_role(SUPER_USER_ROLE_ID).await;
    assert!(matches!(delete, Err(AppError::Validation(_))));

    let apply = service
        .apply_permissions(SUPER_USER_ROLE_ID, &PermissionSelection::default())
        .await;
    assert!(matches!(apply, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_update_role_name() {
    let (service, pool) = service().await;
    let role_id = create_test_role(&pool, "Day shift", &[]).await.unwrap();

    let role = service
        .update_role(
            role_id,
            UpdateRoleRequest {
                name: Some(" Early shift ".to_string()),
                status: Some(1),
            },
        )
        .await
        .unwrap();
    assert_eq!(role.name, "Early shift");
    assert_eq!(role.status, 1);
}

#[tokio::test]
async fn test_delete_role_with_users_is_conflict() {
    let (service, pool) = service().await;
    let role_id = create_test_role(&pool, "Packer", &[PermissionTarget::Page(3)]).await.unwrap();
    common::assign_role_to_user(&pool, 200, role_id).await.unwrap();

    assert!(matches!(
        service.delete_role(role_id).await,
        Err(AppError::Conflict(_))
    ));

    let free_id = create_test_role(&pool, "Unused", &[PermissionTarget::Page(3)]).await.unwrap();
    service.delete_role(free_id).await.unwrap();
    assert!(matches!(
        service.get_role_detail(free_id).await,
        Err(AppError::NotFound(_))
    ));
}

// ==================== Permissions ====================

#[tokio::test]
async fn test_preview_is_empty_for_unchanged_selection() {
    let (service, _pool) = service().await;

    let detail = service.get_role_detail(SUPER_USER_ROLE_ID).await.unwrap();
    let preview = service
        .preview_permission_changes(SUPER_USER_ROLE_ID, &preview_request(&detail.selection, None))
        .await
        .unwrap();

    assert!(preview.change_set.is_empty());
    assert_eq!(preview.sql, NO_CHANGES);

    // 名称未变化时不生成改名语句
    let same_name = service
        .preview_permission_changes(
            SUPER_USER_ROLE_ID,
            &preview_request(&detail.selection, Some("SuperUser")),
        )
        .await
        .unwrap();
    assert_eq!(same_name.sql, NO_CHANGES);
}

#[tokio::test]
async fn test_preview_rejects_empty_name() {
    let (service, _pool) = service().await;

    let result = service
        .preview_permission_changes(
            SUPER_USER_ROLE_ID,
            &preview_request(&PermissionSelection::default(), Some("")),
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_preview_matches_apply() {
    let (service, pool) = service().await;
    let role_id = create_test_role(&pool, "Receiver", &[PermissionTarget::Module(2)]).await.unwrap();
    let target = selection(&[PermissionTarget::Page(15), PermissionTarget::Operation(57)]);

    let preview = service
        .preview_permission_changes(role_id, &preview_request(&target, Some("Goods receiver")))
        .await
        .unwrap();
    assert!(preview.sql.starts_with("-- Rename role\nUPDATE ROLES SET RoleName = 'Goods receiver'"));
    assert!(preview.sql.contains("DELETE FROM ROLEPERMISSIONS WHERE RolePermissionId ="));

    let applied = service.apply_permissions(role_id, &target).await.unwrap();
    assert_eq!(applied, preview.change_set);

    let after = service
        .preview_permission_changes(role_id, &preview_request(&target, None))
        .await
        .unwrap();
    assert!(after.change_set.is_empty());
}

// ==================== Clone ====================

#[tokio::test]
async fn test_clone_default_name_and_preview() {
    let (service, _pool) = service().await;

    let sql = service
        .preview_clone(SUPER_USER_ROLE_ID, &CloneRoleRequest::default())
        .await
        .unwrap();
    assert!(sql.starts_with("-- Clone role: Copy of SuperUser from role ID: 2"));

    let clone = service
        .clone_role(SUPER_USER_ROLE_ID, CloneRoleRequest::default())
        .await
        .unwrap();
    assert_eq!(clone.name, "Copy of SuperUser");
    assert!(!clone.is_template);

    // 克隆后的授权与源角色一致
    let source = service.get_role_detail(SUPER_USER_ROLE_ID).await.unwrap();
    let preview = service
        .preview_permission_changes(clone.id, &preview_request(&source.selection, None))
        .await
        .unwrap();
    assert!(preview.change_set.is_empty());
}

#[tokio::test]
async fn test_clone_missing_source() {
    let (service, _pool) = service().await;

    let result = service
        .clone_role(
            9999,
            CloneRoleRequest {
                name: Some("Ghost".to_string()),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_clone_with_taken_name_is_conflict() {
    let (service, _pool) = service().await;

    let result = service
        .clone_role(
            SUPER_USER_ROLE_ID,
            CloneRoleRequest {
                name: Some("User".to_string()),
            },
        )
        .await;
    assert!(matches!(&result, Err(AppError::Conflict(_))));

    let message = result.unwrap_err().user_message();
    assert_eq!(message, "Role name 'User' already exists");
    assert!(!message.contains("UNIQUE"));
}

// ==================== Selection ====================

#[tokio::test]
async fn test_apply_selection_change() {
    let (service, _pool) = service().await;

    let outcome = service
        .apply_selection_change(
            PermissionSelection::default(),
            SelectionChange::Module { id: 5, checked: true },
        )
        .await
        .unwrap();

    let granted = outcome.selection.granted();
    assert_eq!(granted.module_ids, vec![5]);
    assert_eq!(granted.page_ids, vec![15, 17]);
    assert_eq!(granted.operation_ids, vec![57, 58]);
    assert!(!outcome.all_selected);

    let all = service
        .apply_selection_change(outcome.selection, SelectionChange::All { checked: true })
        .await
        .unwrap();
    assert!(all.all_selected);

    let unknown = service
        .apply_selection_change(
            PermissionSelection::default(),
            SelectionChange::Page { id: 999, checked: true },
        )
        .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}

// ==================== Templates ====================

#[tokio::test]
async fn test_template_sql() {
    let (service, pool) = service().await;

    let sql = service.template_sql(USER_ROLE_ID).await.unwrap();
    assert!(sql.starts_with("-- SQL to create template role: User"));
    assert!(sql.contains("VALUES (@RoleId, 1, NULL, NULL);"));
    assert!(sql.contains("VALUES (@RoleId, NULL, NULL, 1);"));

    let regular = create_test_role(&pool, "Regular", &[]).await.unwrap();
    assert!(matches!(
        service.template_sql(regular).await,
        Err(AppError::Validation(_))
    ));

    let all = service.all_templates_sql().await.unwrap();
    assert_eq!(all.matches("-- SQL to create template role:").count(), 3);
    assert!(!all.contains("Regular"));
}
