//! Integration tests for permission-gated administration.

mod common;

use common::{Fixture, PASSWORD};
use gatehouse_core::error::GatehouseError;
use gatehouse_core::models::identity::AuthenticatedIdentity;
use gatehouse_core::models::module::CreateModule;
use gatehouse_core::models::permission::CreatePermission;
use gatehouse_core::models::role::{CreateRole, UpdateRole};
use gatehouse_core::models::user::{NewUser, UserPatch};
use gatehouse_core::repository::ListQuery;
use uuid::Uuid;

async fn identity(fx: &Fixture, username: &str, role_id: Uuid) -> AuthenticatedIdentity {
    let user_id = fx.user(username, role_id).await;
    fx.authenticator()
        .authenticate(Some(&fx.bearer(user_id)))
        .await
        .unwrap()
}

fn new_user(username: &str, role_id: Uuid) -> NewUser {
    NewUser {
        first_name: "New".into(),
        last_name: "User".into(),
        email: format!("{username}@example.com"),
        username: username.into(),
        password: PASSWORD.into(),
        role_id,
        profile_image: None,
        dark_mode: false,
        password_expires_at: None,
    }
}

#[tokio::test]
async fn viewer_can_list_but_not_mutate_users() {
    let fx = Fixture::new().await;
    let viewer = identity(&fx, "viewer", fx.viewer).await;
    let target = fx.user("target", fx.nobody).await;
    let admin = fx.admin();

    let page = admin
        .list_users(&viewer, ListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);

    let create = admin
        .create_user(&viewer, new_user("intruder", fx.nobody))
        .await;
    assert!(matches!(create, Err(GatehouseError::Forbidden)));

    let remove = admin.remove_user(&viewer, &target.to_string()).await;
    assert!(matches!(remove, Err(GatehouseError::Forbidden)));

    let still_there = admin
        .get_user(&viewer, &target.to_string(), false)
        .await
        .unwrap();
    assert!(still_there.user.is_live());
    assert_eq!(admin.list_users(&viewer, ListQuery::default()).await.unwrap().total, 2);
}

#[tokio::test]
async fn role_without_permissions_is_denied_everything() {
    let fx = Fixture::new().await;
    let nobody = identity(&fx, "nobody", fx.nobody).await;
    let admin = fx.admin();

    assert!(matches!(
        admin.list_users(&nobody, ListQuery::default()).await,
        Err(GatehouseError::Forbidden)
    ));
    assert!(matches!(
        admin.list_roles(&nobody, ListQuery::default()).await,
        Err(GatehouseError::Forbidden)
    ));
    assert!(matches!(
        admin.list_modules(&nobody, ListQuery::default()).await,
        Err(GatehouseError::Forbidden)
    ));
}

#[tokio::test]
async fn viewer_cannot_read_role_permissions() {
    let fx = Fixture::new().await;
    let viewer = identity(&fx, "viewer", fx.viewer).await;

    let result = fx
        .admin()
        .role_permissions(&viewer, &fx.viewer.to_string())
        .await;
    assert!(matches!(result, Err(GatehouseError::Forbidden)));
}

#[tokio::test]
async fn administrator_manages_the_user_lifecycle() {
    let fx = Fixture::new().await;
    let root = identity(&fx, "root", fx.administrator).await;
    let admin = fx.admin();

    let created = admin
        .create_user(&root, new_user("grace", fx.viewer))
        .await
        .unwrap();
    let id = created.user.id.to_string();
    assert_eq!(created.role.as_deref(), Some("Viewer"));

    let updated = admin
        .update_user(
            &root,
            &id,
            UserPatch {
                first_name: Some("Grace".into()),
                role_id: Some(fx.nobody),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.user.first_name, "Grace");
    assert_eq!(updated.role_id, Some(fx.nobody));

    let removed = admin.remove_user(&root, &id).await.unwrap();
    assert!(removed.user.is_deleted());
    assert!(!removed.user.is_active);
    assert!(matches!(
        admin.get_user(&root, &id, false).await,
        Err(GatehouseError::NotFound { .. })
    ));
    assert!(admin.get_user(&root, &id, true).await.is_ok());

    let restored = admin.restore_user(&root, &id).await.unwrap();
    assert!(restored.user.is_live());
    assert_eq!(restored.role_id, Some(fx.nobody));
}

#[tokio::test]
async fn administrator_manages_the_catalog() {
    let fx = Fixture::new().await;
    let root = identity(&fx, "root", fx.administrator).await;
    let admin = fx.admin();

    let module = admin
        .create_module(
            &root,
            CreateModule {
                name: "reporting".into(),
                description: Some("Reports".into()),
            },
        )
        .await
        .unwrap();
    let permission = admin
        .create_permission(
            &root,
            CreatePermission {
                name: "reporting.reports.view".into(),
                description: String::new(),
                module_id: module.id,
            },
        )
        .await
        .unwrap();
    let role = admin
        .create_role(
            &root,
            CreateRole {
                name: "Analyst".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
    let role_id = role.id.to_string();
    let permission_id = permission.id.to_string();

    admin
        .grant_permission(&root, &role_id, &permission_id)
        .await
        .unwrap();
    let granted = admin.role_permissions(&root, &role_id).await.unwrap();
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].name, "reporting.reports.view");

    let renamed = admin
        .update_role(
            &root,
            &role_id,
            UpdateRole {
                name: Some("Reporting Analyst".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Reporting Analyst");

    admin
        .revoke_permission(&root, &role_id, &permission_id)
        .await
        .unwrap();
    assert!(admin.role_permissions(&root, &role_id).await.unwrap().is_empty());

    let deleted = admin.delete_module(&root, &module.id.to_string()).await.unwrap();
    assert!(deleted.deleted_at.is_some());
    let restored = admin
        .restore_module(&root, &module.id.to_string())
        .await
        .unwrap();
    assert!(restored.deleted_at.is_none());
}

#[tokio::test]
async fn malformed_id_is_invalid_argument() {
    let fx = Fixture::new().await;
    let root = identity(&fx, "root", fx.administrator).await;

    let result = fx.admin().get_user(&root, "not-a-uuid", false).await;
    assert!(matches!(result, Err(GatehouseError::InvalidArgument { .. })));
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let fx = Fixture::new().await;
    let root = identity(&fx, "root", fx.administrator).await;
    let missing = Uuid::new_v4().to_string();
    let admin = fx.admin();

    assert!(matches!(
        admin.get_user(&root, &missing, false).await,
        Err(GatehouseError::NotFound { .. })
    ));
    assert!(matches!(
        admin.remove_user(&root, &missing).await,
        Err(GatehouseError::NotFound { .. })
    ));
}

#[tokio::test]
async fn denial_happens_before_argument_parsing() {
    let fx = Fixture::new().await;
    let nobody = identity(&fx, "nobody", fx.nobody).await;

    let result = fx.admin().remove_user(&nobody, "not-a-uuid").await;
    assert!(matches!(result, Err(GatehouseError::Forbidden)));
}
