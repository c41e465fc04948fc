//! Idempotent seeding of the administration catalog and the first
//! administrator account.

use std::collections::HashSet;

use gatehouse_auth::permissions;
use gatehouse_core::error::{GatehouseError, GatehouseResult};
use gatehouse_core::models::module::CreateModule;
use gatehouse_core::models::permission::CreatePermission;
use gatehouse_core::models::role::{CreateRole, Role};
use gatehouse_core::models::user::NewUser;
use gatehouse_core::password::PasswordHasher;
use gatehouse_core::repository::{
    ModuleRepository, PermissionRepository, RoleAssignmentManager, RoleRepository,
    UserRepository,
};
use gatehouse_db::{
    SurrealModuleRepository, SurrealPermissionRepository, SurrealRoleAssignmentManager,
    SurrealRoleRepository, SurrealUserRepository, TransactionConfig,
};
use surrealdb::{Connection, Surreal};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::BootstrapAdmin;

pub const ADMINISTRATOR_ROLE: &str = "Administrator";

/// Ensure the `system-administration` module, its permissions and an
/// `Administrator` role holding all of them exist and are live, then
/// create the bootstrap account if neither its username nor its email is
/// taken.
///
/// Catalog rows that were soft-deleted are restored rather than created
/// again, since their names stay reserved.
///
/// Returns the administrator role.
pub async fn seed<C: Connection, H: PasswordHasher>(
    db: &Surreal<C>,
    hasher: H,
    transactions: TransactionConfig,
    admin: Option<&BootstrapAdmin>,
) -> GatehouseResult<Role> {
    let modules = SurrealModuleRepository::new(db.clone());
    let perms = SurrealPermissionRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());

    let module = match modules.get_by_name(permissions::MODULE, true).await? {
        Some(module) if module.deleted_at.is_some() => {
            warn!(module_id = %module.id, "restoring soft-deleted administration module");
            modules.restore(module.id).await?
        }
        Some(module) => module,
        None => {
            modules
                .create(CreateModule {
                    name: permissions::MODULE.into(),
                    description: Some("Users, roles, permissions and modules".into()),
                })
                .await?
        }
    };

    let role = match roles.get_by_name(ADMINISTRATOR_ROLE, true).await? {
        Some(role) if role.deleted_at.is_some() => {
            warn!(role_id = %role.id, "restoring soft-deleted administrator role");
            roles.restore(role.id).await?
        }
        Some(role) => role,
        None => {
            roles
                .create(CreateRole {
                    name: ADMINISTRATOR_ROLE.into(),
                    description: "Full access to system administration".into(),
                })
                .await?
        }
    };

    let mut required = Vec::with_capacity(permissions::ALL.len());
    for name in permissions::ALL {
        let permission = match perms.get_by_name(name, true).await? {
            Some(permission) if permission.deleted_at.is_some() => {
                warn!(permission_id = %permission.id, %name, "restoring soft-deleted permission");
                perms.restore(permission.id).await?
            }
            Some(permission) => permission,
            None => {
                perms
                    .create(CreatePermission {
                        name: (*name).into(),
                        description: String::new(),
                        module_id: module.id,
                    })
                    .await?
            }
        };
        required.push(permission);
    }

    // Restored permissions keep their grants, so read them only now.
    let granted: HashSet<Uuid> = roles
        .permissions_of(role.id)
        .await?
        .into_iter()
        .map(|permission| permission.id)
        .collect();
    for permission in required {
        if !granted.contains(&permission.id) {
            roles.grant_permission(role.id, permission.id).await?;
        }
    }

    if let Some(admin) = admin {
        seed_admin(db, hasher, transactions, admin, &role).await?;
    }

    info!(role_id = %role.id, "administration catalog ready");
    Ok(role)
}

async fn seed_admin<C: Connection, H: PasswordHasher>(
    db: &Surreal<C>,
    hasher: H,
    transactions: TransactionConfig,
    admin: &BootstrapAdmin,
    role: &Role,
) -> GatehouseResult<()> {
    let users = SurrealUserRepository::new(db.clone());
    if users.find_by_username(&admin.username).await?.is_some()
        || users.find_by_email(&admin.email).await?.is_some()
    {
        return Ok(());
    }

    let created = SurrealRoleAssignmentManager::new(db.clone(), hasher, transactions)
        .create(NewUser {
            first_name: admin.first_name.clone(),
            last_name: admin.last_name.clone(),
            email: admin.email.clone(),
            username: admin.username.clone(),
            password: admin.password.clone(),
            role_id: role.id,
            profile_image: None,
            dark_mode: false,
            password_expires_at: None,
        })
        .await;

    match created {
        Ok(created) => {
            info!(user_id = %created.user.id, username = %admin.username, "bootstrap administrator created");
            Ok(())
        }
        // A soft-deleted account still reserves its username and email.
        Err(GatehouseError::Conflict { field, .. }) => {
            warn!(username = %admin.username, %field, "bootstrap account is reserved by a deleted user, skipping");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_auth::Argon2PasswordHasher;
    use surrealdb::engine::local::Mem;

    use super::*;

    fn admin() -> BootstrapAdmin {
        BootstrapAdmin {
            first_name: "Root".into(),
            last_name: "Admin".into(),
            email: "root@example.com".into(),
            username: "root".into(),
            password: "correct horse battery".into(),
        }
    }

    #[tokio::test]
    async fn seeding_twice_is_harmless() {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        gatehouse_db::run_migrations(&db).await.unwrap();
        let admin = admin();

        let first = seed(
            &db,
            Argon2PasswordHasher::default(),
            TransactionConfig::default(),
            Some(&admin),
        )
        .await
        .unwrap();
        let second = seed(
            &db,
            Argon2PasswordHasher::default(),
            TransactionConfig::default(),
            Some(&admin),
        )
        .await
        .unwrap();
        assert_eq!(first.id, second.id);

        let roles = SurrealRoleRepository::new(db.clone());
        assert_eq!(
            roles.permissions_of(first.id).await.unwrap().len(),
            permissions::ALL.len()
        );

        let users = SurrealUserRepository::new(db.clone());
        let root = users
            .find_by_username("root")
            .await
            .unwrap()
            .expect("bootstrap admin");
        assert!(root.must_change_password);
        let listed = users.list(Default::default()).await.unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].role.as_deref(), Some(ADMINISTRATOR_ROLE));
    }

    #[tokio::test]
    async fn soft_deleted_catalog_rows_are_restored() {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        gatehouse_db::run_migrations(&db).await.unwrap();
        let admin = admin();

        let role = seed(
            &db,
            Argon2PasswordHasher::default(),
            TransactionConfig::default(),
            Some(&admin),
        )
        .await
        .unwrap();

        let roles = SurrealRoleRepository::new(db.clone());
        let perms = SurrealPermissionRepository::new(db.clone());
        let modules = SurrealModuleRepository::new(db.clone());
        let users_view = perms
            .get_by_name(permissions::USERS_VIEW, false)
            .await
            .unwrap()
            .unwrap();
        perms.delete(users_view.id).await.unwrap();
        roles.delete(role.id).await.unwrap();
        let module = modules
            .get_by_name(permissions::MODULE, false)
            .await
            .unwrap()
            .unwrap();
        modules.delete(module.id).await.unwrap();
        let manager = SurrealRoleAssignmentManager::new(
            db.clone(),
            Argon2PasswordHasher::default(),
            TransactionConfig::default(),
        );
        let root = SurrealUserRepository::new(db.clone())
            .find_by_username("root")
            .await
            .unwrap()
            .unwrap();
        manager.remove(root.id).await.unwrap();

        let reseeded = seed(
            &db,
            Argon2PasswordHasher::default(),
            TransactionConfig::default(),
            Some(&admin),
        )
        .await
        .unwrap();

        assert_eq!(reseeded.id, role.id);
        assert!(reseeded.deleted_at.is_none());
        assert!(modules.get_by_id(module.id, false).await.is_ok());
        let granted = roles.permissions_of(role.id).await.unwrap();
        assert_eq!(granted.len(), permissions::ALL.len());
        assert!(granted.iter().any(|p| p.id == users_view.id));

        // The deleted account is left alone.
        let users = SurrealUserRepository::new(db.clone());
        assert!(users.find_by_username("root").await.unwrap().is_none());
        assert!(users.find_by_id(root.id, true).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn catalog_is_seeded_without_an_account() {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        gatehouse_db::run_migrations(&db).await.unwrap();

        seed(
            &db,
            Argon2PasswordHasher::default(),
            TransactionConfig::default(),
            None,
        )
        .await
        .unwrap();

        let users = SurrealUserRepository::new(db.clone());
        assert_eq!(users.list(Default::default()).await.unwrap().total, 0);
        assert!(
            SurrealModuleRepository::new(db)
                .get_by_name(permissions::MODULE, false)
                .await
                .unwrap()
                .is_some()
        );
    }
}
