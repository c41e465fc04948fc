//! Flattens a user's authorization graph into permission names.

use crate::models::identity::{PermissionSet, UserGraph};

/// Collect the names of every live permission granted to the user's
/// current role.
///
/// No current role, a soft-deleted role, or a role without grants all
/// resolve to the empty set. That is a fully authenticated user with no
/// authority, not an error.
pub fn resolve_permissions(graph: &UserGraph) -> PermissionSet {
    let Some(grants) = &graph.role else {
        return PermissionSet::new();
    };
    if grants.role.deleted_at.is_some() {
        return PermissionSet::new();
    }

    grants
        .permissions
        .iter()
        .filter(|permission| permission.deleted_at.is_none())
        .map(|permission| permission.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::identity::RoleGrants;
    use crate::models::permission::Permission;
    use crate::models::role::Role;
    use crate::models::user::User;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: "grace@example.com".into(),
            username: "grace".into(),
            password_hash: String::new(),
            is_active: true,
            profile_image: None,
            dark_mode: false,
            password_expires_at: None,
            must_change_password: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn role(name: &str) -> Role {
        let now = Utc::now();
        Role {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn permission(name: &str) -> Permission {
        let now = Utc::now();
        Permission {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            module_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn user_without_role_has_no_permissions() {
        let graph = UserGraph {
            user: user(),
            role: None,
        };
        assert!(resolve_permissions(&graph).is_empty());
    }

    #[test]
    fn role_without_grants_has_no_permissions() {
        let graph = UserGraph {
            user: user(),
            role: Some(RoleGrants {
                role: role("empty"),
                permissions: vec![],
            }),
        };
        assert!(resolve_permissions(&graph).is_empty());
    }

    #[test]
    fn collects_and_deduplicates_names() {
        let graph = UserGraph {
            user: user(),
            role: Some(RoleGrants {
                role: role("editor"),
                permissions: vec![
                    permission("users.view"),
                    permission("users.delete"),
                    permission("users.view"),
                ],
            }),
        };

        let resolved = resolve_permissions(&graph);
        assert_eq!(resolved.len(), 2);
        assert!(resolved.contains("users.view"));
        assert!(resolved.contains("users.delete"));
    }

    #[test]
    fn soft_deleted_role_grants_nothing() {
        let mut deleted = role("retired");
        deleted.deleted_at = Some(Utc::now());
        let graph = UserGraph {
            user: user(),
            role: Some(RoleGrants {
                role: deleted,
                permissions: vec![permission("users.view")],
            }),
        };
        assert!(resolve_permissions(&graph).is_empty());
    }

    #[test]
    fn soft_deleted_permission_is_skipped() {
        let mut gone = permission("users.delete");
        gone.deleted_at = Some(Utc::now());
        let graph = UserGraph {
            user: user(),
            role: Some(RoleGrants {
                role: role("editor"),
                permissions: vec![permission("users.view"), gone],
            }),
        };

        let resolved = resolve_permissions(&graph);
        assert_eq!(resolved.iter().collect::<Vec<_>>(), vec!["users.view"]);
    }
}
