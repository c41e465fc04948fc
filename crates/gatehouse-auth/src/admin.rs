//! Permission-gated administration of users, roles, permissions and
//! modules.
//!
//! Every method enforces its declared requirement before touching
//! storage. Identifiers arrive as text (path segments) and a malformed
//! one fails with `InvalidArgument`.

use gatehouse_core::error::{GatehouseError, GatehouseResult, parse_id};
use gatehouse_core::models::identity::AuthenticatedIdentity;
use gatehouse_core::models::module::{CreateModule, Module, UpdateModule};
use gatehouse_core::models::permission::{CreatePermission, Permission, UpdatePermission};
use gatehouse_core::models::role::{CreateRole, Role, UpdateRole};
use gatehouse_core::models::user::{NewUser, UserPatch, UserWithRole};
use gatehouse_core::repository::{
    ListQuery, ModuleRepository, Page, PermissionRepository, RoleAssignmentManager,
    RoleRepository, UserRepository,
};

use crate::guard::{Requirement, enforce};
use crate::permissions;

fn require(identity: &AuthenticatedIdentity, name: &'static str) -> GatehouseResult<()> {
    enforce(identity, &Requirement::single(name))
}

pub struct AdminService<U, A, R, P, M> {
    users: U,
    assignments: A,
    roles: R,
    permissions: P,
    modules: M,
}

impl<U, A, R, P, M> AdminService<U, A, R, P, M>
where
    U: UserRepository,
    A: RoleAssignmentManager,
    R: RoleRepository,
    P: PermissionRepository,
    M: ModuleRepository,
{
    pub fn new(users: U, assignments: A, roles: R, permissions: P, modules: M) -> Self {
        Self {
            users,
            assignments,
            roles,
            permissions,
            modules,
        }
    }

    // -- users ------------------------------------------------------------

    pub async fn list_users(
        &self,
        identity: &AuthenticatedIdentity,
        query: ListQuery,
    ) -> GatehouseResult<Page<UserWithRole>> {
        require(identity, permissions::USERS_VIEW)?;
        self.users.list(query).await
    }

    pub async fn get_user(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
        include_deleted: bool,
    ) -> GatehouseResult<UserWithRole> {
        require(identity, permissions::USERS_VIEW)?;
        let id = parse_id(id)?;
        self.users
            .find_with_role(id, include_deleted)
            .await?
            .ok_or_else(|| GatehouseError::not_found("user", id))
    }

    pub async fn create_user(
        &self,
        identity: &AuthenticatedIdentity,
        input: NewUser,
    ) -> GatehouseResult<UserWithRole> {
        require(identity, permissions::USERS_CREATE)?;
        self.assignments.create(input).await
    }

    pub async fn update_user(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
        patch: UserPatch,
    ) -> GatehouseResult<UserWithRole> {
        require(identity, permissions::USERS_UPDATE)?;
        self.assignments.update(parse_id(id)?, patch).await
    }

    pub async fn remove_user(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
    ) -> GatehouseResult<UserWithRole> {
        require(identity, permissions::USERS_DELETE)?;
        self.assignments.remove(parse_id(id)?).await
    }

    pub async fn restore_user(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
    ) -> GatehouseResult<UserWithRole> {
        require(identity, permissions::USERS_UPDATE)?;
        self.assignments.restore(parse_id(id)?).await
    }

    // -- roles ------------------------------------------------------------

    pub async fn list_roles(
        &self,
        identity: &AuthenticatedIdentity,
        query: ListQuery,
    ) -> GatehouseResult<Page<Role>> {
        require(identity, permissions::ROLES_VIEW)?;
        self.roles.list(query).await
    }

    pub async fn get_role(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
        include_deleted: bool,
    ) -> GatehouseResult<Role> {
        require(identity, permissions::ROLES_VIEW)?;
        self.roles.get_by_id(parse_id(id)?, include_deleted).await
    }

    pub async fn create_role(
        &self,
        identity: &AuthenticatedIdentity,
        input: CreateRole,
    ) -> GatehouseResult<Role> {
        require(identity, permissions::ROLES_CREATE)?;
        self.roles.create(input).await
    }

    pub async fn update_role(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
        input: UpdateRole,
    ) -> GatehouseResult<Role> {
        require(identity, permissions::ROLES_UPDATE)?;
        self.roles.update(parse_id(id)?, input).await
    }

    pub async fn delete_role(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
    ) -> GatehouseResult<Role> {
        require(identity, permissions::ROLES_DELETE)?;
        self.roles.delete(parse_id(id)?).await
    }

    pub async fn restore_role(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
    ) -> GatehouseResult<Role> {
        require(identity, permissions::ROLES_UPDATE)?;
        self.roles.restore(parse_id(id)?).await
    }

    pub async fn role_permissions(
        &self,
        identity: &AuthenticatedIdentity,
        role_id: &str,
    ) -> GatehouseResult<Vec<Permission>> {
        enforce(
            identity,
            &Requirement::all([permissions::ROLES_VIEW, permissions::PERMISSIONS_VIEW]),
        )?;
        self.roles.permissions_of(parse_id(role_id)?).await
    }

    pub async fn grant_permission(
        &self,
        identity: &AuthenticatedIdentity,
        role_id: &str,
        permission_id: &str,
    ) -> GatehouseResult<()> {
        require(identity, permissions::ROLES_UPDATE)?;
        self.roles
            .grant_permission(parse_id(role_id)?, parse_id(permission_id)?)
            .await
    }

    pub async fn revoke_permission(
        &self,
        identity: &AuthenticatedIdentity,
        role_id: &str,
        permission_id: &str,
    ) -> GatehouseResult<()> {
        require(identity, permissions::ROLES_UPDATE)?;
        self.roles
            .revoke_permission(parse_id(role_id)?, parse_id(permission_id)?)
            .await
    }

    // -- permissions ------------------------------------------------------

    pub async fn list_permissions(
        &self,
        identity: &AuthenticatedIdentity,
        query: ListQuery,
    ) -> GatehouseResult<Page<Permission>> {
        require(identity, permissions::PERMISSIONS_VIEW)?;
        self.permissions.list(query).await
    }

    pub async fn get_permission(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
        include_deleted: bool,
    ) -> GatehouseResult<Permission> {
        require(identity, permissions::PERMISSIONS_VIEW)?;
        self.permissions
            .get_by_id(parse_id(id)?, include_deleted)
            .await
    }

    pub async fn create_permission(
        &self,
        identity: &AuthenticatedIdentity,
        input: CreatePermission,
    ) -> GatehouseResult<Permission> {
        require(identity, permissions::PERMISSIONS_CREATE)?;
        self.permissions.create(input).await
    }

    pub async fn update_permission(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
        input: UpdatePermission,
    ) -> GatehouseResult<Permission> {
        require(identity, permissions::PERMISSIONS_UPDATE)?;
        self.permissions.update(parse_id(id)?, input).await
    }

    pub async fn delete_permission(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
    ) -> GatehouseResult<Permission> {
        require(identity, permissions::PERMISSIONS_DELETE)?;
        self.permissions.delete(parse_id(id)?).await
    }

    pub async fn restore_permission(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
    ) -> GatehouseResult<Permission> {
        require(identity, permissions::PERMISSIONS_UPDATE)?;
        self.permissions.restore(parse_id(id)?).await
    }

    // -- modules ----------------------------------------------------------

    pub async fn list_modules(
        &self,
        identity: &AuthenticatedIdentity,
        query: ListQuery,
    ) -> GatehouseResult<Page<Module>> {
        require(identity, permissions::MODULES_VIEW)?;
        self.modules.list(query).await
    }

    pub async fn get_module(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
        include_deleted: bool,
    ) -> GatehouseResult<Module> {
        require(identity, permissions::MODULES_VIEW)?;
        self.modules.get_by_id(parse_id(id)?, include_deleted).await
    }

    pub async fn create_module(
        &self,
        identity: &AuthenticatedIdentity,
        input: CreateModule,
    ) -> GatehouseResult<Module> {
        require(identity, permissions::MODULES_CREATE)?;
        self.modules.create(input).await
    }

    pub async fn update_module(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
        input: UpdateModule,
    ) -> GatehouseResult<Module> {
        require(identity, permissions::MODULES_UPDATE)?;
        self.modules.update(parse_id(id)?, input).await
    }

    pub async fn delete_module(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
    ) -> GatehouseResult<Module> {
        require(identity, permissions::MODULES_DELETE)?;
        self.modules.delete(parse_id(id)?).await
    }

    pub async fn restore_module(
        &self,
        identity: &AuthenticatedIdentity,
        id: &str,
    ) -> GatehouseResult<Module> {
        require(identity, permissions::MODULES_UPDATE)?;
        self.modules.restore(parse_id(id)?).await
    }
}
