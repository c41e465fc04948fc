//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The user-facing Identity Store
//! lookups return `Option` and leave error semantics to the caller;
//! administrative operations on a specific id fail with `NotFound`.

use uuid::Uuid;

use crate::error::{GatehouseError, GatehouseResult};
use crate::models::{
    identity::UserGraph,
    module::{CreateModule, Module, UpdateModule},
    permission::{CreatePermission, Permission, UpdatePermission},
    role::{CreateRole, Role, UpdateRole},
    user::{NewUser, User, UserPatch, UserWithRole},
};
use crate::sorting::SortOrder;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Search, sort and pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// 1-based.
    pub page: u64,
    pub page_size: u64,
    /// Client-facing key, resolved through a `SortKeys` whitelist.
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    /// Case-insensitive substring search.
    pub search: Option<String>,
    pub with_deleted: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_order: SortOrder::Desc,
            search: None,
            with_deleted: false,
        }
    }
}

impl ListQuery {
    pub fn validate(&self) -> GatehouseResult<()> {
        if self.page < 1 {
            return Err(GatehouseError::invalid("page must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(GatehouseError::invalid(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1)) * self.page_size
    }

    /// Lower-cased search term, `None` when blank.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }
}

/// A page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

// ---------------------------------------------------------------------------
// Identity Store
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn find_by_id(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> impl Future<Output = GatehouseResult<Option<User>>> + Send;

    /// Live users only. The email is normalized before lookup.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = GatehouseResult<Option<User>>> + Send;

    /// Live users only.
    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = GatehouseResult<Option<User>>> + Send;

    /// User plus current role plus that role's live permissions.
    fn find_graph_by_id(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> impl Future<Output = GatehouseResult<Option<UserGraph>>> + Send;

    fn find_with_role(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> impl Future<Output = GatehouseResult<Option<UserWithRole>>> + Send;

    fn list(
        &self,
        query: ListQuery,
    ) -> impl Future<Output = GatehouseResult<Page<UserWithRole>>> + Send;
}

// ---------------------------------------------------------------------------
// Role-Assignment Transaction Manager
// ---------------------------------------------------------------------------

/// Atomic lifecycle transitions of a user and its current role.
///
/// Every method either applies all of its writes or none of them.
pub trait RoleAssignmentManager: Send + Sync {
    fn create(&self, input: NewUser) -> impl Future<Output = GatehouseResult<UserWithRole>> + Send;

    fn update(
        &self,
        id: Uuid,
        patch: UserPatch,
    ) -> impl Future<Output = GatehouseResult<UserWithRole>> + Send;

    /// Active + alive → inactive + soft-deleted.
    fn remove(&self, id: Uuid) -> impl Future<Output = GatehouseResult<UserWithRole>> + Send;

    /// Inactive + soft-deleted → active + alive.
    fn restore(&self, id: Uuid) -> impl Future<Output = GatehouseResult<UserWithRole>> + Send;
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = GatehouseResult<Role>> + Send;
    fn get_by_id(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> impl Future<Output = GatehouseResult<Role>> + Send;
    /// Names stay reserved after a soft delete, so at most one row matches.
    fn get_by_name(
        &self,
        name: &str,
        include_deleted: bool,
    ) -> impl Future<Output = GatehouseResult<Option<Role>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = GatehouseResult<Role>> + Send;
    /// Soft-delete. Grants and user assignments are kept.
    fn delete(&self, id: Uuid) -> impl Future<Output = GatehouseResult<Role>> + Send;
    fn restore(&self, id: Uuid) -> impl Future<Output = GatehouseResult<Role>> + Send;
    fn list(&self, query: ListQuery) -> impl Future<Output = GatehouseResult<Page<Role>>> + Send;

    /// Grant a permission to a role (creates a `grants` edge).
    fn grant_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = GatehouseResult<()>> + Send;

    /// Revoke a permission from a role.
    fn revoke_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = GatehouseResult<()>> + Send;

    /// Live permissions granted to a role.
    fn permissions_of(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = GatehouseResult<Vec<Permission>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = GatehouseResult<Permission>> + Send;
    fn get_by_id(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> impl Future<Output = GatehouseResult<Permission>> + Send;
    fn get_by_name(
        &self,
        name: &str,
        include_deleted: bool,
    ) -> impl Future<Output = GatehouseResult<Option<Permission>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = GatehouseResult<Permission>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = GatehouseResult<Permission>> + Send;
    fn restore(&self, id: Uuid) -> impl Future<Output = GatehouseResult<Permission>> + Send;
    fn list(
        &self,
        query: ListQuery,
    ) -> impl Future<Output = GatehouseResult<Page<Permission>>> + Send;
}

pub trait ModuleRepository: Send + Sync {
    fn create(&self, input: CreateModule) -> impl Future<Output = GatehouseResult<Module>> + Send;
    fn get_by_id(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> impl Future<Output = GatehouseResult<Module>> + Send;
    fn get_by_name(
        &self,
        name: &str,
        include_deleted: bool,
    ) -> impl Future<Output = GatehouseResult<Option<Module>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateModule,
    ) -> impl Future<Output = GatehouseResult<Module>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = GatehouseResult<Module>> + Send;
    /// Fails with `NotFound` when the module is not soft-deleted.
    fn restore(&self, id: Uuid) -> impl Future<Output = GatehouseResult<Module>> + Send;
    fn list(&self, query: ListQuery)
    -> impl Future<Output = GatehouseResult<Page<Module>>> + Send;
}
