//! Permission names required by the administrative operations.
//!
//! Restoring a soft-deleted row requires the `update` permission of its
//! kind.

pub const MODULE: &str = "system-administration";

pub const USERS_VIEW: &str = "system-administration.users.view";
pub const USERS_CREATE: &str = "system-administration.users.create";
pub const USERS_UPDATE: &str = "system-administration.users.update";
pub const USERS_DELETE: &str = "system-administration.users.delete";

pub const ROLES_VIEW: &str = "system-administration.roles.view";
pub const ROLES_CREATE: &str = "system-administration.roles.create";
pub const ROLES_UPDATE: &str = "system-administration.roles.update";
pub const ROLES_DELETE: &str = "system-administration.roles.delete";

pub const PERMISSIONS_VIEW: &str = "system-administration.permissions.view";
pub const PERMISSIONS_CREATE: &str = "system-administration.permissions.create";
pub const PERMISSIONS_UPDATE: &str = "system-administration.permissions.update";
pub const PERMISSIONS_DELETE: &str = "system-administration.permissions.delete";

pub const MODULES_VIEW: &str = "system-administration.modules.view";
pub const MODULES_CREATE: &str = "system-administration.modules.create";
pub const MODULES_UPDATE: &str = "system-administration.modules.update";
pub const MODULES_DELETE: &str = "system-administration.modules.delete";

/// Every declared permission, in a stable order.
pub const ALL: &[&str] = &[
    USERS_VIEW,
    USERS_CREATE,
    USERS_UPDATE,
    USERS_DELETE,
    ROLES_VIEW,
    ROLES_CREATE,
    ROLES_UPDATE,
    ROLES_DELETE,
    PERMISSIONS_VIEW,
    PERMISSIONS_CREATE,
    PERMISSIONS_UPDATE,
    PERMISSIONS_DELETE,
    MODULES_VIEW,
    MODULES_CREATE,
    MODULES_UPDATE,
    MODULES_DELETE,
];
