//! Authorization graph and the identity context handed to business logic.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::permission::Permission;
use super::role::Role;
use super::user::User;

/// A user with its current role and that role's permissions, loaded in
/// one read.
#[derive(Debug, Clone)]
pub struct UserGraph {
    pub user: User,
    pub role: Option<RoleGrants>,
}

/// A role and the live permissions granted to it.
#[derive(Debug, Clone)]
pub struct RoleGrants {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// Flat, deduplicated set of permission names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for PermissionSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The only artifact passed forward once a bearer credential has been
/// verified. The raw token is not kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub subject_id: Uuid,
    /// `email` claim of the token, if it carried one.
    pub email: Option<String>,
    pub permissions: PermissionSet,
}

impl AuthenticatedIdentity {
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }
}
