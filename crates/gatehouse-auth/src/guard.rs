//! Access decisions over an authenticated identity.
//!
//! Pure policy: exact membership of permission names, no IO, no
//! wildcards.

use std::borrow::Cow;

use gatehouse_core::error::{GatehouseError, GatehouseResult};
use gatehouse_core::models::identity::AuthenticatedIdentity;
use tracing::warn;

/// Permission names an operation requires, all of them (AND).
///
/// An empty requirement only demands authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirement(Vec<Cow<'static, str>>);

impl Requirement {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(name: impl Into<Cow<'static, str>>) -> Self {
        Self(vec![name.into()])
    }

    pub fn all<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(AsRef::as_ref)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Carries the first required name the identity lacks.
    Deny { missing: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

pub fn authorize(identity: &AuthenticatedIdentity, requirement: &Requirement) -> Decision {
    match requirement
        .names()
        .find(|name| !identity.has_permission(name))
    {
        Some(missing) => Decision::Deny {
            missing: missing.to_string(),
        },
        None => Decision::Allow,
    }
}

/// [`authorize`], with a denial surfaced as [`GatehouseError::Forbidden`].
pub fn enforce(identity: &AuthenticatedIdentity, requirement: &Requirement) -> GatehouseResult<()> {
    match authorize(identity, requirement) {
        Decision::Allow => Ok(()),
        Decision::Deny { missing } => {
            warn!(subject_id = %identity.subject_id, %missing, "access denied");
            Err(GatehouseError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_core::models::identity::PermissionSet;
    use uuid::Uuid;

    use super::*;

    fn identity(permissions: &[&str]) -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            subject_id: Uuid::new_v4(),
            email: None,
            permissions: permissions.iter().copied().collect::<PermissionSet>(),
        }
    }

    #[test]
    fn exact_name_is_allowed() {
        let who = identity(&["users.view"]);
        assert!(authorize(&who, &Requirement::single("users.view")).is_allowed());
    }

    #[test]
    fn missing_name_is_forbidden() {
        let who = identity(&["users.view"]);
        assert_eq!(
            authorize(&who, &Requirement::single("users.delete")),
            Decision::Deny {
                missing: "users.delete".into()
            }
        );
        assert!(matches!(
            enforce(&who, &Requirement::single("users.delete")),
            Err(GatehouseError::Forbidden)
        ));
    }

    #[test]
    fn every_name_is_required() {
        let who = identity(&["a", "b"]);
        assert!(authorize(&who, &Requirement::all(["a", "b"])).is_allowed());
        assert!(!authorize(&who, &Requirement::all(["a", "c"])).is_allowed());
    }

    #[test]
    fn empty_requirement_only_needs_identity() {
        let who = identity(&[]);
        assert!(enforce(&who, &Requirement::none()).is_ok());
    }

    #[test]
    fn no_wildcards_or_prefixes() {
        let who = identity(&["*", "users"]);
        assert!(!authorize(&who, &Requirement::single("users.view")).is_allowed());
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let who = identity(&["Users.View"]);
        assert!(!authorize(&who, &Requirement::single("users.view")).is_allowed());
    }
}
