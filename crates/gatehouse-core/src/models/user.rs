//! User domain model.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Months added to the creation time when no password expiration is given.
pub const DEFAULT_PASSWORD_LIFETIME_MONTHS: u32 = 6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Stored trimmed and lower-cased.
    pub email: String,
    pub username: String,
    /// Opaque output of the configured `PasswordHasher`.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub profile_image: Option<String>,
    pub dark_mode: bool,
    pub password_expires_at: Option<DateTime<Utc>>,
    pub must_change_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// A user may act only while alive and active.
    pub fn is_live(&self) -> bool {
        self.is_active && !self.is_deleted()
    }

    pub fn password_change_required(&self, now: DateTime<Utc>) -> bool {
        self.must_change_password
            || self
                .password_expires_at
                .is_some_and(|expires_at| expires_at <= now)
    }
}

/// A user together with its current role, as returned by list and
/// mutation operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithRole {
    #[serde(flatten)]
    pub user: User,
    pub role_id: Option<Uuid>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    /// Raw password, handed straight to the `PasswordHasher`.
    pub password: String,
    pub role_id: Uuid,
    pub profile_image: Option<String>,
    #[serde(default)]
    pub dark_mode: bool,
    /// Defaults to six months after creation.
    pub password_expires_at: Option<DateTime<Utc>>,
}

/// Partial update of a user.
///
/// Only these fields are patchable. The password hash, `is_active`,
/// `deleted_at` and the timestamps are owned by the lifecycle
/// transitions.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    /// Raw password; re-hashed before storage.
    pub password: Option<String>,
    /// `Some(Some(v))` = set, `Some(None)` = clear, `None` = no change.
    pub profile_image: Option<Option<String>>,
    pub dark_mode: Option<bool>,
    pub password_expires_at: Option<DateTime<Utc>>,
    pub must_change_password: Option<bool>,
    /// Replaces the current role when present.
    pub role_id: Option<Uuid>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.profile_image.is_none()
            && self.dark_mode.is_none()
            && self.password_expires_at.is_none()
            && self.must_change_password.is_none()
            && self.role_id.is_none()
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn normalize_username(username: &str) -> String {
    username.trim().to_string()
}

/// Password expiration applied when the caller supplies none.
pub fn default_password_expiration(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(DEFAULT_PASSWORD_LIFETIME_MONTHS))
        .unwrap_or(now)
}
