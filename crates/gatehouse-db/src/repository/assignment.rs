//! SurrealDB implementation of [`RoleAssignmentManager`].
//!
//! Each transition is one `BEGIN … COMMIT` block. Preconditions are
//! re-checked inside the block and raised with a tagged `THROW`; the
//! unique indexes on `user` and `has_role` back them up when two
//! transactions race.

use chrono::Utc;
use gatehouse_core::error::{GatehouseError, GatehouseResult};
use gatehouse_core::models::user::{
    NewUser, UserPatch, UserWithRole, default_password_expiration, normalize_email,
    normalize_username,
};
use gatehouse_core::password::PasswordHasher;
use gatehouse_core::repository::{RoleAssignmentManager, UserRepository};
use surrealdb::{Connection, Surreal};
use tracing::info;
use uuid::Uuid;

use super::user::SurrealUserRepository;
use crate::error::{DbError, THROW_TAG};
use crate::transaction::{self, TransactionConfig};

fn required(field: &str, value: &str) -> GatehouseResult<()> {
    if value.is_empty() {
        return Err(GatehouseError::invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_email(email: &str) -> GatehouseResult<()> {
    required("email", email)?;
    if !email.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(GatehouseError::invalid("email is malformed"));
    }
    Ok(())
}

fn unique_check(field: &str) -> String {
    format!(
        "IF array::len((SELECT VALUE id FROM user WHERE {field} = ${field} \
             AND id != type::record('user', $id))) > 0 \
         {{ THROW '{THROW_TAG}conflict:user:{field}' }};"
    )
}

fn live_role_check() -> String {
    format!(
        "IF array::len((SELECT VALUE id FROM type::record('role', $role_id) \
             WHERE deleted_at = NONE)) = 0 \
         {{ THROW '{THROW_TAG}invalid:role' }};"
    )
}

fn user_state_check(id: Uuid, deleted: bool) -> String {
    let condition = if deleted {
        "deleted_at != NONE"
    } else {
        "deleted_at = NONE"
    };
    format!(
        "IF array::len((SELECT VALUE id FROM type::record('user', $id) \
             WHERE {condition})) = 0 \
         {{ THROW '{THROW_TAG}not_found:user:{id}' }};"
    )
}

/// Replace the current role and log the assignment.
fn assign_role(id: Uuid, role_id: Uuid) -> String {
    format!(
        "DELETE has_role WHERE in = type::record('user', $id); \
         RELATE user:`{id}` -> has_role -> role:`{role_id}`; \
         CREATE role_assignment SET user_id = $id, role_id = $role_id;"
    )
}

/// SurrealDB implementation of the Role-Assignment Transaction Manager.
#[derive(Clone)]
pub struct SurrealRoleAssignmentManager<C: Connection, H: PasswordHasher> {
    db: Surreal<C>,
    users: SurrealUserRepository<C>,
    hasher: H,
    config: TransactionConfig,
}

impl<C: Connection, H: PasswordHasher> SurrealRoleAssignmentManager<C, H> {
    pub fn new(db: Surreal<C>, hasher: H, config: TransactionConfig) -> Self {
        Self {
            users: SurrealUserRepository::new(db.clone()),
            db,
            hasher,
            config,
        }
    }

    async fn committed(&self, id: Uuid, include_deleted: bool) -> GatehouseResult<UserWithRole> {
        self.users
            .find_with_role(id, include_deleted)
            .await?
            .ok_or_else(|| GatehouseError::not_found("user", id))
    }

    async fn taken_by_other(&self, field: &str, value: &str, id: Uuid) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query(format!(
                "SELECT VALUE meta::id(id) FROM user \
                 WHERE {field} = $value AND id != type::record('user', $id)"
            ))
            .bind(("value", value.to_string()))
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        let ids: Vec<String> = result.take(0)?;
        Ok(!ids.is_empty())
    }

    async fn role_is_live(&self, role_id: Uuid) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(id) FROM type::record('role', $role_id) \
                 WHERE deleted_at = NONE",
            )
            .bind(("role_id", role_id.to_string()))
            .await?
            .check()?;
        let ids: Vec<String> = result.take(0)?;
        Ok(!ids.is_empty())
    }

    /// `Some(true)` when the user exists and is soft-deleted.
    async fn deleted_state(&self, id: Uuid) -> Result<Option<bool>, DbError> {
        let mut result = self
            .db
            .query("SELECT VALUE deleted_at != NONE FROM type::record('user', $id)")
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        let states: Vec<bool> = result.take(0)?;
        Ok(states.into_iter().next())
    }

    /// Explain a failed transaction from committed state.
    async fn diagnose(
        &self,
        id: Uuid,
        expect_deleted: Option<bool>,
        email: Option<&str>,
        username: Option<&str>,
        role_id: Option<Uuid>,
    ) -> Result<Option<DbError>, DbError> {
        if let Some(expected) = expect_deleted {
            if self.deleted_state(id).await? != Some(expected) {
                return Ok(Some(DbError::not_found("user", id)));
            }
        }
        if let Some(email) = email {
            if self.taken_by_other("email", email, id).await? {
                return Ok(Some(DbError::conflict("user", "email")));
            }
        }
        if let Some(username) = username {
            if self.taken_by_other("username", username, id).await? {
                return Ok(Some(DbError::conflict("user", "username")));
            }
        }
        if let Some(role_id) = role_id {
            if !self.role_is_live(role_id).await? {
                return Ok(Some(DbError::InvalidReference("role does not exist".into())));
            }
        }
        Ok(None)
    }
}

impl<C: Connection, H: PasswordHasher> RoleAssignmentManager for SurrealRoleAssignmentManager<C, H> {
    async fn create(&self, input: NewUser) -> GatehouseResult<UserWithRole> {
        let email = normalize_email(&input.email);
        let username = normalize_username(&input.username);
        validate_email(&email)?;
        required("username", &username)?;
        required("first_name", input.first_name.trim())?;
        required("last_name", input.last_name.trim())?;
        required("password", &input.password)?;

        let password_hash = self.hasher.hash(&input.password)?;
        let password_expires_at = input
            .password_expires_at
            .unwrap_or_else(|| default_password_expiration(Utc::now()));

        let id = Uuid::new_v4();
        let role_id = input.role_id;
        let profile_image = input.profile_image.filter(|image| !image.trim().is_empty());
        let image_clause = if profile_image.is_some() {
            ", profile_image = $profile_image"
        } else {
            ""
        };

        let statement = format!(
            "BEGIN TRANSACTION; \
             {email_check} {username_check} {role_check} \
             CREATE type::record('user', $id) SET \
                 first_name = $first_name, last_name = $last_name, \
                 email = $email, username = $username, \
                 password_hash = $password_hash, is_active = true, \
                 dark_mode = $dark_mode, \
                 password_expires_at = $password_expires_at, \
                 must_change_password = true{image_clause}; \
             {assign} \
             COMMIT TRANSACTION;",
            email_check = unique_check("email"),
            username_check = unique_check("username"),
            role_check = live_role_check(),
            assign = assign_role(id, role_id),
        );

        let first_name = input.first_name.trim().to_string();
        let last_name = input.last_name.trim().to_string();

        transaction::run(
            &self.config,
            "user.create",
            || {
                let mut query = self
                    .db
                    .query(statement.clone())
                    .bind(("id", id.to_string()))
                    .bind(("role_id", role_id.to_string()))
                    .bind(("first_name", first_name.clone()))
                    .bind(("last_name", last_name.clone()))
                    .bind(("email", email.clone()))
                    .bind(("username", username.clone()))
                    .bind(("password_hash", password_hash.clone()))
                    .bind(("dark_mode", input.dark_mode))
                    .bind(("password_expires_at", password_expires_at));
                if let Some(image) = &profile_image {
                    query = query.bind(("profile_image", image.clone()));
                }
                async move {
                    query.await?.check()?;
                    Ok::<_, DbError>(())
                }
            },
            || self.diagnose(id, None, Some(&email), Some(&username), Some(role_id)),
        )
        .await?;

        info!(user_id = %id, role_id = %role_id, "user created");
        self.committed(id, false).await
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> GatehouseResult<UserWithRole> {
        if patch.is_empty() {
            return self.committed(id, false).await;
        }

        let email = patch.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            validate_email(email)?;
        }
        let username = patch.username.as_deref().map(normalize_username);
        if let Some(username) = &username {
            required("username", username)?;
        }
        let first_name = patch.first_name.as_deref().map(str::trim).map(String::from);
        if let Some(first_name) = &first_name {
            required("first_name", first_name)?;
        }
        let last_name = patch.last_name.as_deref().map(str::trim).map(String::from);
        if let Some(last_name) = &last_name {
            required("last_name", last_name)?;
        }
        let password_hash = match patch.password.as_deref() {
            Some(password) => {
                required("password", password)?;
                Some(self.hasher.hash(password)?)
            }
            None => None,
        };

        let mut checks = user_state_check(id, false);
        let mut sets = Vec::new();
        if first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if email.is_some() {
            checks.push_str(&unique_check("email"));
            sets.push("email = $email");
        }
        if username.is_some() {
            checks.push_str(&unique_check("username"));
            sets.push("username = $username");
        }
        if password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        match &patch.profile_image {
            Some(Some(_)) => sets.push("profile_image = $profile_image"),
            Some(None) => sets.push("profile_image = NONE"),
            None => {}
        }
        if patch.dark_mode.is_some() {
            sets.push("dark_mode = $dark_mode");
        }
        if patch.password_expires_at.is_some() {
            sets.push("password_expires_at = $password_expires_at");
        }
        if patch.must_change_password.is_some() {
            sets.push("must_change_password = $must_change_password");
        }
        sets.push("updated_at = time::now()");

        let assign = match patch.role_id {
            Some(role_id) => {
                checks.push_str(&live_role_check());
                assign_role(id, role_id)
            }
            None => String::new(),
        };

        let statement = format!(
            "BEGIN TRANSACTION; {checks} \
             UPDATE type::record('user', $id) SET {}; \
             {assign} \
             COMMIT TRANSACTION;",
            sets.join(", ")
        );

        transaction::run(
            &self.config,
            "user.update",
            || {
                let mut query = self
                    .db
                    .query(statement.clone())
                    .bind(("id", id.to_string()));
                if let Some(role_id) = patch.role_id {
                    query = query.bind(("role_id", role_id.to_string()));
                }
                if let Some(value) = &first_name {
                    query = query.bind(("first_name", value.clone()));
                }
                if let Some(value) = &last_name {
                    query = query.bind(("last_name", value.clone()));
                }
                if let Some(value) = &email {
                    query = query.bind(("email", value.clone()));
                }
                if let Some(value) = &username {
                    query = query.bind(("username", value.clone()));
                }
                if let Some(value) = &password_hash {
                    query = query.bind(("password_hash", value.clone()));
                }
                if let Some(Some(value)) = &patch.profile_image {
                    query = query.bind(("profile_image", value.clone()));
                }
                if let Some(value) = patch.dark_mode {
                    query = query.bind(("dark_mode", value));
                }
                if let Some(value) = patch.password_expires_at {
                    query = query.bind(("password_expires_at", value));
                }
                if let Some(value) = patch.must_change_password {
                    query = query.bind(("must_change_password", value));
                }
                async move {
                    query.await?.check()?;
                    Ok::<_, DbError>(())
                }
            },
            || {
                self.diagnose(
                    id,
                    Some(false),
                    email.as_deref(),
                    username.as_deref(),
                    patch.role_id,
                )
            },
        )
        .await?;

        info!(user_id = %id, role_changed = patch.role_id.is_some(), "user updated");
        self.committed(id, false).await
    }

    async fn remove(&self, id: Uuid) -> GatehouseResult<UserWithRole> {
        let statement = format!(
            "BEGIN TRANSACTION; {} \
             UPDATE type::record('user', $id) SET \
                 is_active = false, deleted_at = time::now(), updated_at = time::now(); \
             COMMIT TRANSACTION;",
            user_state_check(id, false)
        );

        transaction::run(
            &self.config,
            "user.remove",
            || {
                let query = self
                    .db
                    .query(statement.clone())
                    .bind(("id", id.to_string()));
                async move {
                    query.await?.check()?;
                    Ok::<_, DbError>(())
                }
            },
            || self.diagnose(id, Some(false), None, None, None),
        )
        .await?;

        info!(user_id = %id, "user soft-deleted");
        self.committed(id, true).await
    }

    async fn restore(&self, id: Uuid) -> GatehouseResult<UserWithRole> {
        let statement = format!(
            "BEGIN TRANSACTION; {} \
             UPDATE type::record('user', $id) SET \
                 is_active = true, deleted_at = NONE, updated_at = time::now(); \
             COMMIT TRANSACTION;",
            user_state_check(id, true)
        );

        transaction::run(
            &self.config,
            "user.restore",
            || {
                let query = self
                    .db
                    .query(statement.clone())
                    .bind(("id", id.to_string()));
                async move {
                    query.await?.check()?;
                    Ok::<_, DbError>(())
                }
            },
            || self.diagnose(id, Some(true), None, None, None),
        )
        .await?;

        info!(user_id = %id, "user restored");
        self.committed(id, false).await
    }
}
