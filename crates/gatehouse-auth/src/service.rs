//! Authentication service: password login and access token issuance.

use chrono::Utc;
use gatehouse_core::error::GatehouseResult;
use gatehouse_core::password::PasswordHasher;
use gatehouse_core::repository::UserRepository;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    pub user_id: Uuid,
    /// Signed JWT access token.
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Set when the user must choose a new password before continuing.
    pub password_change_required: bool,
}

/// Authentication service.
///
/// Generic over the Identity Store and the password hasher so that the
/// auth layer has no dependency on the database crate.
pub struct AuthService<U: UserRepository, H: PasswordHasher> {
    users: U,
    hasher: H,
    config: AuthConfig,
}

impl<U: UserRepository, H: PasswordHasher> AuthService<U, H> {
    pub fn new(users: U, hasher: H, config: AuthConfig) -> Self {
        Self {
            users,
            hasher,
            config,
        }
    }

    /// Authenticate with username or email plus password and issue an
    /// access token.
    ///
    /// Unknown users, wrong passwords and deleted or inactive accounts
    /// all fail with the same `Unauthenticated`.
    pub async fn login(&self, input: LoginInput) -> GatehouseResult<LoginOutput> {
        // 1. Look up user: username first, then email.
        let user = match self.users.find_by_username(&input.username_or_email).await? {
            Some(user) => Some(user),
            None => self.users.find_by_email(&input.username_or_email).await?,
        };
        let Some(user) = user.filter(|user| user.is_live()) else {
            debug!("login for unknown or inactive account");
            return Err(AuthError::InvalidCredentials.into());
        };

        // 2. Verify password.
        if !self.hasher.compare(&input.password, &user.password_hash)? {
            debug!(user_id = %user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Issue the access token.
        let access_token = token::issue_access_token(user.id, Some(&user.email), &self.config)?;
        let password_change_required = user.password_change_required(Utc::now());

        info!(user_id = %user.id, password_change_required, "user logged in");
        Ok(LoginOutput {
            user_id: user.id,
            access_token,
            expires_in: self.config.access_token_lifetime_secs,
            password_change_required,
        })
    }
}
