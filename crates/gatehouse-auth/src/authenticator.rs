//! Turns an `Authorization` header into an [`AuthenticatedIdentity`].

use std::time::Duration;

use gatehouse_core::deadline::with_deadline;
use gatehouse_core::error::GatehouseResult;
use gatehouse_core::models::identity::AuthenticatedIdentity;
use gatehouse_core::repository::UserRepository;
use gatehouse_core::resolve_permissions;
use tracing::debug;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::token;

/// Extract the credential from a `Bearer <token>` header value.
///
/// The scheme is matched case-insensitively; the credential must be
/// non-empty after trimming.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let (scheme, credential) = header
        .map(str::trim)
        .and_then(|value| value.split_once(' '))
        .ok_or(AuthError::MissingCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingCredential);
    }
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(credential)
}

/// Verifies bearer tokens and loads the caller's permissions.
pub struct TokenAuthenticator<U: UserRepository> {
    users: U,
    config: AuthConfig,
}

impl<U: UserRepository> TokenAuthenticator<U> {
    pub fn new(users: U, config: AuthConfig) -> Self {
        Self { users, config }
    }

    /// [`Self::authenticate_within`] bounded by the configured
    /// verification timeout.
    pub async fn authenticate(&self, header: Option<&str>) -> GatehouseResult<AuthenticatedIdentity> {
        self.authenticate_within(header, self.config.verification_timeout())
            .await
    }

    /// Verify the header's token and resolve its subject to a live user.
    ///
    /// Every credential problem fails with `Unauthenticated`; exceeding
    /// `limit` fails with `Timeout`. Storage failures surface as
    /// `Internal`.
    pub async fn authenticate_within(
        &self,
        header: Option<&str>,
        limit: Duration,
    ) -> GatehouseResult<AuthenticatedIdentity> {
        with_deadline("authenticate", limit, self.verify(header)).await
    }

    async fn verify(&self, header: Option<&str>) -> GatehouseResult<AuthenticatedIdentity> {
        let raw = extract_bearer(header)?;
        let claims = token::decode_access_token(raw, &self.config).inspect_err(|e| {
            debug!(error = %e, "token rejected");
        })?;

        let subject_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::TokenInvalid("subject is not a UUID".into()))?;

        let graph = self
            .users
            .find_graph_by_id(subject_id, false)
            .await?
            .filter(|graph| graph.user.is_live())
            .ok_or_else(|| {
                debug!(%subject_id, "token subject is not a live user");
                AuthError::UnknownSubject
            })?;

        Ok(AuthenticatedIdentity {
            subject_id,
            email: claims.email,
            permissions: resolve_permissions(&graph),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_credential_is_extracted() {
        assert_eq!(extract_bearer(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(extract_bearer(Some("bearer   abc ")).unwrap(), "abc");
    }

    #[test]
    fn malformed_headers_are_rejected() {
        for header in [
            None,
            Some(""),
            Some("Bearer"),
            Some("Bearer    "),
            Some("Basic dXNlcjpwdw=="),
            Some("Token abc"),
        ] {
            assert!(
                matches!(extract_bearer(header), Err(AuthError::MissingCredential)),
                "{header:?} should be rejected"
            );
        }
    }
}
