//! Authentication error types.

use gatehouse_core::error::GatehouseError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing or malformed authorization header")]
    MissingCredential,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("token subject is not a live user")]
    UnknownSubject,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for GatehouseError {
    fn from(err: AuthError) -> Self {
        match err {
            // Callers never learn which check failed.
            AuthError::InvalidCredentials
            | AuthError::MissingCredential
            | AuthError::TokenInvalid(_)
            | AuthError::UnknownSubject => GatehouseError::Unauthenticated,
            AuthError::Crypto(detail) => {
                error!(%detail, "cryptography failure");
                GatehouseError::Internal("cryptography failure".into())
            }
        }
    }
}
