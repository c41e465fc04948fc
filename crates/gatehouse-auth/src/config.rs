//! Authentication configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for token issuance and verification.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// Access token lifetime in seconds (default: 86_400 = 1 day).
    pub access_token_lifetime_secs: u64,
    /// JWT issuer (`iss` claim), validated on every request.
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id.
    pub pepper: Option<String>,
    /// Upper bound for verifying a credential and loading its identity
    /// (default: 5).
    pub verification_timeout_secs: u64,
}

impl AuthConfig {
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification_timeout_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            access_token_lifetime_secs: 86_400,
            jwt_issuer: "gatehouse".into(),
            pepper: None,
            verification_timeout_secs: 5,
        }
    }
}
