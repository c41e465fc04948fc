//! Argon2id implementation of the [`PasswordHasher`] capability.
//!
//! Parameters follow the OWASP recommendation (memory: 19 MiB,
//! iterations: 2, parallelism: 1). Salt is random per hash. An optional
//! pepper (server-side secret) is prepended before hashing and
//! verification.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordVerifier};
use gatehouse_core::error::GatehouseResult;
use gatehouse_core::password::PasswordHasher;

use crate::error::AuthError;

#[derive(Debug, Clone, Default)]
pub struct Argon2PasswordHasher {
    pepper: Option<String>,
}

impl Argon2PasswordHasher {
    pub fn new(pepper: Option<String>) -> Self {
        Self { pepper }
    }

    fn peppered(&self, password: &str) -> Vec<u8> {
        match &self.pepper {
            Some(pepper) => format!("{pepper}{password}").into_bytes(),
            None => password.as_bytes().to_vec(),
        }
    }

    fn argon2() -> Result<Argon2<'static>, AuthError> {
        let params = argon2::Params::new(19456, 2, 1, None)
            .map_err(|e| AuthError::Crypto(format!("argon2 params: {e}")))?;
        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> GatehouseResult<String> {
        use argon2::PasswordHasher as _;

        let salt = SaltString::generate(&mut OsRng);
        let hash = Self::argon2()?
            .hash_password(&self.peppered(plaintext), &salt)
            .map_err(|e| AuthError::Crypto(format!("password hash: {e}")))?;
        Ok(hash.to_string())
    }

    fn compare(&self, plaintext: &str, hashed: &str) -> GatehouseResult<bool> {
        Ok(verify_password(&self.peppered(plaintext), hashed)?)
    }
}

/// Verify raw password bytes against a PHC-format hash.
///
/// `Ok(false)` on mismatch, `Err(AuthError::Crypto)` when the stored
/// hash is malformed. The parameters are read from the hash itself.
fn verify_password(input: &[u8], hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}
