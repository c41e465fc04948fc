//! Password hashing capability.
//!
//! The authorization core never inspects a plaintext password; it only
//! hands it to an implementation of [`PasswordHasher`].

use crate::error::GatehouseResult;

pub trait PasswordHasher: Send + Sync {
    /// Produce an opaque, self-describing hash of `plaintext`.
    fn hash(&self, plaintext: &str) -> GatehouseResult<String>;

    /// `Ok(false)` on mismatch; `Err` only when `hashed` is unusable.
    fn compare(&self, plaintext: &str, hashed: &str) -> GatehouseResult<bool>;
}

impl<T: PasswordHasher + ?Sized> PasswordHasher for std::sync::Arc<T> {
    fn hash(&self, plaintext: &str) -> GatehouseResult<String> {
        (**self).hash(plaintext)
    }

    fn compare(&self, plaintext: &str, hashed: &str) -> GatehouseResult<bool> {
        (**self).compare(plaintext, hashed)
    }
}
