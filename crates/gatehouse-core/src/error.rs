//! Error types for Gatehouse.
//!
//! Every layer converts its own error enum into [`GatehouseError`], which
//! only carries the kinds a caller is allowed to see.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatehouseError {
    /// Missing, malformed, expired or otherwise unusable credential, or a
    /// credential whose subject no longer resolves to a live user.
    #[error("authentication required")]
    Unauthenticated,

    /// Valid identity without the permissions an operation requires.
    #[error("insufficient permissions")]
    Forbidden,

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity} with the same {field}")]
    Conflict { entity: String, field: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// Storage or crypto failure. The message is generic; details are
    /// logged where the failure is converted.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatehouseError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Conflict {
            entity: entity.into(),
            field: field.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type GatehouseResult<T> = Result<T, GatehouseError>;

/// Parse an identifier received as text (path segment, token subject).
pub fn parse_id(raw: &str) -> GatehouseResult<uuid::Uuid> {
    uuid::Uuid::parse_str(raw.trim())
        .map_err(|_| GatehouseError::invalid(format!("malformed id: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_are_retryable() {
        assert!(
            GatehouseError::Timeout {
                operation: "user.create".into()
            }
            .is_retryable()
        );
        assert!(!GatehouseError::Forbidden.is_retryable());
        assert!(!GatehouseError::conflict("user", "email").is_retryable());
    }

    #[test]
    fn malformed_id_is_invalid_argument() {
        let err = parse_id("42").unwrap_err();
        assert!(matches!(err, GatehouseError::InvalidArgument { .. }));

        let id = uuid::Uuid::new_v4();
        assert_eq!(parse_id(&format!(" {id} ")).unwrap(), id);
    }
}
