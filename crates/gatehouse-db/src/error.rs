//! Database-specific error types and conversions.

use gatehouse_core::error::GatehouseError;
use tracing::error;

/// Prefix of every message raised with `THROW` inside a transaction.
pub(crate) const THROW_TAG: &str = "gatehouse:";

/// Unique indexes and the (entity, field) they protect.
const UNIQUE_INDEXES: &[(&str, &str, &str)] = &[
    ("idx_user_email", "user", "email"),
    ("idx_user_username", "user", "username"),
    ("idx_role_name", "role", "name"),
    ("idx_permission_name", "permission", "name"),
    ("idx_module_name", "module", "name"),
    ("idx_has_role_user", "user", "role"),
    ("idx_grants_pair", "role", "permission"),
];

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated: {entity}.{field}")]
    Conflict { entity: String, field: String },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}

impl DbError {
    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(entity: &str, field: &str) -> Self {
        Self::Conflict {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Recognize a tagged `THROW` or a unique index violation in a failed
    /// query. `None` means the failure has no domain meaning on its own.
    pub(crate) fn classify(&self) -> Option<DbError> {
        let DbError::Surreal(err) = self else {
            return None;
        };
        classify_message(&err.to_string())
    }

    /// `self`, replaced by its domain meaning when it has one.
    pub(crate) fn classified(self) -> Self {
        self.classify().unwrap_or(self)
    }
}

fn classify_message(message: &str) -> Option<DbError> {
    if let Some(start) = message.find(THROW_TAG) {
        let tag: String = message[start + THROW_TAG.len()..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-'))
            .collect();
        let mut parts = tag.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("conflict"), Some(entity), Some(field)) => {
                return Some(DbError::conflict(entity, field));
            }
            (Some("not_found"), Some(entity), id) => {
                return Some(DbError::not_found(entity, id.unwrap_or_default()));
            }
            (Some("invalid"), Some(entity), _) => {
                return Some(DbError::InvalidReference(format!("{entity} does not exist")));
            }
            _ => {}
        }
    }

    if message.contains("already contains") {
        return UNIQUE_INDEXES
            .iter()
            .find(|(index, _, _)| message.contains(index))
            .map(|(_, entity, field)| DbError::conflict(entity, field));
    }

    None
}

impl From<DbError> for GatehouseError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => GatehouseError::NotFound { entity, id },
            DbError::Conflict { entity, field } => GatehouseError::Conflict { entity, field },
            DbError::InvalidReference(message) => GatehouseError::InvalidArgument { message },
            other => {
                error!(error = %other, "storage failure");
                GatehouseError::Internal("storage failure".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thrown_conflict_is_recognized() {
        let classified =
            classify_message("An error occurred: gatehouse:conflict:user:email").unwrap();
        assert!(matches!(
            classified,
            DbError::Conflict { ref entity, ref field } if entity == "user" && field == "email"
        ));
    }

    #[test]
    fn thrown_not_found_carries_the_whole_id() {
        let id = uuid::Uuid::new_v4().to_string();
        for message in [
            format!("An error occurred: 'gatehouse:not_found:user:{id}'"),
            format!("An error occurred: gatehouse:not_found:user:{id}"),
        ] {
            let classified = classify_message(&message).unwrap();
            assert!(
                matches!(classified, DbError::NotFound { ref entity, id: ref got } if entity == "user" && *got == id),
                "{message}"
            );
        }
    }

    #[test]
    fn thrown_invalid_reference_is_recognized() {
        let classified = classify_message("gatehouse:invalid:role").unwrap();
        assert!(matches!(classified, DbError::InvalidReference(_)));
    }

    #[test]
    fn unique_index_violation_is_a_conflict() {
        let message = "Database index `idx_user_username` already contains 'alice', \
                       with record `user:abc`";
        let classified = classify_message(message).unwrap();
        assert!(matches!(
            classified,
            DbError::Conflict { ref field, .. } if field == "username"
        ));
    }

    #[test]
    fn unrelated_failure_is_not_classified() {
        assert!(classify_message("Failed to commit transaction due to a read or write conflict").is_none());
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err: GatehouseError = DbError::Decode("invalid UUID: xyz".into()).into();
        assert!(matches!(err, GatehouseError::Internal(ref msg) if msg == "storage failure"));
    }
}
