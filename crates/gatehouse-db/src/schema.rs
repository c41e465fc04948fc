//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. Record ids are UUID strings; references
//! between catalog rows are stored as the referenced UUID string, except
//! for user→role and role→permission which are graph edges.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct AppliedMigration {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "identity_catalog",
    sql: SCHEMA_V1,
}];

const SCHEMA_V1: &str = "\
-- Modules group permissions for display
DEFINE TABLE module SCHEMAFULL;
DEFINE FIELD name ON TABLE module TYPE string;
DEFINE FIELD description ON TABLE module TYPE option<string>;
DEFINE FIELD created_at ON TABLE module TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE module TYPE datetime DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE module TYPE option<datetime>;
DEFINE INDEX idx_module_name ON TABLE module COLUMNS name UNIQUE;

-- Permissions
DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD name ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE string;
DEFINE FIELD module_id ON TABLE permission TYPE string;
DEFINE FIELD created_at ON TABLE permission TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission TYPE datetime DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE permission TYPE option<datetime>;
DEFINE INDEX idx_permission_name ON TABLE permission COLUMNS name UNIQUE;

-- Roles
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD is_active ON TABLE role TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE role TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE role TYPE option<datetime>;
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;

-- Users. Email and username stay reserved while soft-deleted.
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD first_name ON TABLE user TYPE string;
DEFINE FIELD last_name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD profile_image ON TABLE user TYPE option<string>;
DEFINE FIELD dark_mode ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD password_expires_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD must_change_password ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE user TYPE option<datetime>;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;

-- User -> Role: at most one edge per user
DEFINE TABLE has_role TYPE RELATION SCHEMAFULL;
DEFINE FIELD assigned_at ON TABLE has_role TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_has_role_user ON TABLE has_role COLUMNS in UNIQUE;

-- Role -> Permission grants
DEFINE TABLE grants TYPE RELATION SCHEMAFULL;
DEFINE INDEX idx_grants_pair ON TABLE grants COLUMNS in, out UNIQUE;

-- Append-only history of role assignments
DEFINE TABLE role_assignment SCHEMAFULL;
DEFINE FIELD user_id ON TABLE role_assignment TYPE string;
DEFINE FIELD role_id ON TABLE role_assignment TYPE string;
DEFINE FIELD assigned_at ON TABLE role_assignment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_assignment_user ON TABLE role_assignment \
    COLUMNS user_id;
";

/// Run all pending migrations against the database.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let applied: Vec<AppliedMigration> = result.take(0)?;
    let current_version = applied.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {e}",
                migration.version, migration.name
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "recording v{} failed: {e}",
                    migration.version
                ))
            })?;
    }

    info!(version = MIGRATIONS.len(), "Schema up to date");
    Ok(())
}

/// Raw DDL of the first schema version.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
