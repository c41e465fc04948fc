//! Gatehouse database layer: SurrealDB connection management, schema
//! migrations and the repository implementations behind the
//! `gatehouse-core` traits.

mod connection;
mod error;
pub mod repository;
mod schema;
mod transaction;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{
    SurrealModuleRepository, SurrealPermissionRepository, SurrealRoleAssignmentManager,
    SurrealRoleRepository, SurrealUserRepository,
};
pub use schema::{run_migrations, schema_v1};
pub use transaction::TransactionConfig;
