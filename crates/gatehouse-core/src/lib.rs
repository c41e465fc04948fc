//! Gatehouse Core: domain models, error taxonomy, repository traits and
//! the pure parts of the authorization path.
//!
//! Nothing in this crate talks to a database or parses a token. The
//! storage layer lives in `gatehouse-db`, credential handling in
//! `gatehouse-auth`.

pub mod deadline;
pub mod error;
pub mod models;
pub mod password;
pub mod repository;
pub mod resolver;
pub mod sorting;

pub use error::{GatehouseError, GatehouseResult};
pub use resolver::resolve_permissions;
