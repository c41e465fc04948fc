//! Domain models for Gatehouse.
//!
//! These are the core types shared across all crates.

pub mod identity;
pub mod module;
pub mod permission;
pub mod role;
pub mod user;
