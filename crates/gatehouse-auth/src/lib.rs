//! Gatehouse Auth: password login, JWT access tokens, request
//! authentication and permission-gated administration.

pub mod admin;
pub mod authenticator;
pub mod config;
pub mod error;
pub mod guard;
pub mod password;
pub mod permissions;
pub mod service;
pub mod token;

pub use admin::AdminService;
pub use authenticator::{TokenAuthenticator, extract_bearer};
pub use config::AuthConfig;
pub use error::AuthError;
pub use guard::{Decision, Requirement, authorize, enforce};
pub use password::Argon2PasswordHasher;
pub use service::{AuthService, LoginInput, LoginOutput};
pub use token::AccessTokenClaims;
