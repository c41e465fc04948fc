//! Server configuration.
//!
//! Loaded from an optional TOML file, then overridden by `GATEHOUSE_`
//! environment variables. Nested keys use a double underscore, e.g.
//! `GATEHOUSE_DB__URL` or `GATEHOUSE_AUTH__JWT_ISSUER`.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use gatehouse_auth::AuthConfig;
use gatehouse_db::DbConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "gatehouse.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
    /// Seeded on startup when absent from the store.
    pub bootstrap: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "gatehouse=info".into(),
        }
    }
}

/// The first administrator account.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("GATEHOUSE_").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        Jail::expect_with(|_| {
            let config = ServerConfig::load("missing.toml")?;
            assert_eq!(config.db.namespace, "gatehouse");
            assert_eq!(config.auth.access_token_lifetime_secs, 86_400);
            assert_eq!(config.log.filter, "gatehouse=info");
            assert!(config.bootstrap.is_none());
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_the_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "gatehouse.toml",
                r#"
                [db]
                url = "db.internal:8000"
                database = "admin"

                [db.transactions]
                max_retries = 2

                [bootstrap]
                first_name = "Root"
                last_name = "Admin"
                email = "root@example.com"
                username = "root"
                password = "change me"
                "#,
            )?;
            jail.set_env("GATEHOUSE_DB__DATABASE", "staging");
            jail.set_env("GATEHOUSE_AUTH__JWT_ISSUER", "gatehouse-staging");

            let config = ServerConfig::load("gatehouse.toml")?;
            assert_eq!(config.db.url, "db.internal:8000");
            assert_eq!(config.db.database, "staging");
            assert_eq!(config.db.transactions.max_retries, 2);
            assert_eq!(config.auth.jwt_issuer, "gatehouse-staging");
            assert_eq!(config.bootstrap.map(|admin| admin.username).as_deref(), Some("root"));
            Ok(())
        });
    }
}
