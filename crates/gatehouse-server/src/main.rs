//! Gatehouse server: loads configuration, prepares the store and seeds
//! the administration catalog.

mod bootstrap;
mod config;

use std::process::ExitCode;

use gatehouse_auth::Argon2PasswordHasher;
use gatehouse_core::error::GatehouseError;
use gatehouse_db::{DbError, DbManager};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_CONFIG_FILE, ServerConfig};

#[derive(Debug, Error)]
enum ServerError {
    #[error("database connection failed: {0}")]
    Connect(#[from] surrealdb::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] DbError),

    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] GatehouseError),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let path = std::env::var("GATEHOUSE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
    let config = match ServerConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration in {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    info!(config = %path, "Starting Gatehouse...");

    match run(config).await {
        Ok(()) => {
            info!("Gatehouse ready.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Gatehouse failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let manager = DbManager::connect(&config.db).await?;
    gatehouse_db::run_migrations(manager.client()).await?;

    bootstrap::seed(
        manager.client(),
        Argon2PasswordHasher::new(config.auth.pepper.clone()),
        config.db.transactions.clone(),
        config.bootstrap.as_ref(),
    )
    .await?;
    Ok(())
}
