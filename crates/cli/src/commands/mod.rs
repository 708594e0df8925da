//! CLI command implementations.

pub mod migrate;
pub mod run;
pub mod session;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by commands that only need the database.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Read the database URL (`SHELFWISE_DATABASE_URL`, then `DATABASE_URL`).
///
/// # Errors
///
/// Returns `CommandError::MissingEnvVar` if neither is set.
pub fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("SHELFWISE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("SHELFWISE_DATABASE_URL"))
}

/// Connect to the service database.
///
/// # Errors
///
/// Returns an error if the URL is missing or the connection fails.
pub async fn connect() -> Result<PgPool, CommandError> {
    let url = database_url()?;
    Ok(shelfwise_admin::db::create_pool(&url).await?)
}
