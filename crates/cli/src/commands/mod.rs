//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod tokens;
pub mod users;

use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Seed file could not be read or parsed.
    #[error("seed data error: {0}")]
    SeedData(String),
}

/// Connect to the database named by `BOTSMITH_DATABASE_URL`
/// (falling back to `DATABASE_URL`).
pub(crate) async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("BOTSMITH_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("BOTSMITH_DATABASE_URL"))?;

    let pool = PgPool::connect(&database_url).await?;
    Ok(pool)
}
