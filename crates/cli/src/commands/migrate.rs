//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! botsmith-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `BOTSMITH_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection
//!   string

use super::{CommandError, connect};

/// Run all pending server migrations.
///
/// # Errors
///
/// Returns `CommandError` if the connection or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
