//! Database operations for the Botsmith `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `users` - Identity + token balances (atomic increment columns)
//! - `token_purchases` - Append-only purchase ledger
//! - `usage_events` - Append-only consumption ledger
//! - `subscriptions` - Billing subscriptions with guarded status transitions
//! - `plans` - Immutable plan catalog (seeded via CLI)
//! - `followers` - Instagram follower pairs (15-day retention via cron)
//! - `appointments` - Write-once lead capture
//! - `chatbots` - Web and Instagram agents (JSONB config)
//! - `referrals` - Affiliate attribution bookkeeping
//! - `reply_queue` - Deferred replies drained per rate-limit window
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p botsmith-cli -- migrate
//! ```

pub mod appointments;
pub mod chatbots;
pub mod followers;
pub mod plans;
pub mod referrals;
pub mod reply_queue;
pub mod subscriptions;
pub mod tokens;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique billing id).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a sqlx error to `Conflict` when it is a unique violation.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
