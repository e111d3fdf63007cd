//! Follower repository: per-account follower pairs with fixed retention.
//!
//! Uniqueness per (owner, follower) pair lives in the store as a composite
//! UNIQUE constraint; writes go through an upsert. Postgres has no row TTL,
//! so the 15-day retention window is enforced by the cron sweep calling
//! [`FollowerRepository::purge_stale`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use botsmith_core::FollowerId;

use super::RepositoryError;

/// Retention window for follower records, in days.
pub const RETENTION_DAYS: i32 = 15;

/// A follower row.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Follower {
    /// Internal ID.
    pub id: FollowerId,
    /// Instagram account the follower belongs to.
    pub owner_account_id: String,
    /// The follower's account id.
    pub follower_account_id: String,
    /// Whether the account currently follows the owner.
    pub is_following: bool,
    /// Last time the pair was observed.
    pub updated_at: DateTime<Utc>,
}

/// Repository for follower operations.
pub struct FollowerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FollowerRepository<'a> {
    /// Create a new follower repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record an observation of a follower pair, refreshing the flag and
    /// the retention clock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert(
        &self,
        owner_account_id: &str,
        follower_account_id: &str,
        is_following: bool,
    ) -> Result<Follower, RepositoryError> {
        let row = sqlx::query_as::<_, Follower>(
            "INSERT INTO followers (owner_account_id, follower_account_id, is_following, updated_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (owner_account_id, follower_account_id)
             DO UPDATE SET is_following = EXCLUDED.is_following, updated_at = NOW()
             RETURNING id, owner_account_id, follower_account_id, is_following, updated_at",
        )
        .bind(owner_account_id)
        .bind(follower_account_id)
        .bind(is_following)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Look up one follower pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        owner_account_id: &str,
        follower_account_id: &str,
    ) -> Result<Option<Follower>, RepositoryError> {
        let row = sqlx::query_as::<_, Follower>(
            "SELECT id, owner_account_id, follower_account_id, is_following, updated_at
             FROM followers
             WHERE owner_account_id = $1 AND follower_account_id = $2",
        )
        .bind(owner_account_id)
        .bind(follower_account_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Delete pairs not observed within the retention window.
    ///
    /// Returns the number of rows purged. Repeat runs are no-ops.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn purge_stale(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM followers WHERE updated_at < NOW() - make_interval(days => $1)",
        )
        .bind(RETENTION_DAYS)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
