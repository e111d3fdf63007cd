//! Reply queue repository: persisted deferred replies.
//!
//! The drain claims items *before* dispatching them: one UPDATE stamps a
//! fresh claim token and flips `queued -> dispatching`, and only rows
//! returned by that statement are acted upon. Overlapping drains claim
//! disjoint sets (`FOR UPDATE SKIP LOCKED`), and a crash between claim and
//! send leaves rows in `dispatching` for the requeue sweep - duplication is
//! bounded to "claimed but not dispatched", never "dispatched twice".

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use botsmith_core::{QueueItemId, QueueItemStatus};

use super::RepositoryError;

/// A queued deferred reply.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueueItem {
    /// Unique item ID.
    pub id: QueueItemId,
    /// Instagram account the reply is sent from.
    pub owner_account_id: String,
    /// Recipient account id.
    pub recipient_account_id: String,
    /// Reply payload handed to the Graph API.
    pub payload: serde_json::Value,
    /// Current status.
    pub status: QueueItemStatus,
    /// Claim token of the drain run that owns this item.
    pub claim_token: Option<Uuid>,
    /// When the item was claimed.
    pub claimed_at: Option<DateTime<Utc>>,
    /// When the item was enqueued.
    pub created_at: DateTime<Utc>,
    /// When the item was dispatched.
    pub dispatched_at: Option<DateTime<Utc>>,
}

const QUEUE_COLUMNS: &str = "id, owner_account_id, recipient_account_id, payload, status, \
     claim_token, claimed_at, created_at, dispatched_at";

/// Repository for the reply queue.
pub struct ReplyQueueRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReplyQueueRepository<'a> {
    /// Create a new reply queue repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a deferred reply.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn enqueue(
        &self,
        owner_account_id: &str,
        recipient_account_id: &str,
        payload: &serde_json::Value,
    ) -> Result<QueueItem, RepositoryError> {
        let item = sqlx::query_as::<_, QueueItem>(&format!(
            "INSERT INTO reply_queue (owner_account_id, recipient_account_id, payload, status)
             VALUES ($1, $2, $3, 'queued')
             RETURNING {QUEUE_COLUMNS}"
        ))
        .bind(owner_account_id)
        .bind(recipient_account_id)
        .bind(payload)
        .fetch_one(self.pool)
        .await?;

        Ok(item)
    }

    /// Claim up to `limit` queued items for one drain run.
    ///
    /// Rows already claimed or locked by a concurrent drain are skipped,
    /// so re-invocation with no pending items returns an empty list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn claim_batch(
        &self,
        claim_token: Uuid,
        limit: i64,
    ) -> Result<Vec<QueueItem>, RepositoryError> {
        let items = sqlx::query_as::<_, QueueItem>(&format!(
            "UPDATE reply_queue
             SET status = 'dispatching', claim_token = $1, claimed_at = NOW()
             WHERE id IN (
                 SELECT id FROM reply_queue
                 WHERE status = 'queued'
                 ORDER BY created_at ASC
                 LIMIT $2
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {QUEUE_COLUMNS}"
        ))
        .bind(claim_token)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Mark a claimed item dispatched. Guarded by the claim token so only
    /// the owning drain run can complete it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_dispatched(
        &self,
        id: QueueItemId,
        claim_token: Uuid,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE reply_queue SET status = 'dispatched', dispatched_at = NOW()
             WHERE id = $1 AND claim_token = $2 AND status = 'dispatching'",
        )
        .bind(id)
        .bind(claim_token)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Mark a claimed item failed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_failed(
        &self,
        id: QueueItemId,
        claim_token: Uuid,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE reply_queue SET status = 'failed'
             WHERE id = $1 AND claim_token = $2 AND status = 'dispatching'",
        )
        .bind(id)
        .bind(claim_token)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Return items stuck in `dispatching` to `queued`.
    ///
    /// Recovers claims orphaned by a crash between claim and send. The age
    /// threshold keeps live drains from losing their claims.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn requeue_stale_claims(
        &self,
        older_than_minutes: i32,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE reply_queue
             SET status = 'queued', claim_token = NULL, claimed_at = NULL
             WHERE status = 'dispatching'
               AND claimed_at < NOW() - make_interval(mins => $1)",
        )
        .bind(older_than_minutes)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete terminal items older than the cutoff.
    ///
    /// Returns the deleted count; repeat runs converge to zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn cleanup_old(&self, max_age_days: i32) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM reply_queue
             WHERE status IN ('dispatched', 'failed')
               AND created_at < NOW() - make_interval(days => $1)",
        )
        .bind(max_age_days)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Number of items waiting in the queue.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending_count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reply_queue WHERE status = 'queued'",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}
