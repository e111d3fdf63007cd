//! Deferred Instagram reply queue.
//!
//! Replies that would exceed the platform rate limit are parked in
//! `reply_queue` and drained when the window resets. The drain claims items
//! before dispatching them (see `db::reply_queue`), so overlapping cron
//! invocations never send the same reply twice.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::InstagramConfig;
use crate::db::reply_queue::{QueueItem, ReplyQueueRepository};
use crate::error::AppError;

/// Max items claimed per drain run.
const DRAIN_BATCH_SIZE: i64 = 100;

/// Claims older than this are treated as orphaned and requeued.
const STALE_CLAIM_MINUTES: i32 = 30;

/// Outcome of one drain run.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    /// Items claimed by this run.
    pub claimed: u64,
    /// Items successfully dispatched.
    pub dispatched: u64,
    /// Items whose dispatch failed.
    pub failed: u64,
    /// Orphaned claims returned to the queue before draining.
    pub requeued: u64,
    /// Items still queued after this run (larger batches next window).
    pub remaining: i64,
}

/// Deferred reply queue service.
pub struct ReplyQueueService {
    pool: PgPool,
    client: reqwest::Client,
    graph_api_base: String,
}

impl ReplyQueueService {
    /// Create a new reply queue service.
    #[must_use]
    pub fn new(pool: PgPool, config: &InstagramConfig) -> Self {
        Self {
            pool,
            client: reqwest::Client::new(),
            graph_api_base: config.graph_api_base.clone(),
        }
    }

    /// Park a reply for the next window reset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on storage failure.
    pub async fn enqueue(
        &self,
        owner_account_id: &str,
        recipient_account_id: &str,
        payload: &serde_json::Value,
    ) -> Result<QueueItem, AppError> {
        let item = ReplyQueueRepository::new(&self.pool)
            .enqueue(owner_account_id, recipient_account_id, payload)
            .await?;
        info!(item_id = %item.id, owner = %item.owner_account_id, "reply queued");
        Ok(item)
    }

    /// Delete terminal queue entries older than the cutoff.
    ///
    /// Returns the deleted count; a repeat run deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on storage failure.
    pub async fn cleanup(&self, max_age_days: i32) -> Result<u64, AppError> {
        let deleted = ReplyQueueRepository::new(&self.pool)
            .cleanup_old(max_age_days)
            .await?;
        if deleted > 0 {
            info!(deleted, max_age_days, "old queue entries removed");
        }
        Ok(deleted)
    }

    /// Drain the queue after a rate-limit window reset.
    ///
    /// Requeues orphaned claims from crashed runs, then claims a batch
    /// under a fresh token and dispatches each item. Items are marked
    /// `dispatched` or `failed` individually; one bad reply does not stop
    /// the rest.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` when claiming fails; dispatch failures
    /// are recorded per item, not returned.
    pub async fn reset_window_and_drain(&self) -> Result<DrainReport, AppError> {
        let repo = ReplyQueueRepository::new(&self.pool);

        let requeued = repo.requeue_stale_claims(STALE_CLAIM_MINUTES).await?;
        if requeued > 0 {
            warn!(requeued, "orphaned claims returned to queue");
        }

        let claim_token = Uuid::new_v4();
        let claimed = repo.claim_batch(claim_token, DRAIN_BATCH_SIZE).await?;

        let mut dispatched = 0u64;
        let mut failed = 0u64;

        for item in &claimed {
            match self.dispatch(item).await {
                Ok(()) => {
                    repo.mark_dispatched(item.id, claim_token).await?;
                    dispatched += 1;
                }
                Err(e) => {
                    warn!(item_id = %item.id, error = %e, "reply dispatch failed");
                    repo.mark_failed(item.id, claim_token).await?;
                    failed += 1;
                }
            }
        }

        let remaining = repo.pending_count().await?;
        let report = DrainReport {
            claimed: claimed.len() as u64,
            dispatched,
            failed,
            requeued,
            remaining,
        };
        info!(
            claimed = report.claimed,
            dispatched = report.dispatched,
            failed = report.failed,
            remaining = report.remaining,
            "queue drained"
        );
        Ok(report)
    }

    /// Send one reply through the Graph API.
    async fn dispatch(&self, item: &QueueItem) -> Result<(), AppError> {
        let url = format!("{}/{}/messages", self.graph_api_base, item.owner_account_id);
        let body = serde_json::json!({
            "recipient": { "id": item.recipient_account_id },
            "message": item.payload,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("graph api {status}: {detail}")));
        }

        Ok(())
    }
}
