//! Token balances, purchase ledger and usage metering.
//!
//! All balance mutations go through atomic in-database increments; this
//! service never reads a balance to compute the next value in Rust.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, warn};

use botsmith_core::{ChatbotId, UsagePeriod, UserId};

use crate::db::RepositoryError;
use crate::db::chatbots::ChatbotRepository;
use crate::db::tokens::{TokenLedgerRepository, UsageEvent};
use crate::db::users::UserRepository;
use crate::error::AppError;

/// A user's current token balances.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    /// Free (coupon) tokens remaining.
    pub free_remaining: i32,
    /// Purchased tokens remaining.
    pub purchased_remaining: i32,
    /// Total spendable tokens.
    pub total: i64,
}

/// One time bucket of aggregated usage.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageBucket {
    /// Bucket start time.
    pub start: DateTime<Utc>,
    /// Tokens consumed in this bucket.
    pub tokens: i64,
}

/// Usage aggregated over a reporting window.
///
/// Every bucket of the window is present, zeroed when no usage fell in it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    /// Reporting period.
    pub period: UsagePeriod,
    /// Start of the reporting window.
    pub window_start: DateTime<Utc>,
    /// Total tokens consumed in the window.
    pub total: i64,
    /// Per-bucket breakdown, oldest first.
    pub buckets: Vec<UsageBucket>,
}

/// Token balance and metering service.
pub struct TokenService {
    pool: PgPool,
}

impl TokenService {
    /// Create a new token service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current balances for a user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when the user row is absent.
    pub async fn balance(&self, user_id: UserId) -> Result<BalanceSummary, AppError> {
        let user = UserRepository::new(&self.pool)
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        Ok(BalanceSummary {
            free_remaining: user.free_remaining,
            purchased_remaining: user.purchased_remaining,
            total: i64::from(user.free_remaining) + i64::from(user.purchased_remaining),
        })
    }

    /// Record a token purchase: one ledger row plus an atomic credit to the
    /// purchased balance, in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if either statement fails; the
    /// transaction rolls back so ledger and balance never diverge.
    pub async fn record_purchase(
        &self,
        user_id: UserId,
        package: &str,
        tokens: i32,
        price: rust_decimal::Decimal,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        TokenLedgerRepository::record_purchase_tx(&mut tx, user_id, package, tokens, price)
            .await?;
        UserRepository::credit_purchased_tx(&mut tx, user_id, tokens).await?;

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    /// Record token consumption: debit the balance (free first, then
    /// purchased) and append the usage event, in a single transaction.
    ///
    /// A report of zero tokens is a no-op: there is nothing to debit, and
    /// the event ledger only holds positive amounts.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the balance cannot cover the
    /// debit, `AppError::Database` on storage failure; a failed event
    /// insert rolls the debit back.
    pub async fn record_usage(
        &self,
        user_id: UserId,
        chatbot_id: ChatbotId,
        tokens: i32,
    ) -> Result<(), AppError> {
        if !billable(tokens) {
            debug!(user_id = %user_id, tokens, "skipping non-billable usage report");
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let covered = UserRepository::debit_tokens_tx(&mut tx, user_id, tokens).await?;
        if !covered {
            tx.rollback().await.map_err(RepositoryError::from)?;
            // Distinguish "insufficient balance" from "no such user"
            if UserRepository::new(&self.pool).get_by_id(user_id).await?.is_none() {
                return Err(RepositoryError::NotFound.into());
            }
            return Err(AppError::Forbidden("insufficient token balance".to_string()));
        }

        TokenLedgerRepository::record_usage_tx(&mut tx, user_id, chatbot_id, tokens).await?;

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    /// Aggregate usage for a user over a reporting period.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on storage failure. A window with no
    /// usage yields zeroed buckets, never an error.
    pub async fn usage_stats(
        &self,
        user_id: UserId,
        period: UsagePeriod,
        chatbot_id: Option<ChatbotId>,
    ) -> Result<UsageStats, AppError> {
        let now = Utc::now();
        let window_start = now - Duration::seconds(period.window_seconds());

        let events = TokenLedgerRepository::new(&self.pool)
            .usage_since(user_id, window_start, chatbot_id)
            .await?;

        Ok(build_stats(period, window_start, &events))
    }

    /// Usage scoped to one chatbot, with an ownership check.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the chatbot belongs to someone
    /// else, 404 (via `RepositoryError::NotFound`) when it does not exist.
    pub async fn chatbot_usage(
        &self,
        user_id: UserId,
        chatbot_id: ChatbotId,
        period: UsagePeriod,
    ) -> Result<UsageStats, AppError> {
        let owned = ChatbotRepository::new(&self.pool)
            .is_owned_by(chatbot_id, user_id)
            .await?;
        if !owned {
            return Err(AppError::Forbidden("chatbot belongs to another user".to_string()));
        }

        self.usage_stats(user_id, period, Some(chatbot_id)).await
    }

    /// Reset one user's free balance to their allowance. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on storage failure.
    pub async fn reset_free(&self, user_id: UserId) -> Result<(), AppError> {
        UserRepository::new(&self.pool)
            .reset_free_tokens(user_id)
            .await?;
        Ok(())
    }

    /// Reset every user's free balance. A failed update is logged and
    /// skipped; the returned count is the number of users reset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` only when the user listing itself fails.
    pub async fn reset_all_free(&self) -> Result<u64, AppError> {
        let users = UserRepository::new(&self.pool);
        let ids = users.list_ids().await?;

        let mut reset = 0u64;
        for id in ids {
            match users.reset_free_tokens(id).await {
                Ok(()) => reset += 1,
                Err(e) => {
                    warn!(user_id = %id, error = %e, "free-token reset failed for user, skipping");
                }
            }
        }

        Ok(reset)
    }
}

/// Whether a reported token count results in a debit and a ledger entry.
const fn billable(tokens: i32) -> bool {
    tokens > 0
}

/// Build the zero-filled bucket skeleton and fill it from the events.
fn build_stats(
    period: UsagePeriod,
    window_start: DateTime<Utc>,
    events: &[UsageEvent],
) -> UsageStats {
    let bucket_seconds = period.bucket_seconds();
    let bucket_count = period.bucket_count();

    let mut totals = vec![0i64; bucket_count];
    for event in events {
        let offset = (event.created_at - window_start).num_seconds();
        if offset < 0 {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = (offset / bucket_seconds) as usize;
        // Events right at the window edge land in the last bucket.
        let index = index.min(bucket_count - 1);
        totals[index] += i64::from(event.tokens);
    }

    let buckets = totals
        .iter()
        .enumerate()
        .map(|(i, &tokens)| UsageBucket {
            start: window_start + Duration::seconds(bucket_seconds * i as i64),
            tokens,
        })
        .collect();

    UsageStats {
        period,
        window_start,
        total: totals.iter().sum(),
        buckets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(window_start: DateTime<Utc>, offset_secs: i64, tokens: i32) -> UsageEvent {
        UsageEvent {
            user_id: UserId::from(1),
            chatbot_id: ChatbotId::from(1),
            tokens,
            created_at: window_start + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn zero_and_negative_token_reports_are_not_billable() {
        assert!(!billable(0));
        assert!(!billable(-3));
        assert!(billable(1));
    }

    #[test]
    fn empty_window_yields_zeroed_buckets() {
        let start = Utc::now();
        let stats = build_stats(UsagePeriod::Week, start, &[]);

        assert_eq!(stats.buckets.len(), 7);
        assert!(stats.buckets.iter().all(|b| b.tokens == 0));
        assert_eq!(stats.total, 0);
    }

    #[test]
    fn events_land_in_their_bucket() {
        let start = Utc::now();
        let day = 24 * 60 * 60;
        let events = vec![
            event(start, 0, 10),
            event(start, day + 1, 5),
            event(start, day + 2, 7),
            event(start, 6 * day + 100, 3),
        ];

        let stats = build_stats(UsagePeriod::Week, start, &events);

        assert_eq!(stats.buckets[0].tokens, 10);
        assert_eq!(stats.buckets[1].tokens, 12);
        assert_eq!(stats.buckets[6].tokens, 3);
        assert_eq!(stats.total, 25);
    }

    #[test]
    fn edge_events_clamp_into_the_window() {
        let start = Utc::now();
        let window = UsagePeriod::Day.window_seconds();
        let events = vec![
            event(start, window, 4),
            // Before the window start: dropped, not panicked on.
            event(start, -5, 100),
        ];

        let stats = build_stats(UsagePeriod::Day, start, &events);

        assert_eq!(stats.buckets.len(), 24);
        assert_eq!(stats.buckets[23].tokens, 4);
        assert_eq!(stats.total, 4);
    }

    #[test]
    fn month_skeleton_has_thirty_buckets() {
        let stats = build_stats(UsagePeriod::Month, Utc::now(), &[]);
        assert_eq!(stats.buckets.len(), 30);
    }

    #[test]
    fn bucket_starts_are_evenly_spaced() {
        let start = Utc::now();
        let stats = build_stats(UsagePeriod::Year, start, &[]);

        assert_eq!(stats.buckets.len(), 12);
        let step = UsagePeriod::Year.bucket_seconds();
        for (i, bucket) in stats.buckets.iter().enumerate() {
            assert_eq!(bucket.start, start + Duration::seconds(step * i as i64));
        }
    }
}
