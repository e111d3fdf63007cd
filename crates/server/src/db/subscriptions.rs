//! Subscription repository with status-guarded transitions.
//!
//! Every transition is expressed as `UPDATE ... WHERE status = <from>`, so
//! illegal moves (anything out of `expired`, re-activation of `active`)
//! affect zero rows and report as rejected instead of clobbering state.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use botsmith_core::{ChatbotId, SubscriptionStatus, UserId};

use super::{RepositoryError, conflict_on_unique};

/// A subscription row.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Subscription {
    /// Internal ID.
    pub id: botsmith_core::SubscriptionId,
    /// Owning user.
    pub user_id: UserId,
    /// Product / agent this subscription covers.
    pub chatbot_id: ChatbotId,
    /// External billing system's subscription id (unique).
    pub billing_id: String,
    /// Current status.
    pub status: SubscriptionStatus,
    /// End date; null until activated.
    pub ends_at: Option<DateTime<Utc>>,
    /// When the subscription was created.
    pub created_at: DateTime<Utc>,
}

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, chatbot_id, billing_id, status, ends_at, created_at";

/// Repository for subscription database operations.
pub struct SubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriptionRepository<'a> {
    /// Create a new subscription repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending subscription at checkout initiation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the billing id already exists.
    pub async fn create_pending(
        &self,
        user_id: UserId,
        chatbot_id: ChatbotId,
        billing_id: &str,
    ) -> Result<Subscription, RepositoryError> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "INSERT INTO subscriptions (user_id, chatbot_id, billing_id, status)
             VALUES ($1, $2, $3, 'pending')
             RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(chatbot_id)
        .bind(billing_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "subscription"))?;

        Ok(subscription)
    }

    /// Get a subscription by its external billing id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_billing_id(
        &self,
        billing_id: &str,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE billing_id = $1"
        ))
        .bind(billing_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(subscription)
    }

    /// Activate a pending subscription, setting its end date.
    ///
    /// Returns `true` if the transition applied, `false` if the subscription
    /// was not in `pending` (the attempt is a no-op, never an overwrite).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn activate(
        &self,
        billing_id: &str,
        ends_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'active', ends_at = $2
             WHERE billing_id = $1 AND status = 'pending'",
        )
        .bind(billing_id)
        .bind(ends_at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Expire a subscription (cancellation or pending timeout).
    ///
    /// Returns `true` if the transition applied, `false` if the subscription
    /// was already `expired`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn expire(&self, billing_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'expired'
             WHERE billing_id = $1 AND status IN ('pending', 'active')",
        )
        .bind(billing_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Expire every active subscription whose end date has passed.
    ///
    /// Returns the number of subscriptions rolled over. Safe to run
    /// repeatedly; converges to zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn expire_lapsed(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'expired'
             WHERE status = 'active' AND ends_at IS NOT NULL AND ends_at < NOW()",
        )
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Expire pending subscriptions whose checkout was abandoned.
    ///
    /// Pending rows carry no end date; a payment event that never arrives
    /// would leave them pending forever, so the nightly sweep times them
    /// out by age. Safe to run repeatedly; converges to zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn expire_abandoned(&self, max_age_days: i32) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'expired'
             WHERE status = 'pending'
               AND created_at < NOW() - ($1 * INTERVAL '1 day')",
        )
        .bind(max_age_days)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Most recent active, unexpired subscription for a user + agent pair.
    ///
    /// Returns `None` when there is none; callers treat that as deny.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_for_agent(
        &self,
        user_id: UserId,
        chatbot_id: ChatbotId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
             WHERE user_id = $1 AND chatbot_id = $2 AND status = 'active'
               AND (ends_at IS NULL OR ends_at > NOW())
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(user_id)
        .bind(chatbot_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(subscription)
    }

    /// List subscriptions covering chatbots of one kind (admin view),
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_kind(
        &self,
        kind: botsmith_core::ChatbotKind,
    ) -> Result<Vec<Subscription>, RepositoryError> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            "SELECT s.id, s.user_id, s.chatbot_id, s.billing_id, s.status, s.ends_at, s.created_at
             FROM subscriptions s
             JOIN chatbots c ON c.id = s.chatbot_id
             WHERE c.kind = $1
             ORDER BY s.created_at DESC",
        )
        .bind(kind)
        .fetch_all(self.pool)
        .await?;

        Ok(subscriptions)
    }
}
