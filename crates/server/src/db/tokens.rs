//! Token ledger repository: purchases and usage events.
//!
//! Both tables are append-only; balances live on the user row and are
//! mutated separately with atomic increments (see `db::users`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use botsmith_core::{ChatbotId, PurchaseId, UserId};

use super::RepositoryError;

/// A token purchase ledger row.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Purchase {
    /// Internal ID.
    pub id: PurchaseId,
    /// Buying user.
    pub user_id: UserId,
    /// Package name purchased.
    pub package: String,
    /// Tokens granted.
    pub tokens: i32,
    /// Price paid.
    pub price: Decimal,
    /// When the purchase happened.
    pub created_at: DateTime<Utc>,
}

/// A consumption event row, as read back for aggregation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsageEvent {
    /// Consuming user.
    pub user_id: UserId,
    /// Chatbot the tokens were spent on.
    pub chatbot_id: ChatbotId,
    /// Tokens consumed.
    pub tokens: i32,
    /// When the consumption happened.
    pub created_at: DateTime<Utc>,
}

/// Repository for the token ledgers.
pub struct TokenLedgerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenLedgerRepository<'a> {
    /// Create a new ledger repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append a purchase record inside an open transaction.
    ///
    /// Paired with the balance credit so ledger and balance commit or roll
    /// back together.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record_purchase_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: UserId,
        package: &str,
        tokens: i32,
        price: Decimal,
    ) -> Result<Purchase, RepositoryError> {
        let row = sqlx::query_as::<_, Purchase>(
            "INSERT INTO token_purchases (user_id, package, tokens, price)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, package, tokens, price, created_at",
        )
        .bind(user_id)
        .bind(package)
        .bind(tokens)
        .bind(price)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    /// List a user's purchase history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_purchases(&self, user_id: UserId) -> Result<Vec<Purchase>, RepositoryError> {
        let rows = sqlx::query_as::<_, Purchase>(
            "SELECT id, user_id, package, tokens, price, created_at
             FROM token_purchases
             WHERE user_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Append a consumption event inside an open transaction.
    ///
    /// Paired with the balance debit so a failed insert rolls the debit
    /// back instead of leaving tokens charged with no event recorded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record_usage_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: UserId,
        chatbot_id: ChatbotId,
        tokens: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO usage_events (user_id, chatbot_id, tokens) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(chatbot_id)
            .bind(tokens)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Fetch a user's consumption events since a cutoff, optionally scoped
    /// to one chatbot. Bucketing happens in the service layer so empty
    /// buckets can be materialized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn usage_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
        chatbot_id: Option<ChatbotId>,
    ) -> Result<Vec<UsageEvent>, RepositoryError> {
        let rows = sqlx::query_as::<_, UsageEvent>(
            "SELECT user_id, chatbot_id, tokens, created_at
             FROM usage_events
             WHERE user_id = $1 AND created_at >= $2
               AND ($3::INT IS NULL OR chatbot_id = $3)
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .bind(since)
        .bind(chatbot_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
