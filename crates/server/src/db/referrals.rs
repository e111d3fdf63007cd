//! Affiliate referral repository: attribution bookkeeping only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use botsmith_core::ReferralId;

use super::RepositoryError;

/// A referral attribution row.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Referral {
    /// Internal ID.
    pub id: ReferralId,
    /// External billing subscription id the purchase created.
    pub subscription_id: String,
    /// Affiliate code credited with the purchase.
    pub affiliate_code: String,
    /// Buying user's external id.
    pub buyer_id: String,
    /// Purchase amount attributed.
    pub amount: Decimal,
    /// When the referral was recorded.
    pub created_at: DateTime<Utc>,
}

/// Repository for referral operations.
pub struct ReferralRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReferralRepository<'a> {
    /// Create a new referral repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record an attribution. No money moves here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        subscription_id: &str,
        affiliate_code: &str,
        buyer_id: &str,
        amount: Decimal,
    ) -> Result<Referral, RepositoryError> {
        let row = sqlx::query_as::<_, Referral>(
            "INSERT INTO referrals (subscription_id, affiliate_code, buyer_id, amount)
             VALUES ($1, $2, $3, $4)
             RETURNING id, subscription_id, affiliate_code, buyer_id, amount, created_at",
        )
        .bind(subscription_id)
        .bind(affiliate_code)
        .bind(buyer_id)
        .bind(amount)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }
}
