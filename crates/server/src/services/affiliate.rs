//! Referral bookkeeping for affiliate-attributed purchases.
//!
//! Pure attribution: a referral row links a subscription to the affiliate
//! code that sold it. Payouts happen out-of-band.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use crate::db::referrals::{Referral, ReferralRepository};
use crate::error::AppError;

/// Incoming referral attribution, all fields required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackReferralRequest {
    /// External billing id of the purchased subscription.
    pub subscription_id: Option<String>,
    /// Affiliate code that referred the buyer.
    pub affiliate_code: Option<String>,
    /// Buyer's account id.
    pub buyer_id: Option<String>,
    /// Purchase amount.
    pub amount: Option<Decimal>,
}

/// Affiliate referral service.
pub struct AffiliateService {
    pool: PgPool,
}

impl AffiliateService {
    /// Create a new affiliate service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a referral attribution.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` unless every field is present,
    /// non-empty and the amount positive; `AppError::Database` on storage
    /// failure.
    pub async fn track_referral(
        &self,
        request: TrackReferralRequest,
    ) -> Result<Referral, AppError> {
        let (subscription_id, affiliate_code, buyer_id, amount) = validate(request)?;

        let referral = ReferralRepository::new(&self.pool)
            .create(&subscription_id, &affiliate_code, &buyer_id, amount)
            .await?;

        info!(
            referral_id = %referral.id,
            affiliate_code = %referral.affiliate_code,
            "referral recorded"
        );
        Ok(referral)
    }
}

/// Reject the request unless every field is usable.
fn validate(
    request: TrackReferralRequest,
) -> Result<(String, String, String, Decimal), AppError> {
    let missing = || AppError::InvalidArgument("Missing required fields".to_string());

    let subscription_id = request.subscription_id.filter(|s| !s.is_empty()).ok_or_else(missing)?;
    let affiliate_code = request.affiliate_code.filter(|s| !s.is_empty()).ok_or_else(missing)?;
    let buyer_id = request.buyer_id.filter(|s| !s.is_empty()).ok_or_else(missing)?;
    let amount = request
        .amount
        .filter(|a| a.is_sign_positive() && !a.is_zero())
        .ok_or_else(missing)?;

    Ok((subscription_id, affiliate_code, buyer_id, amount))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn full_request() -> TrackReferralRequest {
        TrackReferralRequest {
            subscription_id: Some("bil_42".to_string()),
            affiliate_code: Some("PARTNER10".to_string()),
            buyer_id: Some("acct_9".to_string()),
            amount: Some(Decimal::new(4999, 2)),
        }
    }

    #[test]
    fn complete_request_passes_validation() {
        let (sub, code, buyer, amount) = validate(full_request()).unwrap();
        assert_eq!(sub, "bil_42");
        assert_eq!(code, "PARTNER10");
        assert_eq!(buyer, "acct_9");
        assert_eq!(amount, Decimal::new(4999, 2));
    }

    #[test]
    fn missing_amount_is_rejected() {
        let request = TrackReferralRequest {
            amount: None,
            ..full_request()
        };
        assert!(matches!(validate(request), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn empty_affiliate_code_is_rejected() {
        let request = TrackReferralRequest {
            affiliate_code: Some(String::new()),
            ..full_request()
        };
        assert!(matches!(validate(request), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        for amount in [Decimal::ZERO, Decimal::new(-100, 2)] {
            let request = TrackReferralRequest {
                amount: Some(amount),
                ..full_request()
            };
            assert!(matches!(validate(request), Err(AppError::InvalidArgument(_))));
        }
    }
}
