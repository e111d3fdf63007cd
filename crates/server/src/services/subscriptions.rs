//! Subscription lifecycle and billing webhook handling.
//!
//! The state machine (`pending -> active -> expired`) is enforced twice:
//! in `botsmith_core::SubscriptionStatus` for callers reasoning about
//! transitions, and by status guards in the SQL itself so concurrent
//! webhook deliveries cannot resurrect an expired subscription.

use chrono::{Duration, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};

use botsmith_core::{ChatbotId, ChatbotKind, SubscriptionStatus, UserId};

use crate::db::subscriptions::{Subscription, SubscriptionRepository};
use crate::error::AppError;

/// Default paid period granted on payment confirmation, in days.
const DEFAULT_PERIOD_DAYS: i64 = 30;

/// A payment-provider webhook event, after signature verification.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum BillingEvent {
    /// Checkout initiated: record a pending subscription.
    #[serde(rename = "checkout.created")]
    CheckoutCreated {
        /// External billing id, unique per subscription.
        billing_id: String,
        /// Buying user.
        user_id: UserId,
        /// Agent being subscribed to.
        chatbot_id: ChatbotId,
    },

    /// Payment cleared: activate the pending subscription.
    #[serde(rename = "payment.confirmed")]
    PaymentConfirmed {
        /// External billing id.
        billing_id: String,
        /// Paid period length in days.
        period_days: Option<i64>,
    },

    /// Subscription cancelled upstream: expire it.
    #[serde(rename = "subscription.cancelled")]
    SubscriptionCancelled {
        /// External billing id.
        billing_id: String,
    },

    /// One-off token package purchase cleared.
    #[serde(rename = "tokens.purchased")]
    TokensPurchased {
        /// Buying user.
        user_id: UserId,
        /// Package name purchased.
        package: String,
        /// Tokens granted.
        tokens: i32,
        /// Price paid.
        price: rust_decimal::Decimal,
    },
}

/// Subscription lifecycle service.
pub struct SubscriptionService {
    pool: PgPool,
}

impl SubscriptionService {
    /// Create a new subscription service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply one verified billing event.
    ///
    /// Transitions that the state machine rejects (activating an expired
    /// subscription, re-expiring) are logged and treated as no-ops, so
    /// webhook redelivery is harmless.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on storage failure.
    pub async fn handle_billing_event(&self, event: BillingEvent) -> Result<(), AppError> {
        let repo = SubscriptionRepository::new(&self.pool);

        match event {
            BillingEvent::CheckoutCreated {
                billing_id,
                user_id,
                chatbot_id,
            } => {
                match repo.create_pending(user_id, chatbot_id, &billing_id).await {
                    Ok(subscription) => {
                        info!(billing_id, subscription_id = %subscription.id, "pending subscription created");
                    }
                    Err(crate::db::RepositoryError::Conflict(_)) => {
                        // Redelivered checkout event; the row already exists.
                        info!(billing_id, "checkout event redelivered, ignoring");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            BillingEvent::PaymentConfirmed {
                billing_id,
                period_days,
            } => {
                let days = period_days.unwrap_or(DEFAULT_PERIOD_DAYS);
                let ends_at = Utc::now() + Duration::days(days);
                let applied = repo.activate(&billing_id, ends_at).await?;
                if applied {
                    info!(billing_id, %ends_at, "subscription activated");
                } else {
                    self.log_rejected_transition(&billing_id, SubscriptionStatus::Active)
                        .await?;
                }
            }

            BillingEvent::SubscriptionCancelled { billing_id } => {
                let applied = repo.expire(&billing_id).await?;
                if applied {
                    info!(billing_id, "subscription expired on cancellation");
                } else {
                    self.log_rejected_transition(&billing_id, SubscriptionStatus::Expired)
                        .await?;
                }
            }

            BillingEvent::TokensPurchased { user_id, .. } => {
                // Token purchases are the token service's concern; the
                // webhook route dispatches them there before calling us.
                warn!(user_id = %user_id, "token purchase event reached subscription handler");
            }
        }

        Ok(())
    }

    /// Log why a guarded status update matched no row.
    ///
    /// Distinguishes redelivered events (transition the state machine
    /// rejects, a harmless no-op) from events for unknown billing ids.
    async fn log_rejected_transition(
        &self,
        billing_id: &str,
        wanted: SubscriptionStatus,
    ) -> Result<(), AppError> {
        match SubscriptionRepository::new(&self.pool)
            .get_by_billing_id(billing_id)
            .await?
        {
            Some(subscription) => match subscription.status.transition_to(wanted) {
                // The guard and the state machine disagree only under a
                // concurrent update that landed between the two reads.
                Ok(_) => {
                    warn!(billing_id, current = %subscription.status, %wanted, "transition raced a concurrent update");
                }
                Err(rejected) => {
                    info!(billing_id, %rejected, "event ignored");
                }
            },
            None => {
                warn!(billing_id, "event for unknown billing id, ignoring");
            }
        }
        Ok(())
    }

    /// Most recent active, unexpired subscription for a user/agent pair.
    ///
    /// Callers treat `None` as deny.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on storage failure.
    pub async fn agent_subscription(
        &self,
        user_id: UserId,
        chatbot_id: ChatbotId,
    ) -> Result<Option<Subscription>, AppError> {
        let subscription = SubscriptionRepository::new(&self.pool)
            .active_for_agent(user_id, chatbot_id)
            .await?;
        Ok(subscription)
    }

    /// All subscriptions for agents of a given kind, for the admin surface.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on storage failure.
    pub async fn list_by_kind(&self, kind: ChatbotKind) -> Result<Vec<Subscription>, AppError> {
        let subscriptions = SubscriptionRepository::new(&self.pool)
            .list_by_kind(kind)
            .await?;
        Ok(subscriptions)
    }

    /// Expire active subscriptions whose end date has passed.
    ///
    /// Returns the number of subscriptions rolled over.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on storage failure.
    pub async fn expire_lapsed(&self) -> Result<u64, AppError> {
        let expired = SubscriptionRepository::new(&self.pool).expire_lapsed().await?;
        if expired > 0 {
            info!(expired, "lapsed subscriptions expired");
        }
        Ok(expired)
    }

    /// Expire pending subscriptions older than the checkout timeout.
    ///
    /// Returns the number of abandoned checkouts timed out.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on storage failure.
    pub async fn expire_abandoned(&self, max_age_days: i32) -> Result<u64, AppError> {
        let expired = SubscriptionRepository::new(&self.pool)
            .expire_abandoned(max_age_days)
            .await?;
        if expired > 0 {
            info!(expired, "abandoned checkouts expired");
        }
        Ok(expired)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn billing_events_deserialize() {
        let event: BillingEvent = serde_json::from_value(serde_json::json!({
            "event": "checkout.created",
            "data": { "billing_id": "bil_1", "user_id": 7, "chatbot_id": 3 }
        }))
        .unwrap();
        assert!(matches!(event, BillingEvent::CheckoutCreated { .. }));

        let event: BillingEvent = serde_json::from_value(serde_json::json!({
            "event": "payment.confirmed",
            "data": { "billing_id": "bil_1", "period_days": 365 }
        }))
        .unwrap();
        match event {
            BillingEvent::PaymentConfirmed { period_days, .. } => {
                assert_eq!(period_days, Some(365));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let event: BillingEvent = serde_json::from_value(serde_json::json!({
            "event": "subscription.cancelled",
            "data": { "billing_id": "bil_1" }
        }))
        .unwrap();
        assert!(matches!(event, BillingEvent::SubscriptionCancelled { .. }));
    }

    #[test]
    fn period_days_is_optional() {
        let event: BillingEvent = serde_json::from_value(serde_json::json!({
            "event": "payment.confirmed",
            "data": { "billing_id": "bil_1" }
        }))
        .unwrap();
        match event {
            BillingEvent::PaymentConfirmed { period_days, .. } => assert!(period_days.is_none()),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        let result: Result<BillingEvent, _> = serde_json::from_value(serde_json::json!({
            "event": "refund.issued",
            "data": { "billing_id": "bil_1" }
        }));
        assert!(result.is_err());
    }
}
