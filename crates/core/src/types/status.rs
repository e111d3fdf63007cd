//! Status enums for subscriptions, chatbots and the reply queue.

use serde::{Deserialize, Serialize};

/// Subscription lifecycle status.
///
/// The only permitted transitions are:
///
/// - `pending → active` (confirmed payment callback)
/// - `pending → expired` (timeout or cancellation before payment)
/// - `active → expired` (end-date rollover or cancellation)
///
/// `expired` is terminal; attempts to leave it are rejected as no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "subscription_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Pending,
    Active,
    Expired,
}

impl SubscriptionStatus {
    /// Whether the state machine permits a transition from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active | Self::Expired) | (Self::Active, Self::Expired)
        )
    }

    /// Apply a transition, returning the new status.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when the state machine forbids the move.
    /// Expired subscriptions in particular never transition again.
    pub const fn transition_to(self, next: Self) -> Result<Self, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition { from: self, to: next })
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("invalid subscription status: {s}")),
        }
    }
}

/// Rejected subscription state-machine transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid subscription transition: {from} -> {to}")]
pub struct InvalidTransition {
    /// Status the subscription currently holds.
    pub from: SubscriptionStatus,
    /// Status the caller attempted to move to.
    pub to: SubscriptionStatus,
}

/// Chatbot product variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "chatbot_kind", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ChatbotKind {
    /// Website chat widget.
    Web,
    /// Instagram auto-reply agent.
    Insta,
}

impl std::fmt::Display for ChatbotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Web => write!(f, "web"),
            Self::Insta => write!(f, "insta"),
        }
    }
}

impl std::str::FromStr for ChatbotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Self::Web),
            "insta" => Ok(Self::Insta),
            _ => Err(format!("invalid chatbot kind: {s}")),
        }
    }
}

/// Status of a deferred reply in the rate-limit queue.
///
/// Items are claimed (`Dispatching`) *before* the outbound send so that
/// crash recovery can only ever duplicate the claim, not the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "queue_item_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum QueueItemStatus {
    #[default]
    Queued,
    Dispatching,
    Dispatched,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_pending_can_activate_or_expire() {
        assert!(SubscriptionStatus::Pending.can_transition_to(SubscriptionStatus::Active));
        assert!(SubscriptionStatus::Pending.can_transition_to(SubscriptionStatus::Expired));
    }

    #[test]
    fn test_active_can_only_expire() {
        assert!(SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Expired));
        assert!(!SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Pending));
    }

    #[test]
    fn test_expired_is_terminal() {
        let expired = SubscriptionStatus::Expired;
        assert!(!expired.can_transition_to(SubscriptionStatus::Active));
        assert!(!expired.can_transition_to(SubscriptionStatus::Pending));

        let err = expired
            .transition_to(SubscriptionStatus::Active)
            .expect_err("activation of an expired subscription must be rejected");
        assert_eq!(err.from, SubscriptionStatus::Expired);
        assert_eq!(err.to, SubscriptionStatus::Active);
    }

    #[test]
    fn test_self_transitions_rejected() {
        assert!(!SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Active));
        assert!(!SubscriptionStatus::Pending.can_transition_to(SubscriptionStatus::Pending));
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            SubscriptionStatus::Pending,
            SubscriptionStatus::Active,
            SubscriptionStatus::Expired,
        ] {
            let parsed = SubscriptionStatus::from_str(&status.to_string()).expect("roundtrip");
            assert_eq!(parsed, status);
        }
        assert!(SubscriptionStatus::from_str("cancelled").is_err());
    }

    #[test]
    fn test_chatbot_kind_roundtrip() {
        assert_eq!(ChatbotKind::from_str("web").expect("web"), ChatbotKind::Web);
        assert_eq!(
            ChatbotKind::from_str("insta").expect("insta"),
            ChatbotKind::Insta
        );
        assert!(ChatbotKind::from_str("sms").is_err());
    }
}
