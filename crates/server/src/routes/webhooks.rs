//! Inbound webhooks: agent chat proxy and billing events.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;
use tracing::warn;

use botsmith_core::{ChatbotId, UserId};

use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::services::{BalanceSummary, BillingEvent, SubscriptionService, TokenService};
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the billing webhook signature (hex HMAC-SHA256).
const SIGNATURE_HEADER: &str = "x-billing-signature";

/// Tokens billed per request when the completions API reports no usage.
const FALLBACK_TOKENS: i32 = 1;

/// Agent chat request, forwarded to the completions API after the
/// entitlement and balance checks pass.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentWebhookRequest {
    pub user_id: UserId,
    pub agent_id: ChatbotId,
    /// The chat payload, passed through untouched.
    pub payload: serde_json::Value,
}

/// POST /webhooks/agent - metered chat proxy.
///
/// Order matters: identity (401), entitlement (403), balance (403),
/// then the upstream call, then the usage debit from the reported token
/// count. The balance check runs before the proxy so a drained user
/// cannot consume a paid completion that is then refused.
pub async fn agent(
    State(state): State<AppState>,
    Json(request): Json<AgentWebhookRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = UserRepository::new(state.pool())
        .get_by_id(request.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unknown user".to_string()))?;

    let subscription = SubscriptionService::new(state.pool().clone())
        .agent_subscription(user.id, request.agent_id)
        .await?;
    if subscription.is_none() {
        return Err(AppError::Forbidden("no active subscription".to_string()));
    }

    let token_service = TokenService::new(state.pool().clone());
    let balance = token_service.balance(user.id).await?;
    if !has_spendable_tokens(&balance) {
        return Err(AppError::Forbidden("insufficient token balance".to_string()));
    }

    let outcome = state
        .completions()
        .complete(&request.payload)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    let tokens = outcome
        .usage
        .map_or(FALLBACK_TOKENS, |u| i32::try_from(u.total_tokens).unwrap_or(i32::MAX));

    token_service
        .record_usage(user.id, request.agent_id, tokens)
        .await?;

    Ok(Json(outcome.body))
}

/// Whether a balance can fund at least one metered request.
const fn has_spendable_tokens(balance: &BalanceSummary) -> bool {
    balance.total > 0
}

/// POST /webhooks/billing - payment provider events.
///
/// The raw body is verified against the shared secret before parsing;
/// an invalid or missing signature never reaches the event handler.
pub async fn billing(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing webhook signature".to_string()))?;

    let secret = state.config().billing_webhook_secret.expose_secret();
    if !verify_signature(&body, secret, provided) {
        warn!("billing webhook signature mismatch");
        return Err(AppError::Unauthorized("invalid webhook signature".to_string()));
    }

    let event: BillingEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidArgument(format!("malformed event: {e}")))?;

    match event {
        BillingEvent::TokensPurchased {
            user_id,
            package,
            tokens,
            price,
        } => {
            TokenService::new(state.pool().clone())
                .record_purchase(user_id, &package, tokens, price)
                .await?;
        }
        other => {
            SubscriptionService::new(state.pool().clone())
                .handle_billing_event(other)
                .await?;
        }
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Verify an HMAC-SHA256 hex signature over the raw body.
fn verify_signature(body: &[u8], secret: &str, provided: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    let computed = hex::encode(mac.finalize().into_bytes());
    computed == provided.to_ascii_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn drained_balance_blocks_the_proxy() {
        let drained = BalanceSummary {
            free_remaining: 0,
            purchased_remaining: 0,
            total: 0,
        };
        assert!(!has_spendable_tokens(&drained));

        let funded = BalanceSummary {
            free_remaining: 1,
            purchased_remaining: 0,
            total: 1,
        };
        assert!(has_spendable_tokens(&funded));
    }

    #[test]
    fn valid_signature_verifies() {
        let body = br#"{"event":"payment.confirmed"}"#;
        let sig = sign(body, "whsec_test");
        assert!(verify_signature(body, "whsec_test", &sig));
    }

    #[test]
    fn uppercase_hex_signature_verifies() {
        let body = b"payload";
        let sig = sign(body, "whsec_test").to_ascii_uppercase();
        assert!(verify_signature(body, "whsec_test", &sig));
    }

    #[test]
    fn tampered_body_fails_verification() {
        let sig = sign(b"original", "whsec_test");
        assert!(!verify_signature(b"tampered", "whsec_test", &sig));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let body = b"payload";
        let sig = sign(body, "whsec_test");
        assert!(!verify_signature(body, "whsec_other", &sig));
    }
}
