//! Instagram platform webhook.
//!
//! Receives follow/unfollow changes and inbound DMs for connected
//! accounts. Replies are never sent inline from this handler; they are
//! parked in the reply queue and go out when the rate-limit window
//! resets.

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
use tracing::{debug, warn};

use crate::db::followers::FollowerRepository;
use crate::error::AppError;
use crate::services::ReplyQueueService;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Meta's webhook signature header, `sha256=<hex>`.
const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// One webhook delivery, possibly batching several events.
#[derive(Debug, Deserialize)]
pub struct InstagramDelivery {
    #[serde(default)]
    pub entry: Vec<InstagramEntry>,
}

/// Events for one connected account.
#[derive(Debug, Deserialize)]
pub struct InstagramEntry {
    /// Connected account the events belong to.
    pub id: String,
    #[serde(default)]
    pub follows: Vec<FollowEvent>,
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

/// A follow or unfollow change.
#[derive(Debug, Deserialize)]
pub struct FollowEvent {
    pub follower_id: String,
    pub is_following: bool,
}

/// An inbound direct message.
#[derive(Debug, Deserialize)]
pub struct MessagingEvent {
    pub sender_id: String,
    /// Reply payload produced for this message.
    pub reply: serde_json::Value,
}

/// POST /webhooks/instagram - follow changes and inbound DMs.
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    // Signature is enforced only when an app secret is configured.
    if let Some(secret) = &state.config().instagram.app_secret
        && !verify_hub_signature(&body, secret.expose_secret(), &headers)
    {
        warn!("instagram webhook signature mismatch");
        return Err(AppError::Unauthorized("invalid webhook signature".to_string()));
    }

    let delivery: InstagramDelivery = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidArgument(format!("malformed delivery: {e}")))?;

    let followers = FollowerRepository::new(state.pool());
    let queue = ReplyQueueService::new(state.pool().clone(), &state.config().instagram);

    let mut followers_updated = 0u64;
    let mut replies_queued = 0u64;
    let mut replies_skipped = 0u64;

    for entry in &delivery.entry {
        for event in &entry.follows {
            followers
                .upsert(&entry.id, &event.follower_id, event.is_following)
                .await?;
            followers_updated += 1;
        }

        for event in &entry.messaging {
            // Auto-replies go only to senders known to follow the account.
            let is_follower = followers
                .get(&entry.id, &event.sender_id)
                .await?
                .is_some_and(|f| f.is_following);
            if is_follower {
                queue.enqueue(&entry.id, &event.sender_id, &event.reply).await?;
                replies_queued += 1;
            } else {
                debug!(owner = %entry.id, sender = %event.sender_id, "reply skipped for non-follower");
                replies_skipped += 1;
            }
        }
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "followersUpdated": followers_updated,
            "repliesQueued": replies_queued,
            "repliesSkipped": replies_skipped,
        },
    })))
}

/// Verify Meta's `sha256=<hex>` signature over the raw body.
fn verify_hub_signature(body: &[u8], secret: &str, headers: &HeaderMap) -> bool {
    let Some(provided) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("sha256="))
    else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    hex::encode(mac.finalize().into_bytes()) == provided.to_ascii_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn signed_headers(body: &[u8], secret: &str) -> HeaderMap {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let sig = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&sig).unwrap());
        headers
    }

    #[test]
    fn hub_signature_round_trip() {
        let body = br#"{"entry":[]}"#;
        let headers = signed_headers(body, "app_secret");
        assert!(verify_hub_signature(body, "app_secret", &headers));
        assert!(!verify_hub_signature(b"other", "app_secret", &headers));
    }

    #[test]
    fn missing_signature_header_fails() {
        assert!(!verify_hub_signature(b"body", "app_secret", &HeaderMap::new()));
    }

    #[test]
    fn delivery_parses_mixed_events() {
        let delivery: InstagramDelivery = serde_json::from_value(serde_json::json!({
            "entry": [{
                "id": "acct_1",
                "follows": [{ "follower_id": "f_9", "is_following": true }],
                "messaging": [{ "sender_id": "f_9", "reply": { "text": "hi" } }]
            }]
        }))
        .unwrap();

        assert_eq!(delivery.entry.len(), 1);
        assert_eq!(delivery.entry[0].follows.len(), 1);
        assert_eq!(delivery.entry[0].messaging.len(), 1);
    }
}
