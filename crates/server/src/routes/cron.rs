//! Scheduled maintenance endpoints.
//!
//! Both endpoints are invoked by an external scheduler and authenticate
//! with shared secrets rather than sessions.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, header::AUTHORIZATION},
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::db::followers::FollowerRepository;
use crate::error::AppError;
use crate::services::{ReplyQueueService, SubscriptionService, TokenService};
use crate::state::AppState;

/// Terminal queue entries older than this are deleted by the nightly job.
const QUEUE_MAX_AGE_DAYS: i32 = 7;

/// Pending subscriptions older than this are treated as abandoned checkouts.
const PENDING_MAX_AGE_DAYS: i32 = 1;

/// POST /cron - nightly maintenance.
///
/// Runs each job independently: a failing job is logged and reported as
/// `null` in the response without stopping the others.
pub async fn run(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_bearer(&headers, state.config().cron_secret.expose_secret())?;

    let pool = state.pool().clone();

    let coupons_reset = match TokenService::new(pool.clone()).reset_all_free().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "cron: free-coupon reset failed");
            None
        }
    };

    let subscriptions_expired = match SubscriptionService::new(pool.clone()).expire_lapsed().await
    {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "cron: subscription expiry sweep failed");
            None
        }
    };

    let checkouts_expired = match SubscriptionService::new(pool.clone())
        .expire_abandoned(PENDING_MAX_AGE_DAYS)
        .await
    {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "cron: checkout timeout sweep failed");
            None
        }
    };

    let followers_purged = match FollowerRepository::new(state.pool()).purge_stale().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "cron: follower retention purge failed");
            None
        }
    };

    let queue_service = ReplyQueueService::new(pool, &state.config().instagram);
    let queue_deleted = match queue_service.cleanup(QUEUE_MAX_AGE_DAYS).await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "cron: queue cleanup failed");
            None
        }
    };

    Ok(Json(json!({
        "success": true,
        "message": "Maintenance jobs completed",
        "data": {
            "couponsReset": coupons_reset,
            "subscriptionsExpired": subscriptions_expired,
            "checkoutsExpired": checkouts_expired,
            "followersPurged": followers_purged,
            "queueEntriesDeleted": queue_deleted,
        },
        "timestamp": Utc::now(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResetWindowParams {
    secret: Option<String>,
}

/// GET /reset-window?secret= - rate-limit window reset and queue drain.
pub async fn reset_window(
    State(state): State<AppState>,
    Query(params): Query<ResetWindowParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let provided = params
        .secret
        .ok_or_else(|| AppError::Unauthorized("secret is required".to_string()))?;
    if provided != state.config().cron_secret.expose_secret() {
        return Err(AppError::Unauthorized("invalid secret".to_string()));
    }

    let report = ReplyQueueService::new(state.pool().clone(), &state.config().instagram)
        .reset_window_and_drain()
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": report,
        "timestamp": Utc::now(),
    })))
}

/// Check a `Bearer <secret>` authorization header.
fn require_bearer(headers: &HeaderMap, secret: &str) -> Result<(), AppError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    if token != secret {
        return Err(AppError::Unauthorized("invalid bearer token".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_check_accepts_matching_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert!(require_bearer(&headers, "s3cret").is_ok());
    }

    #[test]
    fn bearer_check_rejects_missing_or_wrong_token() {
        let headers = HeaderMap::new();
        assert!(require_bearer(&headers, "s3cret").is_err());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
        assert!(require_bearer(&headers, "s3cret").is_err());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("s3cret"));
        assert!(require_bearer(&headers, "s3cret").is_err());
    }
}
