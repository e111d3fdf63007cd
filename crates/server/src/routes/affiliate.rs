//! Affiliate referral tracking endpoint.

use axum::{Json, extract::State};
use serde_json::json;

use crate::error::AppError;
use crate::services::AffiliateService;
use crate::services::affiliate::TrackReferralRequest;
use crate::state::AppState;

/// POST /affiliate/track-referral - record an attribution.
pub async fn track_referral(
    State(state): State<AppState>,
    Json(request): Json<TrackReferralRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let referral = AffiliateService::new(state.pool().clone())
        .track_referral(request)
        .await?;

    Ok(Json(json!({ "success": true, "referral": referral })))
}
