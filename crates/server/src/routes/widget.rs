//! Widget entitlement check.
//!
//! Embedded widgets call this before rendering; the answer is driven by
//! the buyer's subscription state for the agent.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;

use botsmith_core::{ChatbotId, UserId};

use crate::error::AppError;
use crate::services::SubscriptionService;
use crate::state::AppState;

/// Widget validation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateWidgetRequest {
    pub agent_id: ChatbotId,
    pub user_id: UserId,
}

/// POST /validate-widget - is this agent live for this user?
///
/// The `isValid` value is the string `"true"`, matching what deployed
/// widget embeds already parse.
pub async fn validate(
    State(state): State<AppState>,
    Json(request): Json<ValidateWidgetRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let subscription = SubscriptionService::new(state.pool().clone())
        .agent_subscription(request.user_id, request.agent_id)
        .await?;

    if subscription.is_none() {
        return Err(AppError::Forbidden("no active subscription".to_string()));
    }

    Ok(Json(json!({ "isValid": "true" })))
}
