//! Token balance and usage endpoints (session-gated).

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::json;

use botsmith_core::{ChatbotId, UsagePeriod};

use crate::db::tokens::TokenLedgerRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::services::TokenService;
use crate::state::AppState;

/// GET /tokens/balance - the caller's current balances.
pub async fn balance(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let summary = TokenService::new(state.pool().clone()).balance(user.id).await?;
    Ok(Json(json!({ "success": true, "data": summary })))
}

/// GET /tokens/purchases - the caller's purchase history, newest first.
pub async fn purchases(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let rows = TokenLedgerRepository::new(state.pool())
        .list_purchases(user.id)
        .await?;
    Ok(Json(json!({ "success": true, "data": rows })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageParams {
    /// Reporting period; defaults to a month.
    period: Option<String>,
    /// Optional scope to one chatbot (ownership enforced).
    chatbot_id: Option<ChatbotId>,
}

/// GET /tokens/usage?period=&chatbotId= - bucketed consumption.
pub async fn usage(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(params): Query<UsageParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let period = match params.period.as_deref() {
        None | Some("") => UsagePeriod::default(),
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::InvalidArgument(format!("unknown period: {raw}")))?,
    };

    let service = TokenService::new(state.pool().clone());
    let stats = match params.chatbot_id {
        Some(chatbot_id) => service.chatbot_usage(user.id, chatbot_id, period).await?,
        None => service.usage_stats(user.id, period, None).await?,
    };

    Ok(Json(json!({ "success": true, "data": stats })))
}

/// POST /tokens/reset-free - reset the caller's free balance.
pub async fn reset_free(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = TokenService::new(state.pool().clone());
    service.reset_free(user.id).await?;
    let summary = service.balance(user.id).await?;
    Ok(Json(json!({ "success": true, "data": summary })))
}
