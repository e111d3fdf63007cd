//! Web chatbot management endpoints (session-gated).

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::json;

use botsmith_core::{ChatbotId, ChatbotKind};

use crate::db::chatbots::ChatbotRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ShowParams {
    id: ChatbotId,
}

/// GET /web/chatbot?id= - fetch one of the caller's chatbots.
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(params): Query<ShowParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let chatbot = ChatbotRepository::new(state.pool())
        .get_by_id(params.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("chatbot {}", params.id)))?;

    if chatbot.owner_id != user.id {
        return Err(AppError::Forbidden("chatbot belongs to another user".to_string()));
    }

    Ok(Json(json!({ "success": true, "data": chatbot })))
}

/// GET /web/chatbot/list - the caller's web chatbots, newest first.
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let chatbots = ChatbotRepository::new(state.pool())
        .list_for_owner(user.id, ChatbotKind::Web)
        .await?;

    Ok(Json(json!({ "success": true, "data": chatbots })))
}

/// New chatbot request body.
#[derive(Debug, Deserialize)]
pub struct CreateChatbotRequest {
    pub name: String,
    /// Free-form agent configuration, stored as JSONB.
    #[serde(default)]
    pub config: serde_json::Value,
}

/// POST /web/chatbot - create a web chatbot for the caller.
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(request): Json<CreateChatbotRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidArgument("name is required".to_string()));
    }

    let chatbot = ChatbotRepository::new(state.pool())
        .create(user.id, ChatbotKind::Web, request.name.trim(), &request.config)
        .await?;

    Ok(Json(json!({ "success": true, "data": chatbot })))
}
