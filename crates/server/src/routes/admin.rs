//! Owner-gated admin endpoints.
//!
//! Everything here requires the caller to be on the configured owner
//! allowlist; the `RequireOwner` extractor enforces the 401/403 split.

use axum::{Json, extract::{Query, State}};
use serde::{Deserialize, Serialize};
use serde_json::json;

use botsmith_core::{ChatbotKind, Email};

use crate::db::appointments::AppointmentRepository;
use crate::db::users::{User, UserRepository};
use crate::error::AppError;
use crate::middleware::RequireOwner;
use crate::services::SubscriptionService;
use crate::state::AppState;

/// A user row as exposed to the admin surface.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminUser {
    id: i32,
    auth_subject: String,
    primary_account: Option<String>,
    free_remaining: i32,
    purchased_remaining: i32,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for AdminUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            auth_subject: user.auth_subject,
            primary_account: user.primary_account,
            free_remaining: user.free_remaining,
            purchased_remaining: user.purchased_remaining,
            created_at: user.created_at,
        }
    }
}

/// GET /admin/appointments - list captured leads.
pub async fn appointments(
    State(state): State<AppState>,
    RequireOwner(_): RequireOwner,
) -> Result<Json<serde_json::Value>, AppError> {
    let rows = AppointmentRepository::new(state.pool()).list().await?;
    Ok(Json(json!({ "success": true, "data": rows })))
}

/// GET /admin/users - list all users with balances.
pub async fn users(
    State(state): State<AppState>,
    RequireOwner(_): RequireOwner,
) -> Result<Json<serde_json::Value>, AppError> {
    let rows = UserRepository::new(state.pool()).list().await?;
    let data: Vec<AdminUser> = rows.into_iter().map(AdminUser::from).collect();
    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /admin/web-subscriptions - subscriptions for web agents.
pub async fn web_subscriptions(
    State(state): State<AppState>,
    RequireOwner(_): RequireOwner,
) -> Result<Json<serde_json::Value>, AppError> {
    subscriptions_by_kind(&state, ChatbotKind::Web).await
}

/// GET /admin/insta-subscriptions - subscriptions for Instagram agents.
pub async fn insta_subscriptions(
    State(state): State<AppState>,
    RequireOwner(_): RequireOwner,
) -> Result<Json<serde_json::Value>, AppError> {
    subscriptions_by_kind(&state, ChatbotKind::Insta).await
}

async fn subscriptions_by_kind(
    state: &AppState,
    kind: ChatbotKind,
) -> Result<Json<serde_json::Value>, AppError> {
    let rows = SubscriptionService::new(state.pool().clone())
        .list_by_kind(kind)
        .await?;
    Ok(Json(json!({ "success": true, "data": rows })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyOwnerParams {
    email: Option<String>,
}

/// GET /admin/verify-owner?email= - explicit allowlist check.
///
/// Unlike the guarded endpoints this one answers for any asserted email;
/// a missing or unparseable `email` parameter is a 400.
pub async fn verify_owner(
    State(state): State<AppState>,
    Query(params): Query<VerifyOwnerParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let raw = params
        .email
        .ok_or_else(|| AppError::InvalidArgument("email parameter is required".to_string()))?;
    let email = Email::parse(&raw)
        .map_err(|e| AppError::InvalidArgument(format!("invalid email: {e}")))?;

    let is_owner = state.config().is_owner(email.as_str());
    let message = if is_owner {
        "Owner verified"
    } else {
        "Not an owner account"
    };

    Ok(Json(json!({
        "success": true,
        "isOwner": is_owner,
        "message": message,
    })))
}
