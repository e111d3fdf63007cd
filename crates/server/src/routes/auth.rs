//! Session establishment.
//!
//! Authentication itself lives in an external identity provider; its
//! backend calls `/auth/session` server-to-server with an HMAC-signed
//! assertion to establish a session for a verified login. First login
//! provisions the user row with the configured free allowance.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tower_sessions::Session;
use tracing::{info, warn};

use botsmith_core::Email;

use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the assertion signature (hex HMAC-SHA256).
const SIGNATURE_HEADER: &str = "x-auth-signature";

/// A verified-login assertion from the identity provider.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAssertion {
    /// Identity provider's stable subject id.
    pub subject: String,
    /// Verified email address.
    pub email: String,
    /// Primary linked social account, when the provider knows one.
    pub primary_account: Option<String>,
}

/// POST /auth/session - establish a session from a signed assertion.
pub async fn create_session(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing assertion signature".to_string()))?;

    let secret = state.config().session_secret.expose_secret();
    if !verify_assertion(&body, secret, provided) {
        warn!("session assertion signature mismatch");
        return Err(AppError::Unauthorized("invalid assertion signature".to_string()));
    }

    let assertion: SessionAssertion = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidArgument(format!("malformed assertion: {e}")))?;
    let email = Email::parse(&assertion.email)
        .map_err(|e| AppError::InvalidArgument(format!("invalid email: {e}")))?;

    let users = UserRepository::new(state.pool());
    let user = match users.get_by_auth_subject(&assertion.subject).await? {
        Some(user) => user,
        None => {
            let user = users
                .create(&assertion.subject, state.config().free_token_allowance)
                .await?;
            info!(user_id = %user.id, "user provisioned on first login");
            user
        }
    };

    if let Some(account) = &assertion.primary_account
        && user.primary_account.as_deref() != Some(account)
    {
        users.set_primary_account(user.id, account).await?;
    }

    let current = CurrentUser {
        id: user.id,
        auth_subject: user.auth_subject,
        email,
    };
    session
        .insert(session_keys::CURRENT_USER, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;

    Ok(Json(json!({ "success": true, "data": { "userId": current.id } })))
}

/// POST /auth/logout - drop the current session.
pub async fn logout(
    RequireUser(_): RequireUser,
    session: Session,
) -> Result<Json<serde_json::Value>, AppError> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("session flush failed: {e}")))?;

    Ok(Json(json!({ "success": true })))
}

/// Verify an HMAC-SHA256 hex signature over the raw assertion body.
fn verify_assertion(body: &[u8], secret: &str, provided: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    hex::encode(mac.finalize().into_bytes()) == provided.to_ascii_lowercase()
}
