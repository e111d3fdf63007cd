//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user, and for gating the
//! admin surface to configured owner accounts.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use tower_sessions::Session;

use botsmith_core::Email;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// Rejects with a 401 JSON envelope when no session identity is present.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireUser(user): RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))?;

        Ok(Self(user))
    }
}

/// Identity asserted for an owner-gated request.
#[derive(Debug, Clone)]
pub struct OwnerIdentity {
    /// Email that matched the owner allowlist.
    pub email: Email,
}

/// Extractor that requires the caller to be a configured owner.
///
/// The caller's identity comes from the `email` query parameter or, failing
/// that, the session. A missing identity rejects with 401; an identity not
/// on the `OWNER_EMAILS` allowlist rejects with 403.
pub struct RequireOwner(pub OwnerIdentity);

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let email = identity_from_parts(parts)
            .await
            .ok_or_else(|| AppError::Unauthorized("owner identity required".to_string()))?;

        if !state.config().is_owner(email.as_str()) {
            tracing::warn!(email = %email, "owner access denied");
            return Err(AppError::Forbidden("not an owner account".to_string()));
        }

        Ok(Self(OwnerIdentity { email }))
    }
}

/// Pull the caller's asserted email from the query string or the session.
async fn identity_from_parts(parts: &mut Parts) -> Option<Email> {
    if let Some(email) = email_from_query(parts.uri.query()) {
        return Some(email);
    }

    let session = parts.extensions.get::<Session>()?;
    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()?;

    Some(user.email)
}

fn email_from_query(query: Option<&str>) -> Option<Email> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "email")
        .and_then(|(_, value)| Email::parse(&value).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn email_from_query_finds_email_param() {
        let email = email_from_query(Some("email=owner%40example.com&x=1")).unwrap();
        assert_eq!(email.as_str(), "owner@example.com");
    }

    #[test]
    fn email_from_query_missing_param() {
        assert!(email_from_query(Some("x=1")).is_none());
        assert!(email_from_query(None).is_none());
    }

    #[test]
    fn email_from_query_rejects_invalid_email() {
        assert!(email_from_query(Some("email=not-an-email")).is_none());
    }
}
