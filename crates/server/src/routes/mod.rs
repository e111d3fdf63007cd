//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (DB ping)
//!
//! # Sessions
//! POST /auth/session               - Establish session (signed assertion)
//! POST /auth/logout                - Drop session
//!
//! # Admin (owner-gated)
//! GET  /admin/appointments?email=  - Appointment leads
//! GET  /admin/users                - All users
//! GET  /admin/web-subscriptions    - Subscriptions for web agents
//! GET  /admin/insta-subscriptions  - Subscriptions for Instagram agents
//! GET  /admin/verify-owner?email=  - Explicit owner check
//!
//! # Affiliate
//! POST /affiliate/track-referral   - Record an attribution
//!
//! # Maintenance
//! POST /cron                       - Scheduled maintenance (Bearer secret)
//! GET  /reset-window?secret=       - Rate-limit window reset + queue drain
//!
//! # Tokens (session)
//! GET  /tokens/balance             - Current balances
//! GET  /tokens/purchases           - Purchase history
//! GET  /tokens/usage?period=&chatbotId= - Bucketed usage
//! POST /tokens/reset-free          - Reset own free balance
//!
//! # Chatbots (session)
//! GET  /web/chatbot?id=            - One chatbot
//! GET  /web/chatbot/list           - Own chatbots
//! POST /web/chatbot                - Create a chatbot
//!
//! # Catalog
//! GET  /plans                      - Plan catalog
//! GET  /plans/{product_id}         - One plan
//!
//! # Leads
//! POST /appointments               - Lead capture
//!
//! # Widget / webhooks
//! POST /validate-widget            - Widget entitlement check
//! POST /webhooks/agent             - Agent chat proxy (metered)
//! POST /webhooks/billing           - Payment provider events (HMAC)
//! POST /webhooks/instagram         - Follow changes + inbound DMs
//! ```

pub mod admin;
pub mod affiliate;
pub mod auth;
pub mod appointments;
pub mod chatbots;
pub mod cron;
pub mod health;
pub mod instagram;
pub mod plans;
pub mod tokens;
pub mod webhooks;
pub mod widget;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(admin::appointments))
        .route("/users", get(admin::users))
        .route("/web-subscriptions", get(admin::web_subscriptions))
        .route("/insta-subscriptions", get(admin::insta_subscriptions))
        .route("/verify-owner", get(admin::verify_owner))
}

/// Create the token routes router.
pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/balance", get(tokens::balance))
        .route("/purchases", get(tokens::purchases))
        .route("/usage", get(tokens::usage))
        .route("/reset-free", post(tokens::reset_free))
}

/// Create the web chatbot routes router.
pub fn chatbot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(chatbots::show).post(chatbots::create))
        .route("/list", get(chatbots::list))
}

/// Assemble the full application router.
pub fn app_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .nest("/admin", admin_routes())
        .nest("/tokens", token_routes())
        .nest("/web/chatbot", chatbot_routes())
        .route("/auth/session", post(auth::create_session))
        .route("/auth/logout", post(auth::logout))
        .route("/affiliate/track-referral", post(affiliate::track_referral))
        .route("/appointments", post(appointments::create))
        .route("/plans", get(plans::list))
        .route("/plans/{product_id}", get(plans::show))
        .route("/cron", post(cron::run))
        .route("/reset-window", get(cron::reset_window))
        .route("/validate-widget", post(widget::validate))
        .route("/webhooks/agent", post(webhooks::agent))
        .route("/webhooks/billing", post(webhooks::billing))
        .route("/webhooks/instagram", post(instagram::receive))
}
