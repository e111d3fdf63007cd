//! Integration tests for Botsmith.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and run migrations
//! docker compose up -d postgres
//! cargo run -p botsmith-cli -- migrate
//!
//! # Start the server
//! cargo run -p botsmith-server
//!
//! # Run the (ignored-by-default) integration tests
//! cargo test -p botsmith-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `BOTSMITH_BASE_URL` - server under test (default `http://localhost:3000`)
//! - `CRON_SECRET` - must match the server's value for the cron tests
//! - `BILLING_WEBHOOK_SECRET` - must match for the billing webhook tests

/// Base URL for the API under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("BOTSMITH_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Build an HTTP client with a cookie store (for session endpoints).
///
/// # Panics
///
/// Panics if the client cannot be built; acceptable in test setup.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}
