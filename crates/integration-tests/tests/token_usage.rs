//! Integration tests for the session flow and the token endpoints.
//!
//! These tests require:
//! - A running server with `BOTSMITH_SESSION_SECRET` matching the
//!   environment variable here
//!
//! Run with: cargo test -p botsmith-integration-tests -- --ignored

use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use serde_json::{Value, json};
use sha2::Sha256;
use uuid::Uuid;

use botsmith_integration_tests::{base_url, client};

type HmacSha256 = Hmac<Sha256>;

fn session_secret() -> String {
    std::env::var("BOTSMITH_SESSION_SECRET")
        .expect("BOTSMITH_SESSION_SECRET must be set for session tests")
}

fn sign(body: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(session_secret().as_bytes()).expect("HMAC key of any size");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Establish a session for a fresh user and return the logged-in client.
async fn login(http: &reqwest::Client) -> Value {
    let subject = format!("test|{}", Uuid::new_v4());
    let body = json!({
        "subject": subject,
        "email": format!("{subject}@example.com").replace('|', "-"),
    })
    .to_string();

    let response = http
        .post(format!("{}/auth/session", base_url()))
        .header("x-auth-signature", sign(&body))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("Failed to establish session");
    assert_eq!(response.status(), StatusCode::OK);

    response.json().await.expect("Invalid session response")
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn session_assertion_with_bad_signature_is_rejected() {
    let body = json!({
        "subject": "test|tampered",
        "email": "tampered@example.com",
    })
    .to_string();

    let response = client()
        .post(format!("{}/auth/session", base_url()))
        .header("x-auth-signature", "0".repeat(64))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("Failed to send assertion");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn token_endpoints_require_a_session() {
    let response = client()
        .get(format!("{}/tokens/balance", base_url()))
        .send()
        .await
        .expect("Failed to request balance");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn fresh_user_gets_allowance_and_zeroed_usage() {
    let http = client();
    login(&http).await;

    // First login provisions the free allowance.
    let balance: Value = http
        .get(format!("{}/tokens/balance", base_url()))
        .send()
        .await
        .expect("Failed to request balance")
        .json()
        .await
        .expect("Invalid balance response");
    assert_eq!(balance["success"], json!(true));
    assert!(balance["data"]["freeRemaining"].as_i64().unwrap_or(-1) > 0);
    assert_eq!(balance["data"]["purchasedRemaining"], json!(0));

    // A window with no consumption is zeroed buckets, never an error.
    let usage: Value = http
        .get(format!("{}/tokens/usage?period=week", base_url()))
        .send()
        .await
        .expect("Failed to request usage")
        .json()
        .await
        .expect("Invalid usage response");
    assert_eq!(usage["success"], json!(true));
    assert_eq!(usage["data"]["total"], json!(0));

    let buckets = usage["data"]["buckets"]
        .as_array()
        .expect("buckets must be an array");
    assert_eq!(buckets.len(), 7);
    assert!(buckets.iter().all(|b| b["tokens"] == json!(0)));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn reset_free_returns_full_allowance() {
    let http = client();
    login(&http).await;

    let response: Value = http
        .post(format!("{}/tokens/reset-free", base_url()))
        .send()
        .await
        .expect("Failed to reset free balance")
        .json()
        .await
        .expect("Invalid reset response");

    assert_eq!(response["success"], json!(true));
    let free = response["data"]["freeRemaining"].as_i64().unwrap_or(-1);
    assert!(free > 0, "reset must restore the allowance, got {free}");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn logout_drops_the_session() {
    let http = client();
    login(&http).await;

    let response = http
        .post(format!("{}/auth/logout", base_url()))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(response.status(), StatusCode::OK);

    let response = http
        .get(format!("{}/tokens/balance", base_url()))
        .send()
        .await
        .expect("Failed to request balance");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
