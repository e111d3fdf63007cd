//! Integration tests for the owner allowlist guard.
//!
//! These tests require:
//! - A running server with `OWNER_EMAILS=owner@example.com`
//!
//! Run with: cargo test -p botsmith-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use botsmith_integration_tests::{base_url, client};

/// Owner email the server under test is configured with.
fn owner_email() -> String {
    std::env::var("TEST_OWNER_EMAIL").unwrap_or_else(|_| "owner@example.com".to_string())
}

#[tokio::test]
#[ignore = "Requires running server configured with OWNER_EMAILS"]
async fn test_admin_users_without_identity_is_401() {
    let resp = client()
        .get(format!("{}/admin/users", base_url()))
        .send()
        .await
        .expect("Failed to call admin endpoint");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
#[ignore = "Requires running server configured with OWNER_EMAILS"]
async fn test_admin_users_with_non_owner_identity_is_403() {
    let resp = client()
        .get(format!(
            "{}/admin/users?email=stranger@example.com",
            base_url()
        ))
        .send()
        .await
        .expect("Failed to call admin endpoint");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server configured with OWNER_EMAILS"]
async fn test_admin_users_with_owner_identity_is_200() {
    let resp = client()
        .get(format!("{}/admin/users?email={}", base_url(), owner_email()))
        .send()
        .await
        .expect("Failed to call admin endpoint");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], json!(true));
    assert!(body["data"].is_array());
}

#[tokio::test]
#[ignore = "Requires running server configured with OWNER_EMAILS"]
async fn test_verify_owner_answers_for_any_email() {
    let resp = client()
        .get(format!(
            "{}/admin/verify-owner?email={}",
            base_url(),
            owner_email()
        ))
        .send()
        .await
        .expect("Failed to call verify-owner");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["isOwner"], json!(true));

    let resp = client()
        .get(format!(
            "{}/admin/verify-owner?email=stranger@example.com",
            base_url()
        ))
        .send()
        .await
        .expect("Failed to call verify-owner");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["isOwner"], json!(false));
}

#[tokio::test]
#[ignore = "Requires running server configured with OWNER_EMAILS"]
async fn test_verify_owner_without_email_is_400() {
    let resp = client()
        .get(format!("{}/admin/verify-owner", base_url()))
        .send()
        .await
        .expect("Failed to call verify-owner");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
