//! Integration tests for affiliate referral tracking.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p botsmith-server)
//!
//! Run with: cargo test -p botsmith-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use botsmith_integration_tests::{base_url, client};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_track_referral_happy_path() {
    let client = client();
    let billing_id = format!("bil_{}", Uuid::new_v4());

    let resp = client
        .post(format!("{}/affiliate/track-referral", base_url()))
        .json(&json!({
            "subscriptionId": billing_id,
            "affiliateCode": "PARTNER10",
            "buyerId": "acct_test",
            "amount": "49.99",
        }))
        .send()
        .await
        .expect("Failed to send referral");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["referral"]["affiliate_code"], json!("PARTNER10"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_track_referral_missing_amount_is_400() {
    let client = client();

    let resp = client
        .post(format!("{}/affiliate/track-referral", base_url()))
        .json(&json!({
            "subscriptionId": "bil_x",
            "affiliateCode": "PARTNER10",
            "buyerId": "acct_test",
        }))
        .send()
        .await
        .expect("Failed to send referral");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Missing required fields"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_track_referral_zero_amount_is_400() {
    let client = client();

    let resp = client
        .post(format!("{}/affiliate/track-referral", base_url()))
        .json(&json!({
            "subscriptionId": "bil_x",
            "affiliateCode": "PARTNER10",
            "buyerId": "acct_test",
            "amount": "0",
        }))
        .send()
        .await
        .expect("Failed to send referral");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
