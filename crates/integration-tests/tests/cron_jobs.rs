//! Integration tests for the scheduled maintenance endpoints.
//!
//! These tests require:
//! - A running server with `CRON_SECRET` set to the same value as the
//!   `CRON_SECRET` environment variable here
//!
//! Run with: cargo test -p botsmith-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use botsmith_integration_tests::{base_url, client};

fn cron_secret() -> String {
    std::env::var("CRON_SECRET").expect("CRON_SECRET must be set for cron tests")
}

#[tokio::test]
#[ignore = "Requires running server and matching CRON_SECRET"]
async fn test_cron_without_bearer_is_401() {
    let resp = client()
        .post(format!("{}/cron", base_url()))
        .send()
        .await
        .expect("Failed to call cron");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and matching CRON_SECRET"]
async fn test_cron_with_bearer_reports_job_counts() {
    let resp = client()
        .post(format!("{}/cron", base_url()))
        .bearer_auth(cron_secret())
        .send()
        .await
        .expect("Failed to call cron");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], json!(true));
    assert!(body["message"].is_string());
    assert!(body["data"]["couponsReset"].is_number());
    assert!(body["data"]["subscriptionsExpired"].is_number());
    assert!(body["data"]["checkoutsExpired"].is_number());
    assert!(body["data"]["followersPurged"].is_number());
    assert!(body["data"]["queueEntriesDeleted"].is_number());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
#[ignore = "Requires running server and matching CRON_SECRET"]
async fn test_queue_cleanup_second_run_deletes_nothing() {
    let client = client();

    let first = client
        .post(format!("{}/cron", base_url()))
        .bearer_auth(cron_secret())
        .send()
        .await
        .expect("Failed to call cron");
    assert_eq!(first.status(), StatusCode::OK);

    // Immediately repeated, nothing new has aged past the cutoff.
    let second = client
        .post(format!("{}/cron", base_url()))
        .bearer_auth(cron_secret())
        .send()
        .await
        .expect("Failed to call cron");
    assert_eq!(second.status(), StatusCode::OK);

    let body: Value = second.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["queueEntriesDeleted"], json!(0));
    // The first run already timed out any abandoned checkouts.
    assert_eq!(body["data"]["checkoutsExpired"], json!(0));
}

#[tokio::test]
#[ignore = "Requires running server and matching CRON_SECRET"]
async fn test_reset_window_with_wrong_secret_is_401() {
    let resp = client()
        .get(format!("{}/reset-window?secret=wrong", base_url()))
        .send()
        .await
        .expect("Failed to call reset-window");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and matching CRON_SECRET"]
async fn test_reset_window_drains_queue() {
    let resp = client()
        .get(format!(
            "{}/reset-window?secret={}",
            base_url(),
            cron_secret()
        ))
        .send()
        .await
        .expect("Failed to call reset-window");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], json!(true));
    assert!(body["data"]["claimed"].is_number());
    assert!(body["data"]["dispatched"].is_number());
    assert!(body["timestamp"].is_string());
}
