//! Integration tests for the billing webhook and the subscription state
//! machine it drives.
//!
//! These tests require:
//! - A running server with `BILLING_WEBHOOK_SECRET` matching the
//!   environment variable here
//! - A user and chatbot provisioned (botsmith-cli user create, then a
//!   chatbot row for that user)
//!
//! Run with: cargo test -p botsmith-integration-tests -- --ignored

use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use serde_json::{Value, json};
use sha2::Sha256;
use uuid::Uuid;

use botsmith_integration_tests::{base_url, client};

type HmacSha256 = Hmac<Sha256>;

fn webhook_secret() -> String {
    std::env::var("BILLING_WEBHOOK_SECRET")
        .expect("BILLING_WEBHOOK_SECRET must be set for webhook tests")
}

fn sign(body: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(webhook_secret().as_bytes()).expect("HMAC key of any size");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

async fn deliver(body: &str, signature: &str) -> reqwest::Response {
    client()
        .post(format!("{}/webhooks/billing", base_url()))
        .header("x-billing-signature", signature)
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("Failed to deliver webhook")
}

#[tokio::test]
#[ignore = "Requires running server and matching BILLING_WEBHOOK_SECRET"]
async fn test_unsigned_webhook_is_401() {
    let body = json!({
        "event": "subscription.cancelled",
        "data": { "billing_id": "bil_unsigned" }
    })
    .to_string();

    let resp = client()
        .post(format!("{}/webhooks/billing", base_url()))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("Failed to deliver webhook");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and matching BILLING_WEBHOOK_SECRET"]
async fn test_tampered_webhook_is_401() {
    let body = json!({
        "event": "subscription.cancelled",
        "data": { "billing_id": "bil_tampered" }
    })
    .to_string();
    let signature = sign(&body);
    let tampered = body.replace("bil_tampered", "bil_other");

    let resp = deliver(&tampered, &signature).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server, database, and a provisioned user + chatbot"]
async fn test_full_subscription_lifecycle() {
    let billing_id = format!("bil_{}", Uuid::new_v4());
    let user_id: i32 = std::env::var("TEST_USER_ID")
        .expect("TEST_USER_ID must be set")
        .parse()
        .expect("TEST_USER_ID must be an integer");
    let chatbot_id: i32 = std::env::var("TEST_CHATBOT_ID")
        .expect("TEST_CHATBOT_ID must be set")
        .parse()
        .expect("TEST_CHATBOT_ID must be an integer");

    // Checkout creates a pending subscription.
    let body = json!({
        "event": "checkout.created",
        "data": { "billing_id": billing_id, "user_id": user_id, "chatbot_id": chatbot_id }
    })
    .to_string();
    let resp = deliver(&body, &sign(&body)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Pending subscriptions do not validate the widget.
    let resp = client()
        .post(format!("{}/validate-widget", base_url()))
        .json(&json!({ "agentId": chatbot_id, "userId": user_id }))
        .send()
        .await
        .expect("Failed to validate widget");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Payment confirmation activates it.
    let body = json!({
        "event": "payment.confirmed",
        "data": { "billing_id": billing_id, "period_days": 30 }
    })
    .to_string();
    let resp = deliver(&body, &sign(&body)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client()
        .post(format!("{}/validate-widget", base_url()))
        .json(&json!({ "agentId": chatbot_id, "userId": user_id }))
        .send()
        .await
        .expect("Failed to validate widget");
    assert_eq!(resp.status(), StatusCode::OK);
    let valid: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(valid["isValid"], json!("true"));

    // Cancellation expires it, and expiry is terminal: a replayed payment
    // confirmation must not reactivate.
    let body = json!({
        "event": "subscription.cancelled",
        "data": { "billing_id": billing_id }
    })
    .to_string();
    let resp = deliver(&body, &sign(&body)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json!({
        "event": "payment.confirmed",
        "data": { "billing_id": billing_id }
    })
    .to_string();
    let resp = deliver(&body, &sign(&body)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client()
        .post(format!("{}/validate-widget", base_url()))
        .json(&json!({ "agentId": chatbot_id, "userId": user_id }))
        .send()
        .await
        .expect("Failed to validate widget");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
