//! Integration tests for the webhook endpoints.
//!
//! These drive the full router with signed identity deliveries and decoded
//! payment events, then read balances back through the profile endpoint:
//! 1. Signup creates the account exactly once
//! 2. Replayed payment events grant exactly once
//! 3. Authentication failures and malformed events get the right status

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::*;
use stage_ai::adapters::stripe::MockPaymentGateway;

async fn profile(app: &TestApp, user: &str) -> serde_json::Value {
    let (status, body) = app.send(get("/api/profile", Some(user))).await;
    assert_eq!(status, StatusCode::OK);
    body
}

// =============================================================================
// Identity Webhooks
// =============================================================================

#[tokio::test]
async fn signup_creates_account_with_signup_credits() {
    let app = TestApp::new();

    let (status, body) = app
        .send(identity_webhook("msg_1", &user_created("user_1", "ada@example.com")))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"received": true, "duplicate": false}));

    let profile = profile(&app, "user_1").await;
    assert_eq!(profile["creditsRemaining"], 2);
    assert_eq!(profile["subscriptionStatus"], "free");
    assert_eq!(profile["email"], "ada@example.com");
    assert_eq!(profile["displayName"], "Ada Lovelace");
}

#[tokio::test]
async fn redelivered_signup_is_acknowledged_as_duplicate() {
    let app = TestApp::new();
    let event = user_created("user_1", "ada@example.com");

    app.send(identity_webhook("msg_1", &event)).await;
    let (status, body) = app.send(identity_webhook("msg_1", &event)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duplicate"], true);
    assert_eq!(profile(&app, "user_1").await["creditsRemaining"], 2);
}

#[tokio::test]
async fn second_signup_delivery_does_not_reset_spent_credits() {
    let app = TestApp::new();
    app.send(identity_webhook("msg_1", &user_created("user_1", "ada@example.com")))
        .await;
    let user = stage_ai::domain::foundation::UserId::new("user_1").unwrap();
    app.ledger
        .debit_for_generation(&user, &stage_ai::domain::foundation::JobId::new())
        .await
        .unwrap();

    // A user.updated arrives under a different delivery id.
    let mut updated = user_created("user_1", "ada@new.example.com");
    updated["type"] = json!("user.updated");
    let (status, _) = app.send(identity_webhook("msg_2", &updated)).await;

    assert_eq!(status, StatusCode::OK);
    let profile = profile(&app, "user_1").await;
    assert_eq!(profile["creditsRemaining"], 1);
    assert_eq!(profile["email"], "ada@new.example.com");
}

#[tokio::test]
async fn tampered_identity_delivery_is_rejected() {
    let app = TestApp::new();
    let payload = user_created("user_1", "ada@example.com").to_string();
    let timestamp = chrono::Utc::now().timestamp();
    let signature = sign_identity("msg_1", timestamp, &payload);
    let tampered = payload.replace("user_1", "user_2");

    let (status, body) = app
        .send(identity_request("msg_1", timestamp, &signature, tampered))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "InvalidSignature");
}

#[tokio::test]
async fn stale_identity_delivery_is_rejected() {
    let app = TestApp::new();
    let payload = user_created("user_1", "ada@example.com").to_string();
    let timestamp = chrono::Utc::now().timestamp() - 3600;
    let signature = sign_identity("msg_1", timestamp, &payload);

    let (status, _) = app
        .send(identity_request("msg_1", timestamp, &signature, payload))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn identity_delivery_without_headers_is_bad_request() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json("/api/webhooks/identity", None, user_created("user_1", "a@b.c")))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BadRequest");
}

// =============================================================================
// Payment Webhooks
// =============================================================================

#[tokio::test]
async fn checkout_grants_plan_credits_once() {
    let app = TestApp::new();
    app.send(identity_webhook("msg_1", &user_created("user_1", "ada@example.com")))
        .await;
    let event = checkout_completed("evt_1", Some("user_1"), None, "Pro Individual");

    let (first, _) = app.send(payment_webhook(&event)).await;
    let (second, body) = app.send(payment_webhook(&event)).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(body["duplicate"], true);

    let profile = profile(&app, "user_1").await;
    assert_eq!(profile["subscriptionStatus"], "pro_individual");
    assert_eq!(profile["creditsRemaining"], 25);
}

#[tokio::test]
async fn checkout_without_user_id_resolves_by_email() {
    let app = TestApp::new();
    app.send(identity_webhook("msg_1", &user_created("user_1", "ada@example.com")))
        .await;

    let (status, _) = app
        .send(payment_webhook(&checkout_completed(
            "evt_1",
            None,
            Some("ada@example.com"),
            "Pro Agency",
        )))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile(&app, "user_1").await["subscriptionStatus"], "pro_agency");
}

#[tokio::test]
async fn checkout_for_unknown_customer_is_acknowledged_unapplied() {
    let app = TestApp::new();
    let event = checkout_completed("evt_1", None, Some("nobody@example.com"), "Pro Individual");

    let (status, body) = app.send(payment_webhook(&event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert!(body["error"].is_string());

    // Failed events are final; a redelivery is skipped.
    let (status, body) = app.send(payment_webhook(&event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duplicate"], true);
}

#[tokio::test]
async fn cancellation_returns_account_to_free_tier() {
    let app = TestApp::new();
    app.send(identity_webhook("msg_1", &user_created("user_1", "ada@example.com")))
        .await;
    app.send(payment_webhook(&checkout_completed(
        "evt_1",
        Some("user_1"),
        None,
        "Pro Individual",
    )))
    .await;

    let (status, _) = app.send(payment_webhook(&subscription_deleted("evt_2", "user_1"))).await;

    assert_eq!(status, StatusCode::OK);
    let profile = profile(&app, "user_1").await;
    assert_eq!(profile["subscriptionStatus"], "free");
    assert_eq!(profile["creditsRemaining"], 2);
    assert_eq!(profile["maxGenerations"], 2);
}

#[tokio::test]
async fn unknown_payment_event_type_is_acknowledged() {
    let app = TestApp::new();
    let event = json!({
        "id": "evt_9",
        "type": "invoice.payment_failed",
        "data": { "object": {} }
    });

    let (status, body) = app.send(payment_webhook(&event)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duplicate"], false);
}

#[tokio::test]
async fn bad_payment_signature_is_unauthorized() {
    let app = TestApp::with_gateway(MockPaymentGateway::rejecting_webhooks());

    let (status, body) = app
        .send(payment_webhook(&checkout_completed("evt_1", Some("user_1"), None, "Pro Individual")))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "InvalidSignature");
}

#[tokio::test]
async fn payment_delivery_without_signature_header_is_bad_request() {
    let app = TestApp::new();

    let (status, _) = app
        .send(post_json(
            "/api/webhooks/payment",
            None,
            checkout_completed("evt_1", Some("user_1"), None, "Pro Individual"),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
