//! Integration tests for the generation, gallery and billing endpoints.
//!
//! The provider is scripted to be ready on the first poll, so each
//! generation completes after one polling interval of paused time.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::*;
use stage_ai::adapters::stripe::MockPaymentGateway;

async fn signed_up_app() -> TestApp {
    let app = TestApp::new();
    app.send(identity_webhook("msg_1", &user_created("user_1", "ada@example.com")))
        .await;
    app.storage.put("user_1/room.jpg", vec![1, 2, 3]).await;
    app
}

fn generate_body(parent_id: Option<&str>) -> serde_json::Value {
    json!({
        "prompt": "Add mid-century furniture",
        "beforeImageRef": "user_1/room.jpg",
        "parentId": parent_id,
    })
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn requests_without_caller_are_unauthorized() {
    let app = TestApp::new();

    for uri in ["/api/profile", "/api/generations"] {
        let (status, body) = app.send(get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["kind"], "Unauthorized");
    }
}

#[tokio::test]
async fn health_needs_no_caller() {
    let app = TestApp::new();
    let response = tower::ServiceExt::oneshot(app.router.clone(), get("/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Generation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn generate_debits_one_credit_and_records_result() {
    let app = signed_up_app().await;

    let (status, body) = app
        .send(post_json("/api/generations", Some("user_1"), generate_body(None)))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["creditsRemaining"], 1);
    let result_ref = body["resultRef"].as_str().unwrap();
    assert!(result_ref.starts_with("user_1/results/"));
    assert!(app.storage.contains(result_ref).await);

    let (status, gallery) = app.send(get("/api/generations", Some("user_1"))).await;
    assert_eq!(status, StatusCode::OK);
    let items = gallery["generations"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["prompt"], "Add mid-century furniture");
    assert_eq!(items[0]["originalPath"], "user_1/room.jpg");
}

#[tokio::test(start_paused = true)]
async fn regeneration_links_to_parent() {
    let app = signed_up_app().await;
    let (_, first) = app
        .send(post_json("/api/generations", Some("user_1"), generate_body(None)))
        .await;
    let parent_id = first["generationId"].as_str().unwrap().to_string();

    let (status, second) = app
        .send(post_json("/api/generations", Some("user_1"), generate_body(Some(&parent_id))))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["parentId"], parent_id.as_str());
    assert_eq!(second["creditsRemaining"], 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_balance_is_payment_required() {
    let app = signed_up_app().await;
    for _ in 0..2 {
        let (status, _) = app
            .send(post_json("/api/generations", Some("user_1"), generate_body(None)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .send(post_json("/api/generations", Some("user_1"), generate_body(None)))
        .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["kind"], "InsufficientCredits");
    // The precheck refused before anything reached the provider.
    assert_eq!(app.provider.submissions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn generation_for_another_user_is_forbidden() {
    let app = signed_up_app().await;
    let mut body = generate_body(None);
    body["userId"] = json!("user_2");

    let (status, _) = app
        .send(post_json("/api/generations", Some("user_1"), body))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.provider.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn source_outside_caller_folder_is_rejected() {
    let app = signed_up_app().await;
    let mut body = generate_body(None);
    body["beforeImageRef"] = json!("user_2/room.jpg");

    let (status, body) = app
        .send(post_json("/api/generations", Some("user_1"), body))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "ValidationError");
}

#[tokio::test(start_paused = true)]
async fn generate_before_signup_webhook_uses_signup_credits() {
    let app = TestApp::new();
    app.storage.put("user_1/room.jpg", vec![1, 2, 3]).await;

    let (status, body) = app
        .send(post_json("/api/generations", Some("user_1"), generate_body(None)))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["creditsRemaining"], 1);
}

#[tokio::test(start_paused = true)]
async fn provider_that_never_finishes_times_out_without_debit() {
    let app = TestApp::with_parts(MockPaymentGateway::new(), stage_ai::adapters::flux::MockImageProvider::never_ready());
    app.send(identity_webhook("msg_1", &user_created("user_1", "ada@example.com")))
        .await;
    app.storage.put("user_1/room.jpg", vec![1]).await;

    let (status, body) = app
        .send(post_json("/api/generations", Some("user_1"), generate_body(None)))
        .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["kind"], "Timeout");
    let (_, profile) = app.send(get("/api/profile", Some("user_1"))).await;
    assert_eq!(profile["creditsRemaining"], 2);
}

// =============================================================================
// Gallery
// =============================================================================

#[tokio::test(start_paused = true)]
async fn delete_checks_ownership_and_removes_artifact() {
    let app = signed_up_app().await;
    let (_, created) = app
        .send(post_json("/api/generations", Some("user_1"), generate_body(None)))
        .await;
    let id = created["generationId"].as_str().unwrap().to_string();
    let result_ref = created["resultRef"].as_str().unwrap().to_string();
    let uri = format!("/api/generations/{}", id);

    let (status, _) = app.send(delete(&uri, "user_2")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(delete(&uri, "user_1")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!app.storage.contains(&result_ref).await);
    assert!(app.storage.contains("user_1/room.jpg").await);

    let (status, _) = app.send(delete(&uri, "user_1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, gallery) = app.send(get("/api/generations", Some("user_1"))).await;
    assert!(gallery["generations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn upload_url_is_scoped_to_caller_folder() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json("/api/uploads", Some("user_1"), json!({"fileName": "room.jpg"})))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["path"].as_str().unwrap().starts_with("user_1/"));
}

// =============================================================================
// Billing
// =============================================================================

#[tokio::test]
async fn profile_get_creates_missing_account() {
    let app = TestApp::new();

    let (status, body) = app.send(get("/api/profile", Some("user_9"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "user_9");
    assert_eq!(body["creditsRemaining"], 2);
}

#[tokio::test]
async fn checkout_returns_session_for_paid_plan() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json(
            "/api/billing/checkout",
            Some("user_1"),
            json!({"plan": "pro_individual"}),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://checkout.mock/user_1/pro_individual");
}

#[tokio::test]
async fn checkout_for_free_plan_is_rejected() {
    let app = TestApp::new();

    let (status, _) = app
        .send(post_json("/api/billing/checkout", Some("user_1"), json!({"plan": "free"})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
