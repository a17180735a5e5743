//! Shared harness for the HTTP integration tests.
//!
//! Builds the full router over in-memory adapters. Identity deliveries are
//! verified by the real Clerk verifier, so tests sign them with the shared
//! secret; payment deliveries go through the mock gateway, which decodes
//! real Stripe envelopes without checking signatures.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;

use stage_ai::adapters::clerk::ClerkWebhookVerifier;
use stage_ai::adapters::flux::MockImageProvider;
use stage_ai::adapters::http::{api_router, AppState, SessionAuth};
use stage_ai::adapters::memory::{
    InMemoryGenerationRepository, InMemoryJobCheckpointStore, InMemoryLedgerStore,
    InMemoryObjectStorage, InMemorySubscriptionEventStore,
};
use stage_ai::adapters::stripe::MockPaymentGateway;
use stage_ai::application::services::{CreditLedgerEngine, IdempotencyGuard, JobOrchestrator};
use stage_ai::domain::billing::CreditPolicy;
use stage_ai::domain::generation::PollingPolicy;
use stage_ai::ports::ProviderStatus;

pub const IDENTITY_SECRET: &str = "whsec_c3RhZ2UtYWktdGVzdC1rZXk=";

// =============================================================================
// Test Application
// =============================================================================

pub struct TestApp {
    pub router: Router,
    pub storage: InMemoryObjectStorage,
    pub provider: MockImageProvider,
    pub generations: InMemoryGenerationRepository,
    pub ledger: Arc<CreditLedgerEngine>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_parts(MockPaymentGateway::new(), ready_provider(4))
    }

    pub fn with_gateway(gateway: MockPaymentGateway) -> Self {
        Self::with_parts(gateway, ready_provider(4))
    }

    pub fn with_parts(gateway: MockPaymentGateway, provider: MockImageProvider) -> Self {
        let storage = InMemoryObjectStorage::new();
        let generations = InMemoryGenerationRepository::new();

        let guard = Arc::new(IdempotencyGuard::new(Arc::new(
            InMemorySubscriptionEventStore::new(),
        )));
        let ledger = Arc::new(CreditLedgerEngine::new(
            Arc::new(InMemoryLedgerStore::new()),
            guard.clone(),
            CreditPolicy::default(),
        ));
        let orchestrator = Arc::new(
            JobOrchestrator::new(
                ledger.clone(),
                Arc::new(provider.clone()),
                Arc::new(storage.clone()),
                Arc::new(generations.clone()),
                Arc::new(InMemoryJobCheckpointStore::new()),
            )
            .with_polling(PollingPolicy {
                interval: Duration::from_millis(10),
                max_attempts: 5,
            }),
        );

        let state = AppState {
            ledger: ledger.clone(),
            guard,
            orchestrator,
            payment_gateway: Arc::new(gateway),
            identity_verifier: Arc::new(
                ClerkWebhookVerifier::new(IDENTITY_SECRET).expect("valid test secret"),
            ),
            storage: Arc::new(storage.clone()),
            generations: Arc::new(generations.clone()),
            session_auth: SessionAuth::dev_header(),
            signed_url_ttl_secs: 600,
        };

        Self {
            router: api_router(state),
            storage,
            provider,
            generations,
            ledger,
        }
    }

    /// Sends one request and returns the status with the parsed JSON body
    /// (`Value::Null` for an empty body).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body is JSON")
        };
        (status, body)
    }
}

/// A provider that is ready on the first poll of each of `jobs` jobs.
pub fn ready_provider(jobs: usize) -> MockImageProvider {
    (0..jobs).fold(MockImageProvider::new(), |provider, _| {
        provider.with_poll(Ok(ProviderStatus::Ready {
            sample_url: "https://mock.provider/sample.png".to_string(),
        }))
    })
    .with_result_bytes(vec![0x89, 0x50, 0x4e, 0x47])
}

// =============================================================================
// Request Builders
// =============================================================================

pub fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::empty()).expect("valid request")
}

pub fn delete(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("x-user-id", user)
        .body(Body::empty())
        .expect("valid request")
}

pub fn post_json(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub fn payment_webhook(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/webhooks/payment")
        .header("stripe-signature", "t=1700000000,v1=mock")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// An identity delivery signed with [`IDENTITY_SECRET`].
pub fn identity_webhook(message_id: &str, body: &Value) -> Request<Body> {
    let payload = body.to_string();
    let timestamp = chrono::Utc::now().timestamp();
    let signature = sign_identity(message_id, timestamp, &payload);
    identity_request(message_id, timestamp, &signature, payload)
}

pub fn identity_request(
    message_id: &str,
    timestamp: i64,
    signature: &str,
    payload: String,
) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/webhooks/identity")
        .header("svix-id", message_id)
        .header("svix-timestamp", timestamp.to_string())
        .header("svix-signature", signature)
        .body(Body::from(payload))
        .expect("valid request")
}

pub fn sign_identity(message_id: &str, timestamp: i64, payload: &str) -> String {
    let key = STANDARD
        .decode(IDENTITY_SECRET.trim_start_matches("whsec_"))
        .expect("secret is base64");
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).expect("any key length works");
    mac.update(format!("{}.{}.{}", message_id, timestamp, payload).as_bytes());
    format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
}

// =============================================================================
// Event Fixtures
// =============================================================================

pub fn user_created(user_id: &str, email: &str) -> Value {
    serde_json::json!({
        "type": "user.created",
        "data": {
            "id": user_id,
            "email_addresses": [{ "email_address": email }],
            "first_name": "Ada",
            "last_name": "Lovelace",
        }
    })
}

pub fn checkout_completed(event_id: &str, user_id: Option<&str>, email: Option<&str>, plan: &str) -> Value {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "created": 1_700_000_000,
        "livemode": false,
        "data": {
            "object": {
                "id": format!("cs_{}", event_id),
                "client_reference_id": user_id,
                "customer_email": email,
                "metadata": { "plan_name": plan },
            }
        }
    })
}

pub fn subscription_deleted(event_id: &str, user_id: &str) -> Value {
    serde_json::json!({
        "id": event_id,
        "type": "customer.subscription.deleted",
        "created": 1_700_000_000,
        "livemode": false,
        "data": {
            "object": {
                "id": "sub_1",
                "metadata": { "userId": user_id },
            }
        }
    })
}
