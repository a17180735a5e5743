//! HTTP handlers for webhook endpoints.
//!
//! Both handlers take the raw body as `Bytes`; signatures are computed over
//! the exact bytes received, so the body must not be parsed first.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::adapters::http::error::ErrorResponse;
use crate::adapters::http::AppState;
use crate::application::handlers::{
    HandleIdentityWebhookCommand, HandlePaymentWebhookCommand, WebhookOutcome,
};
use crate::domain::webhooks::{IdentityDeliveryHeaders, WebhookError};

use super::dto::WebhookAckResponse;

pub const PAYMENT_SIGNATURE_HEADER: &str = "stripe-signature";
pub const IDENTITY_ID_HEADER: &str = "svix-id";
pub const IDENTITY_TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const IDENTITY_SIGNATURE_HEADER: &str = "svix-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/payment
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = match required_header(&headers, PAYMENT_SIGNATURE_HEADER) {
        Ok(signature) => signature,
        Err(e) => return webhook_response(Err(e)),
    };

    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        signature,
    };
    webhook_response(state.payment_webhook_handler().handle(cmd).await)
}

/// POST /api/webhooks/identity
pub async fn handle_identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = match identity_headers(&headers) {
        Ok(delivery) => delivery,
        Err(e) => return webhook_response(Err(e)),
    };

    let cmd = HandleIdentityWebhookCommand {
        payload: body.to_vec(),
        headers: delivery,
    };
    webhook_response(state.identity_webhook_handler().handle(cmd).await)
}

// ════════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════════

fn required_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or(WebhookError::MissingHeader(name))
}

fn identity_headers(headers: &HeaderMap) -> Result<IdentityDeliveryHeaders, WebhookError> {
    Ok(IdentityDeliveryHeaders {
        message_id: required_header(headers, IDENTITY_ID_HEADER)?,
        timestamp: required_header(headers, IDENTITY_TIMESTAMP_HEADER)?,
        signature: required_header(headers, IDENTITY_SIGNATURE_HEADER)?,
    })
}

/// Renders a webhook result. The status code is what tells the sender
/// whether to retry.
fn webhook_response(result: Result<WebhookOutcome, WebhookError>) -> Response {
    match result {
        Ok(outcome) => (StatusCode::OK, Json(WebhookAckResponse::from_outcome(outcome))).into_response(),
        Err(WebhookError::MalformedMetadata(reason)) => {
            (StatusCode::OK, Json(WebhookAckResponse::unapplied(reason))).into_response()
        }
        Err(e) => {
            if e.is_authentication_failure() {
                tracing::warn!(error = %e, "Webhook rejected");
            }
            let message = match &e {
                WebhookError::StoreUnavailable(_) => "Temporarily unavailable".to_string(),
                other => other.to_string(),
            };
            (e.status_code(), Json(ErrorResponse::new(error_kind(&e), message))).into_response()
        }
    }
}

fn error_kind(err: &WebhookError) -> &'static str {
    match err {
        WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => "InvalidSignature",
        WebhookError::InvalidTimestamp
        | WebhookError::ParseError(_)
        | WebhookError::MissingHeader(_) => "BadRequest",
        WebhookError::MalformedMetadata(_) => "MalformedMetadata",
        WebhookError::EventInFlight(_) => "EventInFlight",
        WebhookError::StoreUnavailable(_) => "StoreUnavailable",
    }
}
