//! Axum router for webhook endpoints.

use axum::{routing::post, Router};

use super::handlers::{handle_identity_webhook, handle_payment_webhook};
use crate::adapters::http::AppState;

/// Webhook routes, mounted at `/api/webhooks`.
///
/// # Routes
/// - `POST /payment` - Payment provider events
/// - `POST /identity` - Identity provider events
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/payment", post(handle_payment_webhook))
        .route("/identity", post(handle_identity_webhook))
}
