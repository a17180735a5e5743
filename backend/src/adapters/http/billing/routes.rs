//! Axum router for account and billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{create_checkout, get_profile};
use crate::adapters::http::AppState;

/// Account and billing routes, mounted at `/api`.
///
/// # Routes
/// - `GET /profile` - The caller's account
/// - `POST /billing/checkout` - Start a subscription checkout
pub fn billing_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/billing/checkout", post(create_checkout))
}
