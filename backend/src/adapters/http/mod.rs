//! HTTP adapters - REST API implementations.
//!
//! Each area has its own module with `dto`, `handlers` and `routes`;
//! `api_router` assembles them behind the authentication layer.

pub mod billing;
pub mod error;
pub mod generation;
pub mod middleware;
pub mod state;
pub mod webhooks;

pub use error::{ApiError, ErrorResponse};
pub use middleware::{AuthenticatedUser, SessionAuth};
pub use state::AppState;

use axum::{middleware::from_fn_with_state, routing::get, Router};

/// Builds the complete API router.
///
/// Webhook routes sit outside the session layer; their signatures are the
/// authentication. Everything else requires a caller.
pub fn api_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .merge(generation::generation_routes())
        .merge(billing::billing_routes())
        .route_layer(from_fn_with_state(
            state.session_auth.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/api/webhooks", webhooks::webhook_routes())
        .nest("/api", authenticated)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
