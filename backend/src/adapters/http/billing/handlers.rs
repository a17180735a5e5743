//! HTTP handlers for account and billing endpoints.

use axum::extract::{Json, State};
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::AppState;
use crate::application::handlers::{CreateCheckoutSessionCommand, GetProfileQuery};
use crate::domain::billing::ProfileDetails;

use super::dto::{CheckoutRequest, CheckoutResponse, ProfileResponse};

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let query = GetProfileQuery {
        user_id: user.user_id,
        profile: ProfileDetails {
            email: user.email,
            ..Default::default()
        },
    };
    let account = state.get_profile_handler().handle(query).await?;

    Ok(Json(ProfileResponse::from(account)))
}

/// POST /api/billing/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .create_checkout_session_handler()
        .handle(CreateCheckoutSessionCommand {
            user_id: user.user_id,
            plan: req.plan,
        })
        .await?;

    Ok(Json(CheckoutResponse::from(session)))
}
