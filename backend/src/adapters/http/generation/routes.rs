//! Axum router for generation endpoints.

use axum::{
    routing::{delete, post},
    Router,
};

use super::handlers::{create_upload_url, delete_generation, generate_image, list_generations};
use crate::adapters::http::AppState;

/// Generation routes, mounted at `/api`.
///
/// # Routes
/// - `POST /generations` - Run one image transformation
/// - `GET /generations` - List the caller's gallery
/// - `DELETE /generations/:id` - Delete one generation
/// - `POST /uploads` - Issue a signed upload URL
pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/generations", post(generate_image).get(list_generations))
        .route("/generations/:id", delete(delete_generation))
        .route("/uploads", post(create_upload_url))
}
