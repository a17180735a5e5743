//! HTTP handlers for generation endpoints.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::AppState;
use crate::application::handlers::{
    CreateUploadUrlCommand, DeleteGenerationCommand, GenerateImageCommand, ListGenerationsQuery,
};
use crate::domain::generation::GenerationError;

use super::dto::{
    GalleryItemResponse, GalleryResponse, GenerateRequest, GenerateResponse, UploadUrlRequest,
    UploadUrlResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Generation
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/generations
///
/// Blocks until the provider finishes or the polling budget runs out.
pub async fn generate_image(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(claimed) = req.user_id.as_deref() {
        if claimed.trim() != user.user_id.as_str() {
            tracing::warn!(user_id = %user.user_id, claimed, "Generation requested for another user");
            return Err(GenerationError::Forbidden.into());
        }
    }

    let cmd = GenerateImageCommand {
        user_id: user.user_id,
        prompt: req.prompt,
        before_image_ref: req.before_image_ref,
        parent_id: req.parent_id,
    };
    let result = state.generate_image_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(GenerateResponse::from(result))))
}

/// GET /api/generations
pub async fn list_generations(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .list_generations_handler()
        .handle(ListGenerationsQuery {
            user_id: user.user_id,
        })
        .await?;

    Ok(Json(GalleryResponse {
        generations: items.into_iter().map(GalleryItemResponse::from).collect(),
    }))
}

/// DELETE /api/generations/:id
pub async fn delete_generation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(generation_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .delete_generation_handler()
        .handle(DeleteGenerationCommand {
            user_id: user.user_id,
            generation_id,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ════════════════════════════════════════════════════════════════════════════════
// Uploads
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/uploads
pub async fn create_upload_url(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<UploadUrlRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let upload = state
        .create_upload_url_handler()
        .handle(CreateUploadUrlCommand {
            user_id: user.user_id,
            file_name: req.file_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UploadUrlResponse::from(upload))))
}
