//! HTTP adapter for generation endpoints.
//!
//! - `POST /api/generations` - Transform an uploaded image (debits one credit)
//! - `GET /api/generations` - The caller's gallery with signed URLs
//! - `DELETE /api/generations/:id` - Soft delete one of the caller's generations
//! - `POST /api/uploads` - Signed upload URL for a source image

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use routes::generation_routes;
