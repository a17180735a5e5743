//! HTTP adapter for account and billing endpoints.
//!
//! - `GET /api/profile` - The caller's account (created on first access)
//! - `POST /api/billing/checkout` - Start a subscription checkout

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use routes::billing_routes;
