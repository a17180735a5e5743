//! HTTP adapter for provider webhooks.
//!
//! - `POST /api/webhooks/payment` - Stripe events, `Stripe-Signature` header
//! - `POST /api/webhooks/identity` - Clerk events, `svix-*` headers
//!
//! Neither route takes a user session; authenticity comes from the signature.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::WebhookAckResponse;
pub use routes::webhook_routes;
