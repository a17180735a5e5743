//! Clerk adapters - identity webhook verification and payload decoding.

mod clerk_verifier;
mod webhook_types;

pub use clerk_verifier::ClerkWebhookVerifier;
pub use webhook_types::decode_payload;
