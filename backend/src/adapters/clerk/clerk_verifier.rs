//! Clerk webhook verifier.

use crate::domain::webhooks::{IdentityDeliveryHeaders, IdentitySignatureVerifier, WebhookError};
use crate::ports::{IdentityWebhookEvent, IdentityWebhookVerifier};

use super::webhook_types::decode_payload;

pub struct ClerkWebhookVerifier {
    verifier: IdentitySignatureVerifier,
}

impl ClerkWebhookVerifier {
    /// Creates a verifier from the `whsec_` signing secret.
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        Ok(Self {
            verifier: IdentitySignatureVerifier::new(secret)?,
        })
    }
}

impl IdentityWebhookVerifier for ClerkWebhookVerifier {
    fn verify_webhook(
        &self,
        payload: &[u8],
        headers: &IdentityDeliveryHeaders,
    ) -> Result<IdentityWebhookEvent, WebhookError> {
        let envelope = self.verifier.verify_and_parse(payload, headers)?;
        let data = decode_payload(&envelope)?;
        Ok(IdentityWebhookEvent {
            id: headers.message_id.clone(),
            event_type: envelope.event_type,
            data,
        })
    }
}
