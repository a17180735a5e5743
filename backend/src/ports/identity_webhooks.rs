//! Identity webhook port - verified user and session events.

use crate::domain::billing::ProfileDetails;
use crate::domain::webhooks::{IdentityDeliveryHeaders, WebhookError};

/// Verifies identity-provider deliveries and decodes them.
pub trait IdentityWebhookVerifier: Send + Sync {
    fn verify_webhook(
        &self,
        payload: &[u8],
        headers: &IdentityDeliveryHeaders,
    ) -> Result<IdentityWebhookEvent, WebhookError>;
}

/// A verified identity event. `id` is the delivery id used for idempotency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityWebhookEvent {
    pub id: String,
    pub event_type: String,
    pub data: IdentityEventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEventPayload {
    /// `user.created` or `user.updated`.
    UserUpserted {
        user_id: Option<String>,
        profile: ProfileDetails,
    },
    /// `session.created`.
    SessionCreated { user_id: Option<String> },
    Other,
}
