//! Clerk objects as they arrive in webhook payloads.

use serde::Deserialize;

use crate::domain::billing::ProfileDetails;
use crate::domain::webhooks::{IdentityEventEnvelope, WebhookError};
use crate::ports::IdentityEventPayload;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClerkUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    /// Flattened email some payload versions carry.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClerkEmailAddress {
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClerkSession {
    #[serde(default)]
    pub user_id: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ClerkUser {
    pub fn profile(&self) -> ProfileDetails {
        let email = present(
            self.email_addresses
                .first()
                .and_then(|e| e.email_address.clone()),
        )
        .or_else(|| present(self.email.clone()));
        let avatar = present(self.image_url.clone()).or_else(|| present(self.profile_image_url.clone()));

        ProfileDetails::from_names(
            email,
            present(self.first_name.clone()),
            present(self.last_name.clone()),
            avatar,
        )
    }
}

/// Decodes the `data` of a verified envelope by event type.
pub fn decode_payload(envelope: &IdentityEventEnvelope) -> Result<IdentityEventPayload, WebhookError> {
    match envelope.event_type.as_str() {
        "user.created" | "user.updated" => {
            let user: ClerkUser = serde_json::from_value(envelope.data.clone())
                .map_err(|e| WebhookError::ParseError(format!("invalid user object: {}", e)))?;
            Ok(IdentityEventPayload::UserUpserted {
                user_id: present(user.id.clone()),
                profile: user.profile(),
            })
        }
        "session.created" => {
            let session: ClerkSession = serde_json::from_value(envelope.data.clone())
                .map_err(|e| WebhookError::ParseError(format!("invalid session object: {}", e)))?;
            Ok(IdentityEventPayload::SessionCreated {
                user_id: present(session.user_id),
            })
        }
        _ => Ok(IdentityEventPayload::Other),
    }
}
