//! Webhook response bodies.

use serde::{Deserialize, Serialize};

use crate::application::handlers::WebhookOutcome;

/// Body of every 2xx webhook response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    pub duplicate: bool,
    /// Why an authentic event was acknowledged without being applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookAckResponse {
    pub fn from_outcome(outcome: WebhookOutcome) -> Self {
        Self {
            received: true,
            duplicate: outcome.is_duplicate(),
            error: None,
        }
    }

    pub fn unapplied(reason: impl Into<String>) -> Self {
        Self {
            received: true,
            duplicate: false,
            error: Some(reason.into()),
        }
    }
}
