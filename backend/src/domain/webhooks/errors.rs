//! Webhook error types shared by the payment and identity endpoints.
//!
//! Each error carries an HTTP status and a retryability flag. Both senders
//! retry on any non-2xx response, so the status code is the retry switch:
//!
//! | Error | Status | Sender retries |
//! |-------|--------|----------------|
//! | InvalidSignature, TimestampOutOfRange | 401 | no |
//! | InvalidTimestamp, ParseError, MissingHeader | 400 | no |
//! | MalformedMetadata | 200 | no |
//! | EventInFlight | 409 | yes |
//! | StoreUnavailable | 500 | yes |

use http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the payload or a signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A required delivery header is absent.
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// Authentic event that cannot be applied (e.g. no user id).
    /// Acknowledged so the sender stops retrying.
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    /// Another worker currently holds the claim on this event id.
    #[error("Event {0} is already being processed")]
    EventInFlight(String),

    /// Transient store failure; nothing was applied.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl WebhookError {
    /// Returns true if the sender should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::EventInFlight(_) | WebhookError::StoreUnavailable(_)
        )
    }

    /// Returns true for failures of the authenticity check.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
                | WebhookError::MissingHeader(_)
        )
    }

    /// Maps the error to the HTTP status returned to the sender.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }

            WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingHeader(_) => StatusCode::BAD_REQUEST,

            WebhookError::MalformedMetadata(_) => StatusCode::OK,

            WebhookError::EventInFlight(_) => StatusCode::CONFLICT,

            WebhookError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
