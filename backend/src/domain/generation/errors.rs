//! Generation error taxonomy.
//!
//! Every failure the generation path can surface maps to one of a handful of
//! client-facing kinds. Technical detail stays in the `Display` text (logs);
//! `user_message` is what the end user sees.

use http::StatusCode;
use thiserror::Error;

use crate::domain::billing::LedgerError;
use crate::domain::foundation::{DomainError, ErrorCode, UserId, ValidationError};

/// Errors from the generation workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Paywall signal: the user must upgrade or wait for a renewal.
    #[error("User {0} has no credits remaining")]
    InsufficientCredits(UserId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    /// Provider rejected or errored the job.
    #[error("Provider failed: {0}")]
    ProviderFailed(String),

    /// Polling budget exhausted.
    #[error("Provider timed out after {attempts} polls")]
    ProviderTimedOut { attempts: u32 },

    /// Transient failure of the ledger, database or object store.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl GenerationError {
    /// Client-facing error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::InsufficientCredits(_) => "InsufficientCredits",
            GenerationError::Validation(_) => "ValidationError",
            GenerationError::NotFound(_) => "NotFound",
            GenerationError::Forbidden => "Forbidden",
            GenerationError::ProviderFailed(_) | GenerationError::StoreUnavailable(_) => {
                "ProviderError"
            }
            GenerationError::ProviderTimedOut { .. } => "Timeout",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GenerationError::InsufficientCredits(_) => StatusCode::PAYMENT_REQUIRED,
            GenerationError::Validation(_) => StatusCode::BAD_REQUEST,
            GenerationError::NotFound(_) => StatusCode::NOT_FOUND,
            GenerationError::Forbidden => StatusCode::FORBIDDEN,
            GenerationError::ProviderFailed(_) => StatusCode::BAD_GATEWAY,
            GenerationError::ProviderTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            GenerationError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns true if the caller may simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::ProviderFailed(_)
                | GenerationError::ProviderTimedOut { .. }
                | GenerationError::StoreUnavailable(_)
        )
    }

    /// Message safe to show to the end user.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::InsufficientCredits(_) => {
                "No credits remaining. Please upgrade your plan.".to_string()
            }
            GenerationError::Validation(msg) => msg.clone(),
            GenerationError::NotFound(_) => "Not found".to_string(),
            GenerationError::Forbidden => "You do not have access to this resource".to_string(),
            GenerationError::ProviderFailed(_)
            | GenerationError::ProviderTimedOut { .. }
            | GenerationError::StoreUnavailable(_) => {
                "Image transformation failed. Please try again.".to_string()
            }
        }
    }
}

impl From<ValidationError> for GenerationError {
    fn from(err: ValidationError) -> Self {
        GenerationError::Validation(err.to_string())
    }
}

impl From<LedgerError> for GenerationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientCredits(user_id) => GenerationError::InsufficientCredits(user_id),
            LedgerError::AccountNotFound(user_id) => {
                GenerationError::NotFound(format!("account {}", user_id))
            }
            LedgerError::StoreUnavailable(msg) => GenerationError::StoreUnavailable(msg),
        }
    }
}

impl From<DomainError> for GenerationError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => GenerationError::Validation(err.message),
            ErrorCode::GenerationNotFound | ErrorCode::JobNotFound | ErrorCode::AccountNotFound => {
                GenerationError::NotFound(err.message)
            }
            ErrorCode::Forbidden | ErrorCode::Unauthorized => GenerationError::Forbidden,
            ErrorCode::ProviderError => GenerationError::ProviderFailed(err.message),
            _ => GenerationError::StoreUnavailable(err.to_string()),
        }
    }
}
