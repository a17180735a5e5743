//! Credit ledger errors.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | InsufficientCredits | 402 |
//! | AccountNotFound | 404 |
//! | StoreUnavailable | 503 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};

/// Errors returned by the credit ledger engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Metered debit attempted at zero balance. A paywall signal, not a fault.
    #[error("User {0} has no credits remaining")]
    InsufficientCredits(UserId),

    #[error("No account found for user {0}")]
    AccountNotFound(UserId),

    /// Transient store failure; nothing was applied.
    #[error("Ledger store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LedgerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::InsufficientCredits(_) => ErrorCode::InsufficientCredits,
            LedgerError::AccountNotFound(_) => ErrorCode::AccountNotFound,
            LedgerError::StoreUnavailable(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns true if retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::StoreUnavailable(_))
    }

    /// Maps a port error raised while operating on `user_id`'s account.
    pub fn from_store(user_id: &UserId, err: DomainError) -> Self {
        match err.code {
            ErrorCode::InsufficientCredits => LedgerError::InsufficientCredits(user_id.clone()),
            ErrorCode::AccountNotFound => LedgerError::AccountNotFound(user_id.clone()),
            _ => LedgerError::StoreUnavailable(err.to_string()),
        }
    }
}

impl From<LedgerError> for DomainError {
    fn from(err: LedgerError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}
