//! LedgerStore port - persistent account records and their billing fields.
//!
//! Every mutation of billing fields goes through one of the atomic operations
//! here. Implementations must never lose an update under concurrent calls for
//! the same user: each method is a single read-modify-write inside the store
//! (a row lock or a conditional update), never a read in application code
//! followed by a blind write.

use async_trait::async_trait;

use crate::domain::billing::{BillingState, NewAccount, ProfileDetails, SubscriptionStatus, UserAccount};
use crate::domain::foundation::{DomainError, JobId, Timestamp, UserId};

/// An atomic grant: add `amount` and optionally change tier and cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditDelta {
    pub amount: u32,
    pub new_status: Option<SubscriptionStatus>,
    pub max_generations: Option<u32>,
}

impl CreditDelta {
    pub fn grant(amount: u32, status: SubscriptionStatus, max_generations: u32) -> Self {
        Self {
            amount,
            new_status: Some(status),
            max_generations: Some(max_generations),
        }
    }
}

/// Port for the account store.
///
/// Error contract (by `ErrorCode`):
/// - `AccountExists` from `create_account` when the id is taken
/// - `AccountNotFound` from mutations of a missing account
/// - `InsufficientCredits` from `debit_one` at zero balance
/// - `DatabaseError` for transient failures
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_account(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError>;

    /// Looks up an account by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, DomainError>;

    /// Inserts a new account. Fails with `AccountExists` on a second call.
    async fn create_account(&self, account: NewAccount) -> Result<UserAccount, DomainError>;

    /// Merges descriptive fields; billing fields are untouched.
    async fn update_profile(
        &self,
        user_id: &UserId,
        details: &ProfileDetails,
    ) -> Result<UserAccount, DomainError>;

    async fn touch_login(&self, user_id: &UserId, at: Timestamp) -> Result<UserAccount, DomainError>;

    /// Atomically adds credits and applies the optional tier change.
    async fn apply_credit_delta(
        &self,
        user_id: &UserId,
        delta: CreditDelta,
    ) -> Result<UserAccount, DomainError>;

    /// Atomically overwrites all billing fields.
    async fn set_billing(
        &self,
        user_id: &UserId,
        billing: BillingState,
    ) -> Result<UserAccount, DomainError>;

    /// Atomic decrement-if-positive, applied at most once per job.
    ///
    /// A repeated call for a job already charged returns the account
    /// unchanged, even at zero balance.
    async fn debit_one(&self, user_id: &UserId, job_id: &JobId) -> Result<UserAccount, DomainError>;
}
