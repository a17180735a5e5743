//! In-memory LedgerStore.
//!
//! A single write lock around the map makes each operation atomic, which is
//! the same guarantee the Postgres adapter gets from row locks.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{BillingState, NewAccount, ProfileDetails, UserAccount};
use crate::domain::foundation::{DomainError, ErrorCode, JobId, Timestamp, UserId};
use crate::ports::{CreditDelta, LedgerStore};

#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    accounts: Arc<RwLock<HashMap<UserId, UserAccount>>>,
    debited_jobs: Arc<RwLock<HashSet<JobId>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `DatabaseError` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("ledger store unavailable"));
        }
        Ok(())
    }

    async fn mutate<F>(&self, user_id: &UserId, f: F) -> Result<UserAccount, DomainError>
    where
        F: FnOnce(&mut UserAccount) -> Result<(), DomainError> + Send,
    {
        self.check_available()?;
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(user_id).ok_or_else(|| not_found(user_id))?;
        f(account)?;
        Ok(account.clone())
    }
}

fn not_found(user_id: &UserId) -> DomainError {
    DomainError::new(ErrorCode::AccountNotFound, format!("No account for {}", user_id))
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_account(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError> {
        self.check_available()?;
        Ok(self.accounts.read().await.get(user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, DomainError> {
        self.check_available()?;
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| {
                a.profile
                    .email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .cloned())
    }

    async fn create_account(&self, account: NewAccount) -> Result<UserAccount, DomainError> {
        self.check_available()?;
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Err(DomainError::new(
                ErrorCode::AccountExists,
                format!("Account {} already exists", account.id),
            ));
        }
        let created = UserAccount::create(account);
        accounts.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        details: &ProfileDetails,
    ) -> Result<UserAccount, DomainError> {
        self.mutate(user_id, |a| {
            a.update_profile(details);
            Ok(())
        })
        .await
    }

    async fn touch_login(&self, user_id: &UserId, at: Timestamp) -> Result<UserAccount, DomainError> {
        self.mutate(user_id, |a| {
            a.touch_login(at);
            Ok(())
        })
        .await
    }

    async fn apply_credit_delta(
        &self,
        user_id: &UserId,
        delta: CreditDelta,
    ) -> Result<UserAccount, DomainError> {
        self.mutate(user_id, |a| {
            a.apply_credit_delta(delta.amount, delta.new_status, delta.max_generations);
            Ok(())
        })
        .await
    }

    async fn set_billing(
        &self,
        user_id: &UserId,
        billing: BillingState,
    ) -> Result<UserAccount, DomainError> {
        self.mutate(user_id, |a| {
            a.set_billing(billing);
            Ok(())
        })
        .await
    }

    async fn debit_one(&self, user_id: &UserId, job_id: &JobId) -> Result<UserAccount, DomainError> {
        self.check_available()?;
        let mut accounts = self.accounts.write().await;
        let mut debited = self.debited_jobs.write().await;
        let account = accounts.get_mut(user_id).ok_or_else(|| not_found(user_id))?;
        if debited.contains(job_id) {
            return Ok(account.clone());
        }
        if !account.try_debit_one() {
            return Err(DomainError::new(
                ErrorCode::InsufficientCredits,
                format!("{} has no credits remaining", user_id),
            ));
        }
        debited.insert(*job_id);
        Ok(account.clone())
    }
}
