//! CreditLedgerEngine - the authoritative state machine for subscription
//! status and credit balance.
//!
//! Every mutation runs inside the guard's per-user lock and goes through one
//! atomic ledger-store call, so status and balance change together or not at
//! all.

use std::sync::Arc;

use crate::domain::billing::{
    BillingState, CreditPolicy, GrantMode, LedgerError, NewAccount, PlanCatalog, PlanGrant,
    PlanPhase, ProfileDetails, UserAccount,
};
use crate::domain::foundation::{ErrorCode, JobId, Timestamp, UserId};
use crate::ports::{CreditDelta, LedgerStore};

use super::IdempotencyGuard;

/// Result of `on_account_created`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountUpsert {
    Created(UserAccount),
    /// The account already existed; only profile fields were touched.
    Updated(UserAccount),
}

impl AccountUpsert {
    pub fn account(&self) -> &UserAccount {
        match self {
            AccountUpsert::Created(a) | AccountUpsert::Updated(a) => a,
        }
    }
}

/// Result of `on_subscription_activated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub account: UserAccount,
    pub grant: PlanGrant,
}

pub struct CreditLedgerEngine {
    store: Arc<dyn LedgerStore>,
    guard: Arc<IdempotencyGuard>,
    policy: CreditPolicy,
    catalog: PlanCatalog,
}

impl CreditLedgerEngine {
    pub fn new(store: Arc<dyn LedgerStore>, guard: Arc<IdempotencyGuard>, policy: CreditPolicy) -> Self {
        let catalog = policy.catalog();
        Self {
            store,
            guard,
            policy,
            catalog,
        }
    }

    pub fn policy(&self) -> &CreditPolicy {
        &self.policy
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Account lifecycle
    // ════════════════════════════════════════════════════════════════════════════

    /// Creates the account with signup defaults, or updates profile metadata
    /// if it already exists. Billing fields of an existing account are never
    /// touched.
    pub async fn on_account_created(
        &self,
        user_id: &UserId,
        profile: ProfileDetails,
    ) -> Result<AccountUpsert, LedgerError> {
        self.guard
            .with_user_lock(user_id, || async {
                if self.load(user_id).await?.is_some() {
                    return self.update_profile(user_id, &profile).await.map(AccountUpsert::Updated);
                }

                match self.create(user_id, profile.clone(), self.policy.signup_state()).await? {
                    Some(account) => {
                        tracing::info!(user_id = %user_id, "Account created with signup credits");
                        Ok(AccountUpsert::Created(account))
                    }
                    None => self.update_profile(user_id, &profile).await.map(AccountUpsert::Updated),
                }
            })
            .await
    }

    /// Returns the account, creating it with signup defaults if missing.
    pub async fn ensure_account(
        &self,
        user_id: &UserId,
        profile: ProfileDetails,
    ) -> Result<UserAccount, LedgerError> {
        self.guard
            .with_user_lock(user_id, || self.ensure_unlocked(user_id, profile))
            .await
    }

    /// Records a login, creating the account first if needed.
    pub async fn on_session_created(&self, user_id: &UserId) -> Result<UserAccount, LedgerError> {
        self.guard
            .with_user_lock(user_id, || async {
                self.ensure_unlocked(user_id, ProfileDetails::default()).await?;
                self.store
                    .touch_login(user_id, Timestamp::now())
                    .await
                    .map_err(|e| LedgerError::from_store(user_id, e))
            })
            .await
    }

    /// Resolves a payment customer's email to an account id.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, LedgerError> {
        self.store
            .find_by_email(email)
            .await
            .map(|account| account.map(|a| a.id))
            .map_err(|e| LedgerError::StoreUnavailable(e.to_string()))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription changes
    // ════════════════════════════════════════════════════════════════════════════

    /// Applies the grant for `raw_plan_name` in `phase`.
    ///
    /// An unknown plan grants nothing and leaves the current tier in place.
    /// A missing account is created holding the granted balance.
    pub async fn on_subscription_activated(
        &self,
        user_id: &UserId,
        raw_plan_name: Option<&str>,
        phase: PlanPhase,
    ) -> Result<Activation, LedgerError> {
        let grant = self.catalog.resolve_plan(raw_plan_name.unwrap_or_default(), phase);
        if grant.is_unknown() {
            tracing::warn!(
                user_id = %user_id,
                plan_name = raw_plan_name.unwrap_or("<none>"),
                phase = phase.as_str(),
                "Unknown plan, no credits granted"
            );
        }

        self.guard
            .with_user_lock(user_id, || async {
                if self.load(user_id).await?.is_none() {
                    let initial = if grant.is_unknown() {
                        self.policy.signup_state()
                    } else {
                        BillingState {
                            subscription_status: grant.status,
                            credits_remaining: grant.credits_granted,
                            max_generations: grant.max_generations,
                        }
                    };
                    if let Some(account) = self.create(user_id, ProfileDetails::default(), initial).await? {
                        tracing::info!(
                            user_id = %user_id,
                            status = %account.subscription_status,
                            credits = account.credits_remaining,
                            "Account created from payment event"
                        );
                        return Ok(Activation { account, grant });
                    }
                }

                let account = if grant.is_unknown() {
                    self.require(user_id).await?
                } else {
                    self.apply_grant(user_id, &grant).await?
                };

                tracing::info!(
                    user_id = %user_id,
                    status = %account.subscription_status,
                    granted = grant.credits_granted,
                    credits = account.credits_remaining,
                    phase = phase.as_str(),
                    "Subscription credits applied"
                );
                Ok(Activation { account, grant })
            })
            .await
    }

    /// Moves the account back to the free tier per the cancellation policy.
    pub async fn on_subscription_cancelled(&self, user_id: &UserId) -> Result<UserAccount, LedgerError> {
        self.guard
            .with_user_lock(user_id, || async {
                let current = self.ensure_unlocked(user_id, ProfileDetails::default()).await?;
                let billing = self.policy.cancelled_state(current.credits_remaining);
                let account = self
                    .store
                    .set_billing(user_id, billing)
                    .await
                    .map_err(|e| LedgerError::from_store(user_id, e))?;

                tracing::info!(
                    user_id = %user_id,
                    previous_status = %current.subscription_status,
                    credits = account.credits_remaining,
                    "Subscription cancelled"
                );
                Ok(account)
            })
            .await
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Generation credits
    // ════════════════════════════════════════════════════════════════════════════

    /// Fails fast when a metered account has nothing left to spend.
    ///
    /// Advisory only; `debit_for_generation` is authoritative. A signed-in
    /// user whose identity webhook has not arrived yet gets signup defaults.
    pub async fn check_can_generate(&self, user_id: &UserId) -> Result<UserAccount, LedgerError> {
        let account = self.ensure_account(user_id, ProfileDetails::default()).await?;
        if self.policy.is_metered(account.subscription_status) && account.credits_remaining == 0 {
            return Err(LedgerError::InsufficientCredits(user_id.clone()));
        }
        Ok(account)
    }

    /// Spends one credit for a finished generation job.
    ///
    /// Charging the same job again is a no-op. Unmetered tiers are returned
    /// unchanged.
    pub async fn debit_for_generation(
        &self,
        user_id: &UserId,
        job_id: &JobId,
    ) -> Result<UserAccount, LedgerError> {
        self.guard
            .with_user_lock(user_id, || async {
                let account = self.require(user_id).await?;
                if !self.policy.is_metered(account.subscription_status) {
                    tracing::debug!(user_id = %user_id, status = %account.subscription_status, "Unmetered tier, debit skipped");
                    return Ok(account);
                }

                self.store
                    .debit_one(user_id, job_id)
                    .await
                    .map_err(|e| LedgerError::from_store(user_id, e))
            })
            .await
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Store helpers (callers hold the user lock)
    // ════════════════════════════════════════════════════════════════════════════

    async fn load(&self, user_id: &UserId) -> Result<Option<UserAccount>, LedgerError> {
        self.store
            .get_account(user_id)
            .await
            .map_err(|e| LedgerError::from_store(user_id, e))
    }

    async fn require(&self, user_id: &UserId) -> Result<UserAccount, LedgerError> {
        self.load(user_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(user_id.clone()))
    }

    /// Inserts a new account. `None` means another writer created it first.
    async fn create(
        &self,
        user_id: &UserId,
        profile: ProfileDetails,
        billing: BillingState,
    ) -> Result<Option<UserAccount>, LedgerError> {
        let new = NewAccount {
            id: user_id.clone(),
            profile,
            billing,
        };
        match self.store.create_account(new).await {
            Ok(account) => Ok(Some(account)),
            Err(e) if e.code == ErrorCode::AccountExists => Ok(None),
            Err(e) => Err(LedgerError::from_store(user_id, e)),
        }
    }

    async fn ensure_unlocked(
        &self,
        user_id: &UserId,
        profile: ProfileDetails,
    ) -> Result<UserAccount, LedgerError> {
        if let Some(account) = self.load(user_id).await? {
            return Ok(account);
        }
        match self.create(user_id, profile, self.policy.signup_state()).await? {
            Some(account) => Ok(account),
            None => self.require(user_id).await,
        }
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        profile: &ProfileDetails,
    ) -> Result<UserAccount, LedgerError> {
        if profile.is_empty() {
            return self.require(user_id).await;
        }
        self.store
            .update_profile(user_id, profile)
            .await
            .map_err(|e| LedgerError::from_store(user_id, e))
    }

    async fn apply_grant(&self, user_id: &UserId, grant: &PlanGrant) -> Result<UserAccount, LedgerError> {
        let result = match self.policy.grant_mode {
            GrantMode::Additive => {
                self.store
                    .apply_credit_delta(
                        user_id,
                        CreditDelta::grant(grant.credits_granted, grant.status, grant.max_generations),
                    )
                    .await
            }
            GrantMode::Replace => {
                self.store
                    .set_billing(
                        user_id,
                        BillingState {
                            subscription_status: grant.status,
                            credits_remaining: grant.credits_granted,
                            max_generations: grant.max_generations,
                        },
                    )
                    .await
            }
        };
        result.map_err(|e| LedgerError::from_store(user_id, e))
    }
}
