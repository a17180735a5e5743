//! Credit policy - the configurable business constants of the ledger.
//!
//! Two independently evolved payment handlers disagreed on grant semantics
//! and cancellation behavior. Both behaviors are kept here as policy so the
//! product owner can choose without a code change.

use serde::{Deserialize, Serialize};

use super::{PlanCatalog, PlanTable, SubscriptionStatus};

/// What happens to the balance when a subscription is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPolicy {
    /// Status free, balance reset to the signup grant.
    #[default]
    ResetToFree,
    /// Status free, balance untouched.
    KeepBalance,
}

/// How a plan grant is applied to the existing balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantMode {
    /// Add the grant to the current balance.
    #[default]
    Additive,
    /// Overwrite the balance with the grant.
    Replace,
}

/// Snapshot of the billing fields of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingState {
    pub subscription_status: SubscriptionStatus,
    pub credits_remaining: u32,
    pub max_generations: u32,
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPolicy {
    #[serde(default = "default_signup_credits")]
    pub signup_credits: u32,

    #[serde(default = "default_free_max_generations")]
    pub free_max_generations: u32,

    #[serde(default)]
    pub cancellation: CancellationPolicy,

    #[serde(default)]
    pub grant_mode: GrantMode,

    /// Tiers whose generations do not consume credits.
    #[serde(default)]
    pub unmetered_tiers: Vec<SubscriptionStatus>,

    #[serde(default)]
    pub plans: PlanTable,

    /// Acknowledge the first invoice of a new subscription without a grant,
    /// since checkout completion already granted the initial credits.
    #[serde(default = "default_skip_first_invoice")]
    pub skip_first_invoice: bool,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            signup_credits: default_signup_credits(),
            free_max_generations: default_free_max_generations(),
            cancellation: CancellationPolicy::default(),
            grant_mode: GrantMode::default(),
            unmetered_tiers: Vec::new(),
            plans: PlanTable::default(),
            skip_first_invoice: default_skip_first_invoice(),
        }
    }
}

fn default_signup_credits() -> u32 {
    2
}

fn default_free_max_generations() -> u32 {
    2
}

fn default_skip_first_invoice() -> bool {
    true
}

impl CreditPolicy {
    /// Builds the plan catalog described by this policy.
    pub fn catalog(&self) -> PlanCatalog {
        PlanCatalog::new(self.plans.clone(), self.free_max_generations)
    }

    /// Returns true if generations on this tier consume credits.
    pub fn is_metered(&self, status: SubscriptionStatus) -> bool {
        !self.unmetered_tiers.contains(&status)
    }

    /// Billing fields of a freshly created account.
    pub fn signup_state(&self) -> BillingState {
        BillingState {
            subscription_status: SubscriptionStatus::Free,
            credits_remaining: self.signup_credits,
            max_generations: self.free_max_generations,
        }
    }

    /// Billing fields after cancelling, given the current balance.
    pub fn cancelled_state(&self, current_credits: u32) -> BillingState {
        let credits_remaining = match self.cancellation {
            CancellationPolicy::ResetToFree => self.signup_credits,
            CancellationPolicy::KeepBalance => current_credits,
        };
        BillingState {
            subscription_status: SubscriptionStatus::Free,
            credits_remaining,
            max_generations: self.free_max_generations,
        }
    }
}
