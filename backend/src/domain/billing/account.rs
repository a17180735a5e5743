//! User account aggregate (the "profile" row).
//!
//! # Design Decisions
//!
//! - **Identity-provider keyed**: `id` is the identity provider's user id
//! - **Unsigned balance**: `credits_remaining` is a `u32`; a debit that would
//!   go below zero is rejected rather than saturated
//! - **Billing fields are ledger-owned**: descriptive fields change on identity
//!   events, billing fields only through the credit ledger

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::{BillingState, SubscriptionStatus};

/// Descriptive profile fields supplied by the identity provider.
///
/// All fields are optional; `merge` only overwrites fields that are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDetails {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileDetails {
    /// Builds details from first/last name, deriving a display name.
    pub fn from_names(
        email: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Self {
        let display_name = match (first_name.as_deref(), last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.to_string()),
            (None, Some(last)) => Some(last.to_string()),
            (None, None) => None,
        }
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

        Self {
            email,
            first_name,
            last_name,
            display_name,
            avatar_url,
        }
    }

    /// Overwrites fields present in `other`, keeping the rest.
    pub fn merge(&mut self, other: &ProfileDetails) {
        if other.email.is_some() {
            self.email = other.email.clone();
        }
        if other.first_name.is_some() {
            self.first_name = other.first_name.clone();
        }
        if other.last_name.is_some() {
            self.last_name = other.last_name.clone();
        }
        if other.display_name.is_some() {
            self.display_name = other.display_name.clone();
        }
        if other.avatar_url.is_some() {
            self.avatar_url = other.avatar_url.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ProfileDetails::default()
    }
}

/// Everything needed to insert a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub id: UserId,
    pub profile: ProfileDetails,
    pub billing: BillingState,
}

/// A user account with its billing state.
///
/// # Invariants
///
/// - `id` is immutable once created
/// - `credits_remaining >= 0` (enforced by the type)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub profile: ProfileDetails,
    pub subscription_status: SubscriptionStatus,
    pub credits_remaining: u32,
    pub max_generations: u32,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserAccount {
    /// Materializes a new account row.
    pub fn create(new: NewAccount) -> Self {
        let now = Timestamp::now();
        Self {
            id: new.id,
            profile: new.profile,
            subscription_status: new.billing.subscription_status,
            credits_remaining: new.billing.credits_remaining,
            max_generations: new.billing.max_generations,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Current billing snapshot.
    pub fn billing(&self) -> BillingState {
        BillingState {
            subscription_status: self.subscription_status,
            credits_remaining: self.credits_remaining,
            max_generations: self.max_generations,
        }
    }

    /// Overwrites all billing fields at once.
    pub fn set_billing(&mut self, billing: BillingState) {
        self.subscription_status = billing.subscription_status;
        self.credits_remaining = billing.credits_remaining;
        self.max_generations = billing.max_generations;
        self.updated_at = Timestamp::now();
    }

    /// Adds `delta` credits and optionally moves to a new tier.
    ///
    /// The balance saturates at `u32::MAX`.
    pub fn apply_credit_delta(
        &mut self,
        delta: u32,
        new_status: Option<SubscriptionStatus>,
        max_generations: Option<u32>,
    ) {
        self.credits_remaining = self.credits_remaining.saturating_add(delta);
        if let Some(status) = new_status {
            self.subscription_status = status;
        }
        if let Some(max) = max_generations {
            self.max_generations = max;
        }
        self.updated_at = Timestamp::now();
    }

    /// Decrements the balance by one if positive.
    ///
    /// Returns false and leaves the account unchanged at zero balance.
    pub fn try_debit_one(&mut self) -> bool {
        match self.credits_remaining.checked_sub(1) {
            Some(remaining) => {
                self.credits_remaining = remaining;
                self.updated_at = Timestamp::now();
                true
            }
            None => false,
        }
    }

    pub fn update_profile(&mut self, details: &ProfileDetails) {
        self.profile.merge(details);
        self.updated_at = Timestamp::now();
    }

    pub fn touch_login(&mut self, at: Timestamp) {
        self.last_login_at = Some(at);
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(credits: u32) -> UserAccount {
        UserAccount::create(NewAccount {
            id: UserId::new("user_1").unwrap(),
            profile: ProfileDetails::default(),
            billing: BillingState {
                subscription_status: SubscriptionStatus::Free,
                credits_remaining: credits,
                max_generations: 2,
            },
        })
    }

    // ══════════════════════════════════════════════════════════════
    // Profile details
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn display_name_joins_first_and_last() {
        let details = ProfileDetails::from_names(
            None,
            Some("Ada".to_string()),
            Some("Lovelace".to_string()),
            None,
        );
        assert_eq!(details.display_name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn display_name_absent_without_names() {
        let details = ProfileDetails::from_names(Some("a@b.c".to_string()), None, None, None);
        assert!(details.display_name.is_none());
    }

    #[test]
    fn merge_keeps_fields_missing_from_update() {
        let mut details = ProfileDetails {
            email: Some("old@example.com".to_string()),
            avatar_url: Some("https://img/old.png".to_string()),
            ..ProfileDetails::default()
        };
        details.merge(&ProfileDetails {
            email: Some("new@example.com".to_string()),
            ..ProfileDetails::default()
        });
        assert_eq!(details.email.as_deref(), Some("new@example.com"));
        assert_eq!(details.avatar_url.as_deref(), Some("https://img/old.png"));
    }

    // ══════════════════════════════════════════════════════════════
    // Balance mutations
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn debit_decrements_positive_balance() {
        let mut acc = account(2);
        assert!(acc.try_debit_one());
        assert_eq!(acc.credits_remaining, 1);
    }

    #[test]
    fn debit_at_zero_is_rejected_without_change() {
        let mut acc = account(0);
        assert!(!acc.try_debit_one());
        assert_eq!(acc.credits_remaining, 0);
    }

    #[test]
    fn credit_delta_adds_and_moves_tier() {
        let mut acc = account(2);
        acc.apply_credit_delta(23, Some(SubscriptionStatus::ProIndividual), Some(25));
        assert_eq!(acc.credits_remaining, 25);
        assert_eq!(acc.subscription_status, SubscriptionStatus::ProIndividual);
        assert_eq!(acc.max_generations, 25);
    }

    #[test]
    fn credit_delta_saturates() {
        let mut acc = account(u32::MAX - 1);
        acc.apply_credit_delta(10, None, None);
        assert_eq!(acc.credits_remaining, u32::MAX);
    }

    #[test]
    fn touch_login_records_time() {
        let mut acc = account(2);
        let at = Timestamp::now();
        acc.touch_login(at);
        assert_eq!(acc.last_login_at, Some(at));
    }
}
