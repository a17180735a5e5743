//! Subscription status of a user account.
//!
//! Mutated only by the credit ledger in response to payment events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Plan tier an account is currently billed on.
///
/// State machine: `Free -> {ProIndividual, ProAgency, Custom}` on payment
/// success, any paid tier `-> Free` on cancellation, and lateral moves between
/// paid tiers on a new checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Free,
    ProIndividual,
    ProAgency,
    Custom,
}

impl SubscriptionStatus {
    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Free => "free",
            SubscriptionStatus::ProIndividual => "pro_individual",
            SubscriptionStatus::ProAgency => "pro_agency",
            SubscriptionStatus::Custom => "custom",
        }
    }

    /// Returns true for any paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionStatus::Free)
    }

    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionStatus::Free => "Free",
            SubscriptionStatus::ProIndividual => "Pro Individual",
            SubscriptionStatus::ProAgency => "Pro Agency",
            SubscriptionStatus::Custom => "Custom",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(SubscriptionStatus::Free),
            "pro_individual" => Ok(SubscriptionStatus::ProIndividual),
            "pro_agency" => Ok(SubscriptionStatus::ProAgency),
            "custom" => Ok(SubscriptionStatus::Custom),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}
