//! Plan catalog - maps free-text plan names to credit grants.
//!
//! Plan names arrive from the payment provider as display strings such as
//! "Pro Individual Monthly" or "Agency Yearly". Matching is a case-insensitive
//! substring test evaluated in fixed priority order:
//!
//! 1. contains "agency" -> `pro_agency`
//! 2. contains both "pro" and "individual" -> `pro_individual`
//! 3. contains "custom" -> `custom`
//! 4. anything else -> `free` with a zero grant
//!
//! The grant size depends on the phase. Renewal grants are larger than the
//! initial grants (25 vs 23, 200 vs 198, 1000 vs 999); the table is
//! configurable so the product owner can settle the values.

use serde::{Deserialize, Serialize};

use super::SubscriptionStatus;

/// Whether a grant is for the first payment of a subscription or a renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanPhase {
    Initial,
    Renewal,
}

impl PlanPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanPhase::Initial => "initial",
            PlanPhase::Renewal => "renewal",
        }
    }
}

/// Credit grants for one paid tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierGrants {
    /// Credits granted on the first successful payment.
    pub initial: u32,
    /// Credits granted on each renewal payment.
    pub renewal: u32,
    /// Informational generation cap shown alongside the tier.
    pub max_generations: u32,
}

impl TierGrants {
    pub const fn new(initial: u32, renewal: u32, max_generations: u32) -> Self {
        Self {
            initial,
            renewal,
            max_generations,
        }
    }

    fn for_phase(&self, phase: PlanPhase) -> u32 {
        match phase {
            PlanPhase::Initial => self.initial,
            PlanPhase::Renewal => self.renewal,
        }
    }
}

/// The full grant table, one row per paid tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTable {
    #[serde(default = "default_pro_individual")]
    pub pro_individual: TierGrants,
    #[serde(default = "default_pro_agency")]
    pub pro_agency: TierGrants,
    #[serde(default = "default_custom")]
    pub custom: TierGrants,
}

impl Default for PlanTable {
    fn default() -> Self {
        Self {
            pro_individual: default_pro_individual(),
            pro_agency: default_pro_agency(),
            custom: default_custom(),
        }
    }
}

fn default_pro_individual() -> TierGrants {
    TierGrants::new(23, 25, 25)
}

fn default_pro_agency() -> TierGrants {
    TierGrants::new(198, 200, 200)
}

fn default_custom() -> TierGrants {
    TierGrants::new(999, 1000, 1000)
}

/// Result of resolving a plan name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanGrant {
    pub status: SubscriptionStatus,
    pub credits_granted: u32,
    pub max_generations: u32,
}

impl PlanGrant {
    /// True when the plan name matched no catalog entry.
    pub fn is_unknown(&self) -> bool {
        self.status == SubscriptionStatus::Free
    }
}

/// Pure lookup from plan names to grants.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    table: PlanTable,
    free_max_generations: u32,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new(PlanTable::default(), 2)
    }
}

impl PlanCatalog {
    pub fn new(table: PlanTable, free_max_generations: u32) -> Self {
        Self {
            table,
            free_max_generations,
        }
    }

    /// Matches a free-text plan name to a paid tier.
    ///
    /// Returns `None` when nothing matches.
    pub fn match_tier(raw_plan_name: &str) -> Option<SubscriptionStatus> {
        let name = raw_plan_name.to_lowercase();

        if name.contains("agency") {
            Some(SubscriptionStatus::ProAgency)
        } else if name.contains("pro") && name.contains("individual") {
            Some(SubscriptionStatus::ProIndividual)
        } else if name.contains("custom") {
            Some(SubscriptionStatus::Custom)
        } else {
            None
        }
    }

    /// Resolves a plan name and phase into a grant.
    ///
    /// Unmatched names resolve to `{free, 0}`; callers log that as a warning.
    pub fn resolve_plan(&self, raw_plan_name: &str, phase: PlanPhase) -> PlanGrant {
        match Self::match_tier(raw_plan_name) {
            Some(status) => {
                let grants = self.grants_for(status);
                PlanGrant {
                    status,
                    credits_granted: grants.map(|g| g.for_phase(phase)).unwrap_or(0),
                    max_generations: self.max_generations_for(status),
                }
            }
            None => PlanGrant {
                status: SubscriptionStatus::Free,
                credits_granted: 0,
                max_generations: self.free_max_generations,
            },
        }
    }

    /// Generation cap associated with a tier.
    pub fn max_generations_for(&self, status: SubscriptionStatus) -> u32 {
        self.grants_for(status)
            .map(|g| g.max_generations)
            .unwrap_or(self.free_max_generations)
    }

    fn grants_for(&self, status: SubscriptionStatus) -> Option<&TierGrants> {
        match status {
            SubscriptionStatus::Free => None,
            SubscriptionStatus::ProIndividual => Some(&self.table.pro_individual),
            SubscriptionStatus::ProAgency => Some(&self.table.pro_agency),
            SubscriptionStatus::Custom => Some(&self.table.custom),
        }
    }
}
