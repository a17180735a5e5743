//! Billing domain - plans, subscription status and the account balance.

mod account;
mod errors;
mod plan_catalog;
mod policy;
mod status;
mod subscription_event;

pub use account::{NewAccount, ProfileDetails, UserAccount};
pub use errors::LedgerError;
pub use plan_catalog::{PlanCatalog, PlanGrant, PlanPhase, PlanTable, TierGrants};
pub use policy::{BillingState, CancellationPolicy, CreditPolicy, GrantMode};
pub use status::SubscriptionStatus;
pub use subscription_event::{EventOutcome, EventSource, SubscriptionEvent};
