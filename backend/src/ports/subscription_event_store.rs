//! SubscriptionEventStore port - idempotency records for webhook deliveries.
//!
//! Webhook senders deliver at least once and retry on any non-2xx, so the same
//! event id can arrive repeatedly and even concurrently. The store arbitrates
//! with the primary key on `event_id`: exactly one caller wins a claim.

use async_trait::async_trait;

use crate::domain::billing::{EventOutcome, SubscriptionEvent};
use crate::domain::foundation::{DomainError, Timestamp};

/// Result of attempting to claim an event for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimResult {
    /// First delivery; the caller owns the event.
    Claimed,
    /// A stale `processing` claim (crashed worker) was taken over.
    TakenOver,
    /// The event was already finalized.
    AlreadyFinalized(SubscriptionEvent),
    /// Another worker holds a live claim.
    InFlight,
}

impl ClaimResult {
    pub fn should_proceed(&self) -> bool {
        matches!(self, ClaimResult::Claimed | ClaimResult::TakenOver)
    }
}

#[async_trait]
pub trait SubscriptionEventStore: Send + Sync {
    /// Inserts `claim` unless a row exists; takes over rows older than
    /// `lease_secs` that are still `processing`.
    async fn try_claim(
        &self,
        claim: SubscriptionEvent,
        lease_secs: i64,
    ) -> Result<ClaimResult, DomainError>;

    async fn find(&self, event_id: &str) -> Result<Option<SubscriptionEvent>, DomainError>;

    /// Finalizes a `processing` row. Returns false if the row is missing or
    /// already final; finalized rows are never changed.
    async fn finalize(
        &self,
        event_id: &str,
        outcome: EventOutcome,
        error: Option<String>,
    ) -> Result<bool, DomainError>;

    /// Deletes an unfinalized claim so a redelivery re-runs the event.
    async fn release(&self, event_id: &str) -> Result<(), DomainError>;

    /// Retention cleanup of finalized rows started before `cutoff`.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
