//! In-memory SubscriptionEventStore.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{EventOutcome, SubscriptionEvent};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{ClaimResult, SubscriptionEventStore};

#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionEventStore {
    events: Arc<RwLock<HashMap<String, SubscriptionEvent>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemorySubscriptionEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    /// Inserts a record as-is (test setup for stale claims).
    pub async fn insert_raw(&self, event: SubscriptionEvent) {
        self.events.write().await.insert(event.event_id.clone(), event);
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("event store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionEventStore for InMemorySubscriptionEventStore {
    async fn try_claim(
        &self,
        claim: SubscriptionEvent,
        lease_secs: i64,
    ) -> Result<ClaimResult, DomainError> {
        self.check_available()?;
        let mut events = self.events.write().await;

        match events.get_mut(&claim.event_id) {
            None => {
                events.insert(claim.event_id.clone(), claim);
                Ok(ClaimResult::Claimed)
            }
            Some(existing) if existing.outcome.is_final() => {
                Ok(ClaimResult::AlreadyFinalized(existing.clone()))
            }
            Some(existing) if existing.is_stale(Timestamp::now(), lease_secs) => {
                existing.started_at = claim.started_at;
                Ok(ClaimResult::TakenOver)
            }
            Some(_) => Ok(ClaimResult::InFlight),
        }
    }

    async fn find(&self, event_id: &str) -> Result<Option<SubscriptionEvent>, DomainError> {
        self.check_available()?;
        Ok(self.events.read().await.get(event_id).cloned())
    }

    async fn finalize(
        &self,
        event_id: &str,
        outcome: EventOutcome,
        error: Option<String>,
    ) -> Result<bool, DomainError> {
        self.check_available()?;
        let mut events = self.events.write().await;
        match events.get_mut(event_id) {
            Some(event) if !event.outcome.is_final() => {
                event.outcome = outcome;
                event.error = error;
                event.processed_at = Some(Timestamp::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, event_id: &str) -> Result<(), DomainError> {
        self.check_available()?;
        let mut events = self.events.write().await;
        if events.get(event_id).is_some_and(|e| !e.outcome.is_final()) {
            events.remove(event_id);
        }
        Ok(())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        self.check_available()?;
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|_, e| !(e.outcome.is_final() && e.started_at.is_before(&cutoff)));
        Ok((before - events.len()) as u64)
    }
}
