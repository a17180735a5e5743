//! IdempotencyGuard - at-most-once webhook processing and per-user
//! serialization of ledger mutations.
//!
//! ## Event lifecycle
//!
//! 1. `begin_processing` claims the event id; duplicates are reported, never
//!    re-run
//! 2. the caller applies the event
//! 3. `finish` finalizes the claim, or `release` drops it when the failure is
//!    transient so the sender's retry runs the event again
//!
//! ## User locks
//!
//! `with_user_lock` holds an async mutex keyed by user id for the duration of
//! the closure. Entries are dropped once no task holds or waits on them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;

use crate::domain::billing::{EventOutcome, EventSource, SubscriptionEvent};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::webhooks::WebhookError;
use crate::ports::{ClaimResult, SubscriptionEventStore};

/// Default lease after which a `processing` claim is considered abandoned.
pub const DEFAULT_LEASE_SECS: i64 = 300;

/// Outcome of `begin_processing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    /// The caller owns the event and must `finish` or `release` it.
    Proceed,
    /// Already handled; the stored record is returned.
    Duplicate(SubscriptionEvent),
}

impl BeginOutcome {
    pub fn should_proceed(&self) -> bool {
        matches!(self, BeginOutcome::Proceed)
    }
}

type LockMap = HashMap<UserId, Arc<Mutex<()>>>;

pub struct IdempotencyGuard {
    events: Arc<dyn SubscriptionEventStore>,
    user_locks: StdMutex<LockMap>,
    lease_secs: i64,
}

impl IdempotencyGuard {
    pub fn new(events: Arc<dyn SubscriptionEventStore>) -> Self {
        Self {
            events,
            user_locks: StdMutex::new(HashMap::new()),
            lease_secs: DEFAULT_LEASE_SECS,
        }
    }

    pub fn with_lease_secs(mut self, lease_secs: i64) -> Self {
        self.lease_secs = lease_secs;
        self
    }

    /// Claims `event_id` for processing.
    ///
    /// # Errors
    ///
    /// - `EventInFlight` - another worker holds a live claim
    /// - `StoreUnavailable` - the claim could not be recorded
    pub async fn begin_processing(
        &self,
        event_id: &str,
        source: EventSource,
        event_type: &str,
    ) -> Result<BeginOutcome, WebhookError> {
        let claim = SubscriptionEvent::claim(event_id, source, event_type);
        let result = self
            .events
            .try_claim(claim, self.lease_secs)
            .await
            .map_err(|e| WebhookError::StoreUnavailable(e.to_string()))?;

        match result {
            ClaimResult::Claimed => Ok(BeginOutcome::Proceed),
            ClaimResult::TakenOver => {
                tracing::warn!(event_id, event_type, "Took over stale event claim");
                Ok(BeginOutcome::Proceed)
            }
            ClaimResult::AlreadyFinalized(existing) => {
                tracing::info!(
                    event_id,
                    event_type,
                    outcome = %existing.outcome,
                    "Duplicate event skipped"
                );
                Ok(BeginOutcome::Duplicate(existing))
            }
            ClaimResult::InFlight => Err(WebhookError::EventInFlight(event_id.to_string())),
        }
    }

    /// Finalizes a claimed event.
    pub async fn finish(
        &self,
        event_id: &str,
        outcome: EventOutcome,
        error: Option<String>,
    ) -> Result<(), WebhookError> {
        let finalized = self
            .events
            .finalize(event_id, outcome, error)
            .await
            .map_err(|e| WebhookError::StoreUnavailable(e.to_string()))?;
        if !finalized {
            tracing::warn!(event_id, outcome = %outcome, "Event was already finalized");
        }
        Ok(())
    }

    /// Drops an unfinalized claim so a redelivery is processed again.
    pub async fn release(&self, event_id: &str) {
        if let Err(e) = self.events.release(event_id).await {
            tracing::error!(event_id, error = %e, "Failed to release event claim");
        }
    }

    /// Deletes finalized records that started before `cutoff`.
    pub async fn purge_before(&self, cutoff: Timestamp) -> Result<u64, WebhookError> {
        let deleted = self
            .events
            .delete_before(cutoff)
            .await
            .map_err(|e| WebhookError::StoreUnavailable(e.to_string()))?;
        tracing::info!(deleted, "Purged old webhook event records");
        Ok(deleted)
    }

    /// Runs `f` while holding the lock for `user_id`.
    pub async fn with_user_lock<F, Fut, T>(&self, user_id: &UserId, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self.lock_for(user_id);
        let result = {
            let _held = lock.lock().await;
            f().await
        };
        drop(lock);
        self.prune(user_id);
        result
    }

    /// Number of user locks currently tracked.
    pub fn tracked_locks(&self) -> usize {
        self.locks().len()
    }

    fn locks(&self) -> std::sync::MutexGuard<'_, LockMap> {
        self.user_locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_for(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        self.locks()
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn prune(&self, user_id: &UserId) {
        let mut locks = self.locks();
        if locks.get(user_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionEventStore;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn guard() -> (IdempotencyGuard, InMemorySubscriptionEventStore) {
        let store = InMemorySubscriptionEventStore::new();
        (IdempotencyGuard::new(Arc::new(store.clone())), store)
    }

    // ══════════════════════════════════════════════════════════════
    // Event claims
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn first_delivery_proceeds_and_replay_is_duplicate() {
        let (guard, _) = guard();

        let first = guard
            .begin_processing("evt_1", EventSource::Payment, "checkout.session.completed")
            .await
            .unwrap();
        assert!(first.should_proceed());
        guard.finish("evt_1", EventOutcome::Applied, None).await.unwrap();

        let replay = guard
            .begin_processing("evt_1", EventSource::Payment, "checkout.session.completed")
            .await
            .unwrap();
        assert!(matches!(replay, BeginOutcome::Duplicate(ref e) if e.outcome == EventOutcome::Applied));
    }

    #[tokio::test]
    async fn concurrent_delivery_is_in_flight() {
        let (guard, _) = guard();
        guard.begin_processing("evt_1", EventSource::Identity, "user.created").await.unwrap();

        let second = guard.begin_processing("evt_1", EventSource::Identity, "user.created").await;

        assert_eq!(second, Err(WebhookError::EventInFlight("evt_1".to_string())));
    }

    #[tokio::test]
    async fn released_event_can_be_claimed_again() {
        let (guard, store) = guard();
        guard.begin_processing("evt_1", EventSource::Payment, "x").await.unwrap();

        guard.release("evt_1").await;

        assert!(store.is_empty().await);
        assert!(guard
            .begin_processing("evt_1", EventSource::Payment, "x")
            .await
            .unwrap()
            .should_proceed());
    }

    #[tokio::test]
    async fn stale_claim_is_taken_over() {
        let (guard, store) = guard();
        let mut stale = SubscriptionEvent::claim("evt_1", EventSource::Payment, "x");
        stale.started_at = Timestamp::now().minus_secs(DEFAULT_LEASE_SECS + 1);
        store.insert_raw(stale).await;

        let outcome = guard.begin_processing("evt_1", EventSource::Payment, "x").await.unwrap();

        assert!(outcome.should_proceed());
    }

    #[tokio::test]
    async fn store_failure_is_store_unavailable() {
        let (guard, store) = guard();
        store.set_unavailable(true);

        let result = guard.begin_processing("evt_1", EventSource::Payment, "x").await;

        assert!(matches!(result, Err(WebhookError::StoreUnavailable(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // User locks
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn user_lock_serializes_critical_sections() {
        let (guard, _) = guard();
        let guard = Arc::new(guard);
        let user = UserId::new("user_1").unwrap();
        let inside = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let user = user.clone();
                let inside = inside.clone();
                let max_seen = max_seen.clone();
                tokio::spawn(async move {
                    guard
                        .with_user_lock(&user, || async {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            inside.fetch_sub(1, Ordering::SeqCst);
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(guard.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn different_users_do_not_block_each_other() {
        let (guard, _) = guard();
        let a = UserId::new("user_a").unwrap();
        let b = UserId::new("user_b").unwrap();

        let result = guard
            .with_user_lock(&a, || async { guard.with_user_lock(&b, || async { 7 }).await })
            .await;

        assert_eq!(result, 7);
    }
}
