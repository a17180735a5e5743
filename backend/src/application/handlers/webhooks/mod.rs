//! Webhook command handlers.
//!
//! Both providers deliver at least once and retry on any non-2xx response.
//! Each recognized event runs through `process_once`, which claims the event
//! id, applies it, and finalizes or releases the claim depending on how the
//! application went.

mod handle_identity_webhook;
mod handle_payment_webhook;

pub use handle_identity_webhook::{HandleIdentityWebhookCommand, HandleIdentityWebhookHandler};
pub use handle_payment_webhook::{HandlePaymentWebhookCommand, HandlePaymentWebhookHandler};

use std::future::Future;

use crate::application::services::{BeginOutcome, IdempotencyGuard};
use crate::domain::billing::{EventOutcome, EventSource, LedgerError};
use crate::domain::foundation::UserId;
use crate::domain::webhooks::WebhookError;

/// Result of handling one webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event changed ledger state.
    Applied,
    /// Authentic, recognized or not, but nothing to change.
    Acknowledged,
    /// The event id was already handled; nothing was re-applied.
    Duplicate,
}

impl WebhookOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, WebhookOutcome::Duplicate)
    }
}

/// Runs `apply` at most once for `event_id`.
///
/// - success finalizes the claim as `applied`
/// - `MalformedMetadata` finalizes it as `failed`, so redeliveries are skipped
/// - anything else releases the claim so the sender's retry runs it again
pub(crate) async fn process_once<F, Fut>(
    guard: &IdempotencyGuard,
    event_id: &str,
    source: EventSource,
    event_type: &str,
    apply: F,
) -> Result<WebhookOutcome, WebhookError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<WebhookOutcome, WebhookError>>,
{
    if let BeginOutcome::Duplicate(_) = guard.begin_processing(event_id, source, event_type).await? {
        return Ok(WebhookOutcome::Duplicate);
    }

    let result = apply().await;
    let finalized = match &result {
        Ok(_) => guard.finish(event_id, EventOutcome::Applied, None).await,
        Err(WebhookError::MalformedMetadata(reason)) => {
            tracing::warn!(event_id, event_type, reason = %reason, "Event cannot be applied");
            guard
                .finish(event_id, EventOutcome::Failed, Some(reason.clone()))
                .await
        }
        Err(e) => {
            tracing::error!(event_id, event_type, error = %e, "Event processing failed, releasing claim");
            guard.release(event_id).await;
            return result;
        }
    };

    if let Err(e) = finalized {
        guard.release(event_id).await;
        return Err(e);
    }
    result
}

/// Parses a user id carried in provider metadata.
pub(crate) fn parse_user_id(raw: Option<&str>) -> Result<UserId, WebhookError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WebhookError::MalformedMetadata("no user id in event".to_string()))
        .and_then(|s| UserId::new(s).map_err(|e| WebhookError::MalformedMetadata(e.to_string())))
}

pub(crate) fn ledger_failure(err: LedgerError) -> WebhookError {
    match err {
        LedgerError::StoreUnavailable(msg) => WebhookError::StoreUnavailable(msg),
        other => WebhookError::MalformedMetadata(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionEventStore;
    use crate::ports::SubscriptionEventStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn guard() -> (IdempotencyGuard, InMemorySubscriptionEventStore) {
        let store = InMemorySubscriptionEventStore::new();
        (IdempotencyGuard::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn success_finalizes_as_applied() {
        let (guard, store) = guard();

        let outcome = process_once(&guard, "evt_1", EventSource::Payment, "t", || async {
            Ok(WebhookOutcome::Applied)
        })
        .await
        .unwrap();

        assert_eq!(outcome, WebhookOutcome::Applied);
        let row = store.find("evt_1").await.unwrap().unwrap();
        assert_eq!(row.outcome, EventOutcome::Applied);
    }

    #[tokio::test]
    async fn replay_does_not_rerun() {
        let (guard, _) = guard();
        process_once(&guard, "evt_1", EventSource::Payment, "t", || async {
            Ok(WebhookOutcome::Applied)
        })
        .await
        .unwrap();

        let reran = AtomicBool::new(false);
        let outcome = process_once(&guard, "evt_1", EventSource::Payment, "t", || async {
            reran.store(true, Ordering::SeqCst);
            Ok(WebhookOutcome::Applied)
        })
        .await
        .unwrap();

        assert!(outcome.is_duplicate());
        assert!(!reran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn malformed_event_is_finalized_as_failed() {
        let (guard, store) = guard();

        let err = process_once(&guard, "evt_1", EventSource::Payment, "t", || async {
            Err(WebhookError::MalformedMetadata("no user id".to_string()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WebhookError::MalformedMetadata(_)));
        let row = store.find("evt_1").await.unwrap().unwrap();
        assert_eq!(row.outcome, EventOutcome::Failed);
        assert_eq!(row.error.as_deref(), Some("no user id"));
    }

    #[tokio::test]
    async fn transient_failure_releases_claim() {
        let (guard, store) = guard();

        let err = process_once(&guard, "evt_1", EventSource::Payment, "t", || async {
            Err(WebhookError::StoreUnavailable("down".to_string()))
        })
        .await
        .unwrap_err();

        assert!(err.is_retryable());
        assert!(store.find("evt_1").await.unwrap().is_none());
    }

    #[test]
    fn user_id_must_be_present() {
        assert!(parse_user_id(Some("user_1")).is_ok());
        assert!(matches!(parse_user_id(None), Err(WebhookError::MalformedMetadata(_))));
        assert!(matches!(parse_user_id(Some("  ")), Err(WebhookError::MalformedMetadata(_))));
    }
}
