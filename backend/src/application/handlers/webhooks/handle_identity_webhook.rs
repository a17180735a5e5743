//! HandleIdentityWebhookHandler - account signup, profile sync and login
//! tracking from identity-provider events.

use std::sync::Arc;

use crate::application::services::{CreditLedgerEngine, IdempotencyGuard};
use crate::domain::billing::EventSource;
use crate::domain::webhooks::{IdentityDeliveryHeaders, WebhookError};
use crate::ports::{IdentityEventPayload, IdentityWebhookEvent, IdentityWebhookVerifier};

use super::{ledger_failure, parse_user_id, process_once, WebhookOutcome};

/// Command to handle an identity webhook.
#[derive(Debug, Clone)]
pub struct HandleIdentityWebhookCommand {
    pub payload: Vec<u8>,
    pub headers: IdentityDeliveryHeaders,
}

pub struct HandleIdentityWebhookHandler {
    verifier: Arc<dyn IdentityWebhookVerifier>,
    guard: Arc<IdempotencyGuard>,
    ledger: Arc<CreditLedgerEngine>,
}

impl HandleIdentityWebhookHandler {
    pub fn new(
        verifier: Arc<dyn IdentityWebhookVerifier>,
        guard: Arc<IdempotencyGuard>,
        ledger: Arc<CreditLedgerEngine>,
    ) -> Self {
        Self {
            verifier,
            guard,
            ledger,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleIdentityWebhookCommand,
    ) -> Result<WebhookOutcome, WebhookError> {
        let event = self.verifier.verify_webhook(&cmd.payload, &cmd.headers)?;

        if event.data == IdentityEventPayload::Other {
            tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring identity event type");
            return Ok(WebhookOutcome::Acknowledged);
        }

        process_once(
            &self.guard,
            &event.id,
            EventSource::Identity,
            &event.event_type,
            || self.apply(&event),
        )
        .await
    }

    async fn apply(&self, event: &IdentityWebhookEvent) -> Result<WebhookOutcome, WebhookError> {
        match &event.data {
            IdentityEventPayload::UserUpserted { user_id, profile } => {
                let user_id = parse_user_id(user_id.as_deref())?;
                let upsert = self
                    .ledger
                    .on_account_created(&user_id, profile.clone())
                    .await
                    .map_err(ledger_failure)?;
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    user_id = %user_id,
                    credits = upsert.account().credits_remaining,
                    "Identity user synced"
                );
                Ok(WebhookOutcome::Applied)
            }
            IdentityEventPayload::SessionCreated { user_id } => {
                let user_id = parse_user_id(user_id.as_deref())?;
                self.ledger
                    .on_session_created(&user_id)
                    .await
                    .map_err(ledger_failure)?;
                tracing::debug!(event_id = %event.id, user_id = %user_id, "Login recorded");
                Ok(WebhookOutcome::Applied)
            }
            IdentityEventPayload::Other => Ok(WebhookOutcome::Acknowledged),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clerk::ClerkWebhookVerifier;
    use crate::adapters::memory::{InMemoryLedgerStore, InMemorySubscriptionEventStore};
    use crate::domain::billing::{CreditPolicy, SubscriptionStatus};
    use crate::domain::foundation::{JobId, UserId};
    use crate::domain::webhooks::sign_identity_payload;
    use crate::ports::LedgerStore;

    // "stage-ai-test-key" base64 encoded
    const SECRET: &str = "whsec_c3RhZ2UtYWktdGVzdC1rZXk=";

    fn handler() -> (HandleIdentityWebhookHandler, InMemoryLedgerStore, InMemorySubscriptionEventStore) {
        let accounts = InMemoryLedgerStore::new();
        let events = InMemorySubscriptionEventStore::new();
        let guard = Arc::new(IdempotencyGuard::new(Arc::new(events.clone())));
        let ledger = Arc::new(CreditLedgerEngine::new(
            Arc::new(accounts.clone()),
            guard.clone(),
            CreditPolicy::default(),
        ));
        let verifier = Arc::new(ClerkWebhookVerifier::new(SECRET).unwrap());
        (HandleIdentityWebhookHandler::new(verifier, guard, ledger), accounts, events)
    }

    fn signed(message_id: &str, body: &str) -> HandleIdentityWebhookCommand {
        let ts = chrono::Utc::now().timestamp();
        HandleIdentityWebhookCommand {
            payload: body.as_bytes().to_vec(),
            headers: IdentityDeliveryHeaders {
                message_id: message_id.to_string(),
                timestamp: ts.to_string(),
                signature: sign_identity_payload(SECRET, message_id, ts, body),
            },
        }
    }

    fn user() -> UserId {
        UserId::new("user_1").unwrap()
    }

    const USER_CREATED: &str = r#"{"type":"user.created","data":{"id":"user_1","email_addresses":[{"email_address":"ada@example.com"}],"first_name":"Ada","last_name":"Lovelace"}}"#;

    #[tokio::test]
    async fn user_created_opens_free_account() {
        let (handler, accounts, _) = handler();

        let outcome = handler.handle(signed("msg_1", USER_CREATED)).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::Applied);
        let account = accounts.get_account(&user()).await.unwrap().unwrap();
        assert_eq!(account.subscription_status, SubscriptionStatus::Free);
        assert_eq!(account.credits_remaining, 2);
        assert_eq!(account.profile.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn redelivered_signup_is_duplicate() {
        let (handler, accounts, events) = handler();
        handler.handle(signed("msg_1", USER_CREATED)).await.unwrap();

        let outcome = handler.handle(signed("msg_1", USER_CREATED)).await.unwrap();

        assert!(outcome.is_duplicate());
        assert_eq!(accounts.account_count().await, 1);
        assert_eq!(events.len().await, 1);
    }

    #[tokio::test]
    async fn user_updated_only_touches_profile() {
        let (handler, accounts, _) = handler();
        handler.handle(signed("msg_1", USER_CREATED)).await.unwrap();
        accounts.debit_one(&user(), &JobId::new()).await.unwrap();
        let updated = r#"{"type":"user.updated","data":{"id":"user_1","email_addresses":[{"email_address":"new@example.com"}]}}"#;

        handler.handle(signed("msg_2", updated)).await.unwrap();

        let account = accounts.get_account(&user()).await.unwrap().unwrap();
        assert_eq!(account.profile.email.as_deref(), Some("new@example.com"));
        assert_eq!(account.credits_remaining, 1);
    }

    #[tokio::test]
    async fn session_created_records_login() {
        let (handler, accounts, _) = handler();

        handler
            .handle(signed("msg_3", r#"{"type":"session.created","data":{"user_id":"user_1"}}"#))
            .await
            .unwrap();

        let account = accounts.get_account(&user()).await.unwrap().unwrap();
        assert!(account.last_login_at.is_some());
    }

    #[tokio::test]
    async fn tampered_delivery_is_rejected() {
        let (handler, accounts, events) = handler();
        let mut cmd = signed("msg_1", USER_CREATED);
        cmd.payload = USER_CREATED.replace("user_1", "user_2").into_bytes();

        let err = handler.handle(cmd).await.unwrap_err();

        assert_eq!(err, WebhookError::InvalidSignature);
        assert_eq!(accounts.account_count().await, 0);
        assert!(events.is_empty().await);
    }

    #[tokio::test]
    async fn unrecognized_type_is_acknowledged() {
        let (handler, _, events) = handler();

        let outcome = handler
            .handle(signed("msg_4", r#"{"type":"organization.created","data":{"id":"org_1"}}"#))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Acknowledged);
        assert!(events.is_empty().await);
    }
}
