//! HandlePaymentWebhookHandler - applies verified payment events to the ledger.

use std::sync::Arc;

use crate::application::services::{CreditLedgerEngine, IdempotencyGuard};
use crate::domain::billing::{EventSource, PlanPhase};
use crate::domain::foundation::UserId;
use crate::domain::webhooks::WebhookError;
use crate::ports::{PaymentEventPayload, PaymentEventType, PaymentGateway, PaymentWebhookEvent};

use super::{ledger_failure, parse_user_id, process_once, WebhookOutcome};

/// First invoice of a subscription; checkout completion already granted it.
const FIRST_INVOICE_REASON: &str = "subscription_create";

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw request body, exactly as signed.
    pub payload: Vec<u8>,
    /// Signature header value.
    pub signature: String,
}

pub struct HandlePaymentWebhookHandler {
    gateway: Arc<dyn PaymentGateway>,
    guard: Arc<IdempotencyGuard>,
    ledger: Arc<CreditLedgerEngine>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        guard: Arc<IdempotencyGuard>,
        ledger: Arc<CreditLedgerEngine>,
    ) -> Self {
        Self {
            gateway,
            guard,
            ledger,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<WebhookOutcome, WebhookError> {
        let event = self.gateway.verify_webhook(&cmd.payload, &cmd.signature)?;

        if let PaymentEventType::Unknown(event_type) = &event.event_type {
            tracing::debug!(event_id = %event.id, event_type = %event_type, "Ignoring payment event type");
            return Ok(WebhookOutcome::Acknowledged);
        }

        process_once(
            &self.guard,
            &event.id,
            EventSource::Payment,
            event.event_type.as_str(),
            || self.apply(&event),
        )
        .await
    }

    async fn apply(&self, event: &PaymentWebhookEvent) -> Result<WebhookOutcome, WebhookError> {
        match &event.data {
            PaymentEventPayload::Checkout {
                user_id,
                customer_email,
                plan_name,
                ..
            } => {
                let user_id = self.resolve_user(user_id.as_deref(), customer_email.as_deref()).await?;
                self.activate(event, &user_id, plan_name.as_deref(), PlanPhase::Initial).await
            }

            PaymentEventPayload::Invoice {
                user_id,
                customer_email,
                plan_name,
                billing_reason,
                ..
            } => {
                if self.ledger.policy().skip_first_invoice
                    && billing_reason.as_deref() == Some(FIRST_INVOICE_REASON)
                {
                    tracing::info!(event_id = %event.id, "First invoice acknowledged without grant");
                    return Ok(WebhookOutcome::Acknowledged);
                }
                let user_id = self.resolve_user(user_id.as_deref(), customer_email.as_deref()).await?;
                self.activate(event, &user_id, plan_name.as_deref(), PlanPhase::Renewal).await
            }

            PaymentEventPayload::Subscription { user_id, .. } => {
                let user_id = parse_user_id(user_id.as_deref())?;
                self.ledger
                    .on_subscription_cancelled(&user_id)
                    .await
                    .map_err(ledger_failure)?;
                tracing::info!(event_id = %event.id, user_id = %user_id, "Subscription cancellation applied");
                Ok(WebhookOutcome::Applied)
            }

            PaymentEventPayload::Other => Ok(WebhookOutcome::Acknowledged),
        }
    }

    async fn activate(
        &self,
        event: &PaymentWebhookEvent,
        user_id: &UserId,
        plan_name: Option<&str>,
        phase: PlanPhase,
    ) -> Result<WebhookOutcome, WebhookError> {
        let activation = self
            .ledger
            .on_subscription_activated(user_id, plan_name, phase)
            .await
            .map_err(ledger_failure)?;
        tracing::info!(
            event_id = %event.id,
            event_type = event.event_type.as_str(),
            user_id = %user_id,
            granted = activation.grant.credits_granted,
            "Payment event applied"
        );
        Ok(WebhookOutcome::Applied)
    }

    /// Metadata first, then the account holding the customer's email.
    async fn resolve_user(
        &self,
        user_id: Option<&str>,
        customer_email: Option<&str>,
    ) -> Result<UserId, WebhookError> {
        if user_id.is_some_and(|id| !id.trim().is_empty()) {
            return parse_user_id(user_id);
        }
        if let Some(email) = customer_email {
            if let Some(found) = self
                .ledger
                .find_user_by_email(email)
                .await
                .map_err(ledger_failure)?
            {
                return Ok(found);
            }
        }
        Err(WebhookError::MalformedMetadata(
            "no user id or known customer email in event".to_string(),
        ))
    }
}
