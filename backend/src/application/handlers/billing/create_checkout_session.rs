//! CreateCheckoutSessionHandler - hosted subscription checkout for a paid tier.

use std::sync::Arc;

use crate::application::services::CreditLedgerEngine;
use crate::domain::billing::SubscriptionStatus;
use crate::domain::foundation::{DomainError, UserId, ValidationError};
use crate::ports::{CheckoutRequest, CheckoutSession, PaymentGateway};

#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionCommand {
    pub user_id: UserId,
    /// Requested tier, e.g. `pro_individual`.
    pub plan: String,
}

pub struct CreateCheckoutSessionHandler {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<CreditLedgerEngine>,
}

impl CreateCheckoutSessionHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, ledger: Arc<CreditLedgerEngine>) -> Self {
        Self { gateway, ledger }
    }

    pub async fn handle(&self, cmd: CreateCheckoutSessionCommand) -> Result<CheckoutSession, DomainError> {
        let plan: SubscriptionStatus = cmd.plan.parse()?;
        if !plan.is_paid() {
            return Err(ValidationError::invalid_format("plan", "must be a paid plan").into());
        }

        let account = self
            .ledger
            .ensure_account(&cmd.user_id, Default::default())
            .await?;

        let session = self
            .gateway
            .create_checkout_session(CheckoutRequest {
                user_id: cmd.user_id.clone(),
                plan,
                email: account.profile.email.clone(),
            })
            .await?;

        tracing::info!(user_id = %cmd.user_id, plan = %plan, session_id = %session.id, "Checkout session created");
        Ok(session)
    }
}
