//! Mock payment gateway for testing.
//!
//! Supports:
//! - Pre-configured checkout sessions
//! - Error injection
//! - Call tracking
//! - Webhook verification that skips signatures but decodes real payloads

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::webhooks::{PaymentEventEnvelope, WebhookError};
use crate::ports::{
    CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway, PaymentWebhookEvent,
};

use super::webhook_types::decode_event;

#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    next_checkout: Option<CheckoutSession>,
    next_error: Option<PaymentError>,
    checkout_requests: Vec<CheckoutRequest>,
    reject_webhooks: bool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that fails every webhook verification.
    pub fn rejecting_webhooks() -> Self {
        let mock = Self::new();
        mock.state().reject_webhooks = true;
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    pub fn set_checkout_session(&self, session: CheckoutSession) {
        self.state().next_checkout = Some(session);
    }

    /// Error returned by the next checkout call.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.state().checkout_requests.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut state = self.state();
        state.checkout_requests.push(request.clone());

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(state.next_checkout.take().unwrap_or_else(|| CheckoutSession {
            id: format!("cs_mock_{}", request.user_id),
            url: format!("https://checkout.mock/{}/{}", request.user_id, request.plan),
        }))
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        _signature: &str,
    ) -> Result<PaymentWebhookEvent, WebhookError> {
        if self.state().reject_webhooks {
            return Err(WebhookError::InvalidSignature);
        }
        let envelope: PaymentEventEnvelope =
            serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        decode_event(envelope)
    }
}
