//! Payment gateway port - checkout sessions and verified webhook events.
//!
//! # Design
//!
//! - **Gateway agnostic**: handlers see typed events, never provider JSON
//! - **Verification inside the adapter**: `verify_webhook` only returns events
//!   whose signature checked out

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::SubscriptionStatus;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::webhooks::WebhookError;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a hosted subscription checkout for one paid tier.
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Verifies a webhook signature and decodes the event.
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<PaymentWebhookEvent, WebhookError>;
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub plan: SubscriptionStatus,
    /// Customer email for pre-fill.
    pub email: Option<String>,
}

/// Hosted checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// A verified webhook event from the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentWebhookEvent {
    pub id: String,
    pub event_type: PaymentEventType,
    pub data: PaymentEventPayload,
    pub created_at: i64,
    pub livemode: bool,
}

/// Event types the ledger reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventType {
    CheckoutSessionCompleted,
    InvoicePaymentSucceeded,
    SubscriptionDeleted,
    Unknown(String),
}

impl PaymentEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::Unknown(s) => s,
        }
    }
}

/// Decoded event payload, reduced to what the ledger needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventPayload {
    Checkout {
        session_id: String,
        /// `client_reference_id`, else metadata `userId`/`user_id`.
        user_id: Option<String>,
        customer_email: Option<String>,
        plan_name: Option<String>,
    },
    Invoice {
        invoice_id: String,
        /// Metadata `user_id`/`userId` on the invoice or its subscription.
        user_id: Option<String>,
        customer_email: Option<String>,
        plan_name: Option<String>,
        /// `subscription_create`, `subscription_cycle`, ...
        billing_reason: Option<String>,
    },
    Subscription {
        subscription_id: String,
        user_id: Option<String>,
    },
    Other,
}

/// Errors from payment gateway calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// Provider's own error code, if any.
    pub provider_code: Option<String>,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::InvalidRequest => ErrorCode::ValidationFailed,
            _ => ErrorCode::ProviderError,
        };
        DomainError::new(code, err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    InvalidRequest,
    RateLimitExceeded,
    ProviderError,
    /// No price configured for the requested plan.
    PlanNotConfigured,
}

impl PaymentErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::PlanNotConfigured => "plan_not_configured",
        };
        write!(f, "{}", s)
    }
}
