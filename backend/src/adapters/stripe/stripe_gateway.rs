//! Stripe payment gateway adapter.
//!
//! Implements `PaymentGateway` over the Stripe REST API: hosted subscription
//! checkout sessions and webhook verification.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::billing::SubscriptionStatus;
use crate::domain::webhooks::{PaymentSignatureVerifier, WebhookError};
use crate::ports::{
    CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode, PaymentGateway,
    PaymentWebhookEvent,
};

use super::webhook_types::{decode_event, StripeCheckoutSession, StripeErrorBody};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe price ids per paid tier.
#[derive(Debug, Clone, Default)]
pub struct PlanPrices {
    pub pro_individual: Option<String>,
    pub pro_agency: Option<String>,
    pub custom: Option<String>,
}

impl PlanPrices {
    fn price_for(&self, plan: SubscriptionStatus) -> Result<&str, PaymentError> {
        let price = match plan {
            SubscriptionStatus::Free => {
                return Err(PaymentError::invalid_request(
                    "Free tier does not have a Stripe price",
                ))
            }
            SubscriptionStatus::ProIndividual => self.pro_individual.as_deref(),
            SubscriptionStatus::ProAgency => self.pro_agency.as_deref(),
            SubscriptionStatus::Custom => self.custom.as_deref(),
        };
        price.ok_or_else(|| {
            PaymentError::new(
                PaymentErrorCode::PlanNotConfigured,
                format!("No Stripe price configured for {}", plan),
            )
        })
    }
}

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    api_base_url: String,

    prices: PlanPrices,

    success_url: String,

    cancel_url: String,

    /// Reject test-mode events.
    require_livemode: bool,

    request_timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            prices: PlanPrices::default(),
            success_url: "http://localhost:3000/billing/success".to_string(),
            cancel_url: "http://localhost:3000/billing/cancel".to_string(),
            require_livemode: false,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_prices(mut self, prices: PlanPrices) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_redirect_urls(mut self, success: impl Into<String>, cancel: impl Into<String>) -> Self {
        self.success_url = success.into();
        self.cancel_url = cancel.into();
        self
    }

    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Stripe payment gateway.
pub struct StripePaymentGateway {
    config: StripeConfig,
    verifier: PaymentSignatureVerifier,
    http_client: reqwest::Client,
}

impl StripePaymentGateway {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("Failed to build HTTP client: {}", e)))?;
        let verifier = PaymentSignatureVerifier::new(config.webhook_secret.expose_secret().clone());

        Ok(Self {
            config,
            verifier,
            http_client,
        })
    }

    fn checkout_params(&self, request: &CheckoutRequest) -> Result<Vec<(&'static str, String)>, PaymentError> {
        let price_id = self.config.prices.price_for(request.plan)?;
        let user_id = request.user_id.to_string();

        let mut params = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", self.config.success_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
            ("client_reference_id", user_id.clone()),
            ("metadata[userId]", user_id.clone()),
            ("metadata[plan]", request.plan.as_str().to_string()),
            ("metadata[plan_name]", request.plan.display_name().to_string()),
            ("subscription_data[metadata][userId]", user_id),
            ("subscription_data[metadata][plan]", request.plan.as_str().to_string()),
            (
                "subscription_data[metadata][plan_name]",
                request.plan.display_name().to_string(),
            ),
        ];
        if let Some(email) = &request.email {
            params.push(("customer_email", email.clone()));
        }
        Ok(params)
    }
}

/// Maps a non-success Stripe response to a payment error.
fn error_from_response(status: reqwest::StatusCode, body: &str) -> PaymentError {
    let detail = serde_json::from_str::<StripeErrorBody>(body).ok().map(|b| b.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status));

    let code = match status.as_u16() {
        400 | 404 => PaymentErrorCode::InvalidRequest,
        401 | 403 => PaymentErrorCode::AuthenticationError,
        429 => PaymentErrorCode::RateLimitExceeded,
        _ => PaymentErrorCode::ProviderError,
    };

    let error = PaymentError::new(code, message);
    match detail.and_then(|d| d.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let params = self.checkout_params(&request)?;

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = error_from_response(status, &body);
            tracing::error!(
                user_id = %request.user_id,
                status = status.as_u16(),
                error = %error,
                "Stripe create_checkout_session failed"
            );
            return Err(error);
        }

        let session: StripeCheckoutSession = response.json().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })?;

        let url = session.url.clone().ok_or_else(|| {
            PaymentError::new(PaymentErrorCode::ProviderError, "Checkout session has no URL")
        })?;

        tracing::info!(
            user_id = %request.user_id,
            plan = %request.plan,
            session_id = %session.id,
            "Created checkout session"
        );

        Ok(CheckoutSession { id: session.id, url })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<PaymentWebhookEvent, WebhookError> {
        let envelope = self.verifier.verify_and_parse(payload, signature)?;

        if self.config.require_livemode && !envelope.livemode {
            tracing::warn!(event_id = %envelope.id, "Rejected test mode event in production");
            return Err(WebhookError::ParseError(
                "test mode events are not accepted".to_string(),
            ));
        }

        decode_event(envelope)
    }
}
