//! Stripe objects as they arrive inside webhook payloads.
//!
//! Only the fields the ledger reads are modelled; everything is optional so a
//! sparse object still decodes and the missing-field decision is made by the
//! application layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::webhooks::{PaymentEventEnvelope, WebhookError};
use crate::ports::{PaymentEventPayload, PaymentEventType, PaymentWebhookEvent};

/// Metadata keys checked for the owning user, in order.
const USER_ID_KEYS: [&str; 2] = ["userId", "user_id"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<StripeCustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Legacy checkout line items.
    #[serde(default)]
    pub display_items: Vec<StripeDisplayItem>,
    /// Hosted checkout URL, present on create responses.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeCustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeDisplayItem {
    #[serde(default)]
    pub plan: Option<StripePlan>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripePlan {
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeInvoice {
    pub id: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub billing_reason: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub subscription_details: Option<StripeSubscriptionDetails>,
    #[serde(default)]
    pub lines: StripeInvoiceLines,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeSubscriptionDetails {
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeInvoiceLines {
    #[serde(default)]
    pub data: Vec<StripeInvoiceLine>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeInvoiceLine {
    #[serde(default)]
    pub plan: Option<StripePlan>,
    #[serde(default)]
    pub price: Option<StripePlan>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeSubscription {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn user_id_from(metadata: &HashMap<String, String>) -> Option<String> {
    USER_ID_KEYS
        .iter()
        .filter_map(|key| metadata.get(*key))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Plan written into metadata at checkout: display name first, then slug.
fn plan_from(metadata: &HashMap<String, String>) -> Option<String> {
    non_empty(metadata.get("plan_name").cloned()).or_else(|| non_empty(metadata.get("plan").cloned()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl StripeCheckoutSession {
    pub fn user_id(&self) -> Option<String> {
        non_empty(self.client_reference_id.clone()).or_else(|| user_id_from(&self.metadata))
    }

    pub fn plan_name(&self) -> Option<String> {
        plan_from(&self.metadata)
            .or_else(|| {
                non_empty(
                    self.display_items
                        .first()
                        .and_then(|item| item.plan.as_ref())
                        .and_then(|plan| plan.nickname.clone()),
                )
            })
    }

    pub fn email(&self) -> Option<String> {
        non_empty(self.customer_email.clone()).or_else(|| {
            non_empty(self.customer_details.as_ref().and_then(|d| d.email.clone()))
        })
    }
}

impl StripeInvoice {
    pub fn user_id(&self) -> Option<String> {
        user_id_from(&self.metadata)
            .or_else(|| {
                self.subscription_details
                    .as_ref()
                    .and_then(|d| user_id_from(&d.metadata))
            })
            .or_else(|| self.lines.data.first().and_then(|l| user_id_from(&l.metadata)))
    }

    /// Price nickname of the first line, else the plan stored on the
    /// subscription at checkout. Prices often carry no nickname.
    pub fn plan_name(&self) -> Option<String> {
        let line = self.lines.data.first();
        non_empty(line.and_then(|l| l.plan.as_ref()).and_then(|p| p.nickname.clone()))
            .or_else(|| non_empty(line.and_then(|l| l.price.as_ref()).and_then(|p| p.nickname.clone())))
            .or_else(|| self.subscription_details.as_ref().and_then(|d| plan_from(&d.metadata)))
            .or_else(|| plan_from(&self.metadata))
            .or_else(|| line.and_then(|l| plan_from(&l.metadata)))
    }
}

/// Decodes a verified envelope into the gateway-agnostic event.
pub fn decode_event(envelope: PaymentEventEnvelope) -> Result<PaymentWebhookEvent, WebhookError> {
    let event_type = PaymentEventType::parse(&envelope.event_type);
    let object = envelope.data.object;

    let data = match event_type {
        PaymentEventType::CheckoutSessionCompleted => {
            let session: StripeCheckoutSession = serde_json::from_value(object)
                .map_err(|e| WebhookError::ParseError(format!("invalid checkout session: {}", e)))?;
            PaymentEventPayload::Checkout {
                user_id: session.user_id(),
                customer_email: session.email(),
                plan_name: session.plan_name(),
                session_id: session.id,
            }
        }
        PaymentEventType::InvoicePaymentSucceeded => {
            let invoice: StripeInvoice = serde_json::from_value(object)
                .map_err(|e| WebhookError::ParseError(format!("invalid invoice: {}", e)))?;
            PaymentEventPayload::Invoice {
                user_id: invoice.user_id(),
                customer_email: non_empty(invoice.customer_email.clone()),
                plan_name: invoice.plan_name(),
                billing_reason: invoice.billing_reason.clone(),
                invoice_id: invoice.id,
            }
        }
        PaymentEventType::SubscriptionDeleted => {
            let subscription: StripeSubscription = serde_json::from_value(object)
                .map_err(|e| WebhookError::ParseError(format!("invalid subscription: {}", e)))?;
            PaymentEventPayload::Subscription {
                user_id: user_id_from(&subscription.metadata),
                subscription_id: subscription.id,
            }
        }
        PaymentEventType::Unknown(_) => PaymentEventPayload::Other,
    };

    Ok(PaymentWebhookEvent {
        id: envelope.id,
        event_type,
        data,
        created_at: envelope.created,
        livemode: envelope.livemode,
    })
}
