//! Stripe adapters - Payment gateway implementations.
//!
//! - `StripePaymentGateway` - Production adapter over the Stripe REST API
//! - `MockPaymentGateway` - Configurable mock for tests

mod mock_payment_gateway;
mod stripe_gateway;
mod webhook_types;

pub use mock_payment_gateway::MockPaymentGateway;
pub use stripe_gateway::{PlanPrices, StripeConfig, StripePaymentGateway};
pub use webhook_types::decode_event;
