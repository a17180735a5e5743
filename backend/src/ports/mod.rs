//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `LedgerStore` - Account rows and atomic billing mutations
//! - `SubscriptionEventStore` - Webhook idempotency records
//! - `GenerationRepository` - Gallery records
//! - `JobCheckpointStore` - In-flight generation jobs
//!
//! ## External Service Ports
//!
//! - `ObjectStorage` - Image bucket
//! - `ImageTransformProvider` - AI image editing service
//! - `PaymentGateway` - Checkout sessions and payment webhooks
//! - `IdentityWebhookVerifier` - User and session webhooks

mod generation_repository;
mod identity_webhooks;
mod image_provider;
mod job_checkpoint_store;
mod ledger_store;
mod object_storage;
mod payment_gateway;
mod subscription_event_store;

pub use generation_repository::GenerationRepository;
pub use identity_webhooks::{IdentityEventPayload, IdentityWebhookEvent, IdentityWebhookVerifier};
pub use image_provider::{ImageTransformProvider, ProviderError, ProviderStatus, TransformRequest};
pub use job_checkpoint_store::{JobCheckpointStore, DEFAULT_LEASE_SECS, MAX_LEASE_SECS};
pub use ledger_store::{CreditDelta, LedgerStore};
pub use object_storage::{ObjectStorage, SignedUpload};
pub use payment_gateway::{
    CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode, PaymentEventPayload,
    PaymentEventType, PaymentGateway, PaymentWebhookEvent,
};
pub use subscription_event_store::{ClaimResult, SubscriptionEventStore};
