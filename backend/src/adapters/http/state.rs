//! Shared application state for the HTTP adapter.

use std::sync::Arc;

use crate::application::handlers::{
    CreateCheckoutSessionHandler, CreateUploadUrlHandler, DeleteGenerationHandler,
    GenerateImageHandler, GetProfileHandler, HandleIdentityWebhookHandler,
    HandlePaymentWebhookHandler, ListGenerationsHandler,
};
use crate::application::services::{CreditLedgerEngine, IdempotencyGuard, JobOrchestrator};
use crate::ports::{GenerationRepository, IdentityWebhookVerifier, ObjectStorage, PaymentGateway};

use super::middleware::SessionAuth;

/// Shared application state containing all dependencies.
///
/// Cloned per request; every dependency is behind an `Arc`. Handlers are
/// built on demand from the shared services.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<CreditLedgerEngine>,
    pub guard: Arc<IdempotencyGuard>,
    pub orchestrator: Arc<JobOrchestrator>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub identity_verifier: Arc<dyn IdentityWebhookVerifier>,
    pub storage: Arc<dyn ObjectStorage>,
    pub generations: Arc<dyn GenerationRepository>,
    pub session_auth: SessionAuth,
    pub signed_url_ttl_secs: u64,
}

impl AppState {
    pub fn payment_webhook_handler(&self) -> HandlePaymentWebhookHandler {
        HandlePaymentWebhookHandler::new(
            self.payment_gateway.clone(),
            self.guard.clone(),
            self.ledger.clone(),
        )
    }

    pub fn identity_webhook_handler(&self) -> HandleIdentityWebhookHandler {
        HandleIdentityWebhookHandler::new(
            self.identity_verifier.clone(),
            self.guard.clone(),
            self.ledger.clone(),
        )
    }

    pub fn generate_image_handler(&self) -> GenerateImageHandler {
        GenerateImageHandler::new(self.orchestrator.clone(), self.storage.clone())
            .with_signed_url_ttl(self.signed_url_ttl_secs)
    }

    pub fn list_generations_handler(&self) -> ListGenerationsHandler {
        ListGenerationsHandler::new(self.generations.clone(), self.storage.clone())
            .with_signed_url_ttl(self.signed_url_ttl_secs)
    }

    pub fn delete_generation_handler(&self) -> DeleteGenerationHandler {
        DeleteGenerationHandler::new(self.generations.clone(), self.storage.clone())
    }

    pub fn create_upload_url_handler(&self) -> CreateUploadUrlHandler {
        CreateUploadUrlHandler::new(self.storage.clone())
    }

    pub fn get_profile_handler(&self) -> GetProfileHandler {
        GetProfileHandler::new(self.ledger.clone())
    }

    pub fn create_checkout_session_handler(&self) -> CreateCheckoutSessionHandler {
        CreateCheckoutSessionHandler::new(self.payment_gateway.clone(), self.ledger.clone())
    }
}
