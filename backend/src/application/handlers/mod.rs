//! Application handlers.
//!
//! One command or query handler per endpoint. Handlers translate requests
//! into service calls and narrow errors into the taxonomy their endpoint
//! reports.

pub mod billing;
pub mod generation;
pub mod webhooks;

pub use billing::{
    CreateCheckoutSessionCommand, CreateCheckoutSessionHandler, GetProfileHandler, GetProfileQuery,
};
pub use generation::{
    CreateUploadUrlCommand, CreateUploadUrlHandler, DeleteGenerationCommand,
    DeleteGenerationHandler, GalleryItem, GenerateImageCommand, GenerateImageHandler,
    GenerateImageResult, ListGenerationsHandler, ListGenerationsQuery,
};
pub use webhooks::{
    HandleIdentityWebhookCommand, HandleIdentityWebhookHandler, HandlePaymentWebhookCommand,
    HandlePaymentWebhookHandler, WebhookOutcome,
};
