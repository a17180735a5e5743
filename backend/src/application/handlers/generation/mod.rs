//! Generation and gallery handlers.

mod create_upload_url;
mod delete_generation;
mod generate_image;
mod list_generations;

pub use create_upload_url::{CreateUploadUrlCommand, CreateUploadUrlHandler};
pub use delete_generation::{DeleteGenerationCommand, DeleteGenerationHandler};
pub use generate_image::{GenerateImageCommand, GenerateImageHandler, GenerateImageResult};
pub use list_generations::{GalleryItem, ListGenerationsHandler, ListGenerationsQuery};

/// Lifetime of signed read URLs handed to the browser (2 hours).
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 7200;
