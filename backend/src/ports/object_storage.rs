//! ObjectStorage port - the bucket holding source and result images.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::DomainError;

/// A pre-authorized upload target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUpload {
    pub signed_url: String,
    pub path: String,
    pub token: Option<String>,
}

/// Port for object storage. Paths are relative to the configured bucket.
///
/// Failures are reported with `ErrorCode::StorageError`.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn download(&self, path: &str) -> Result<Vec<u8>, DomainError>;

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), DomainError>;

    /// Removes objects; missing objects are not an error.
    async fn remove(&self, paths: &[String]) -> Result<(), DomainError>;

    /// Time-limited read URL.
    async fn create_signed_url(&self, path: &str, ttl_secs: u64) -> Result<String, DomainError>;

    async fn create_signed_upload_url(&self, path: &str) -> Result<SignedUpload, DomainError>;
}
