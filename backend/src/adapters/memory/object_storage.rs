//! In-memory ObjectStorage.
//!
//! Signed URLs use a `memory://` scheme and carry the requested TTL so tests
//! can assert on it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{ObjectStorage, SignedUpload};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStorage {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object directly.
    pub async fn put(&self, path: impl Into<String>, bytes: Vec<u8>) {
        self.objects.write().await.insert(
            path.into(),
            StoredObject {
                bytes,
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    pub async fn content_type(&self, path: &str) -> Option<String> {
        self.objects.read().await.get(path).map(|o| o.content_type.clone())
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn download(&self, path: &str) -> Result<Vec<u8>, DomainError> {
        self.objects
            .read()
            .await
            .get(path)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| DomainError::new(ErrorCode::StorageError, format!("Object {} not found", path)))
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), DomainError> {
        self.objects.write().await.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), DomainError> {
        let mut objects = self.objects.write().await;
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, ttl_secs: u64) -> Result<String, DomainError> {
        Ok(format!("memory://{}?ttl={}", path, ttl_secs))
    }

    async fn create_signed_upload_url(&self, path: &str) -> Result<SignedUpload, DomainError> {
        Ok(SignedUpload {
            signed_url: format!("memory://upload/{}", path),
            path: path.to_string(),
            token: Some("memory-token".to_string()),
        })
    }
}
