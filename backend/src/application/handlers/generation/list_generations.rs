//! ListGenerationsHandler - the caller's gallery with signed image URLs.

use std::sync::Arc;

use futures::future::join_all;

use crate::domain::foundation::UserId;
use crate::domain::generation::{GenerationError, GenerationRecord};
use crate::ports::{GenerationRepository, ObjectStorage};

use super::DEFAULT_SIGNED_URL_TTL_SECS;

#[derive(Debug, Clone)]
pub struct ListGenerationsQuery {
    pub user_id: UserId,
}

/// One gallery entry. URLs are `None` when signing failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryItem {
    pub record: GenerationRecord,
    pub before_url: Option<String>,
    pub after_url: Option<String>,
}

pub struct ListGenerationsHandler {
    records: Arc<dyn GenerationRepository>,
    storage: Arc<dyn ObjectStorage>,
    signed_url_ttl_secs: u64,
}

impl ListGenerationsHandler {
    pub fn new(records: Arc<dyn GenerationRepository>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            records,
            storage,
            signed_url_ttl_secs: DEFAULT_SIGNED_URL_TTL_SECS,
        }
    }

    pub fn with_signed_url_ttl(mut self, secs: u64) -> Self {
        self.signed_url_ttl_secs = secs;
        self
    }

    /// Newest first; all URLs are signed concurrently.
    pub async fn handle(&self, query: ListGenerationsQuery) -> Result<Vec<GalleryItem>, GenerationError> {
        let records = self.records.list_for_user(&query.user_id).await?;
        Ok(join_all(records.into_iter().map(|record| self.sign(record))).await)
    }

    async fn sign(&self, record: GenerationRecord) -> GalleryItem {
        let (before_url, after_url) = futures::join!(
            self.signed_url(&record.original_path),
            self.signed_url(&record.result_path)
        );
        GalleryItem {
            record,
            before_url,
            after_url,
        }
    }

    async fn signed_url(&self, path: &str) -> Option<String> {
        match self.storage.create_signed_url(path, self.signed_url_ttl_secs).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(path, error = %e, "Failed to sign gallery URL");
                None
            }
        }
    }
}
