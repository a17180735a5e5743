//! In-memory GenerationRepository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, GenerationId, UserId};
use crate::domain::generation::GenerationRecord;
use crate::ports::GenerationRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryGenerationRepository {
    records: Arc<RwLock<HashMap<GenerationId, GenerationRecord>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryGenerationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes inserts fail with `DatabaseError` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Count of all records, deleted ones included.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl GenerationRepository for InMemoryGenerationRepository {
    async fn insert(&self, record: &GenerationRecord) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("generation store unavailable"));
        }
        self.records
            .write()
            .await
            .entry(record.id)
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &GenerationId) -> Result<Option<GenerationRecord>, DomainError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<GenerationRecord>, DomainError> {
        let records = self.records.read().await;
        let mut owned: Vec<GenerationRecord> = records
            .values()
            .filter(|r| !r.deleted && r.is_owned_by(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn mark_deleted(&self, id: &GenerationId) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::GenerationNotFound, format!("Generation {} not found", id))
        })?;
        record.mark_deleted();
        Ok(())
    }
}
