//! GenerationRepository port - gallery records.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, GenerationId, UserId};
use crate::domain::generation::GenerationRecord;

#[async_trait]
pub trait GenerationRepository: Send + Sync {
    /// Inserts a record. Inserting an id that already exists is a no-op.
    async fn insert(&self, record: &GenerationRecord) -> Result<(), DomainError>;

    /// Finds a record, including soft-deleted ones.
    async fn find_by_id(&self, id: &GenerationId) -> Result<Option<GenerationRecord>, DomainError>;

    /// Non-deleted records of one user, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<GenerationRecord>, DomainError>;

    /// Sets the soft-delete flag. Fails with `GenerationNotFound` if absent.
    async fn mark_deleted(&self, id: &GenerationId) -> Result<(), DomainError>;
}
