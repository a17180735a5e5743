//! DeleteGenerationHandler - ownership-checked soft delete.

use std::sync::Arc;

use crate::domain::foundation::{GenerationId, UserId};
use crate::domain::generation::GenerationError;
use crate::ports::{GenerationRepository, ObjectStorage};

#[derive(Debug, Clone)]
pub struct DeleteGenerationCommand {
    pub user_id: UserId,
    pub generation_id: String,
}

pub struct DeleteGenerationHandler {
    records: Arc<dyn GenerationRepository>,
    storage: Arc<dyn ObjectStorage>,
}

impl DeleteGenerationHandler {
    pub fn new(records: Arc<dyn GenerationRepository>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { records, storage }
    }

    /// Marks the record deleted, then removes the result artifact.
    ///
    /// The source image is kept since regenerations share it.
    pub async fn handle(&self, cmd: DeleteGenerationCommand) -> Result<(), GenerationError> {
        let id: GenerationId = cmd
            .generation_id
            .parse()
            .map_err(|_| GenerationError::NotFound(format!("generation {}", cmd.generation_id)))?;

        let record = self
            .records
            .find_by_id(&id)
            .await?
            .filter(|r| !r.deleted)
            .ok_or_else(|| GenerationError::NotFound(format!("generation {}", id)))?;

        if !record.is_owned_by(&cmd.user_id) {
            tracing::warn!(user_id = %cmd.user_id, generation_id = %id, "Delete of foreign generation refused");
            return Err(GenerationError::Forbidden);
        }

        self.records.mark_deleted(&id).await?;

        if let Err(e) = self.storage.remove(&[record.result_path.clone()]).await {
            tracing::warn!(generation_id = %id, error = %e, "Artifact removal failed");
        }
        tracing::info!(user_id = %cmd.user_id, generation_id = %id, "Generation deleted");
        Ok(())
    }
}
