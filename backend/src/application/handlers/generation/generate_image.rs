//! GenerateImageHandler - one synchronous transformation request.
//!
//! The job runs on its own task; the request only waits for it. A client
//! that disconnects or times out leaves the job to finish, debit and record
//! on its own.

use std::sync::Arc;

use crate::application::services::JobOrchestrator;
use crate::domain::foundation::{GenerationId, UserId};
use crate::domain::generation::{GenerationError, GenerationRecord, GenerationRequest};
use crate::ports::ObjectStorage;

use super::DEFAULT_SIGNED_URL_TTL_SECS;

#[derive(Debug, Clone)]
pub struct GenerateImageCommand {
    pub user_id: UserId,
    pub prompt: String,
    pub before_image_ref: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerateImageResult {
    pub record: GenerationRecord,
    /// Storage path of the result.
    pub result_ref: String,
    /// Signed URL for the result; absent if signing failed.
    pub result_url: Option<String>,
    pub credits_remaining: u32,
}

pub struct GenerateImageHandler {
    orchestrator: Arc<JobOrchestrator>,
    storage: Arc<dyn ObjectStorage>,
    signed_url_ttl_secs: u64,
}

impl GenerateImageHandler {
    pub fn new(orchestrator: Arc<JobOrchestrator>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            orchestrator,
            storage,
            signed_url_ttl_secs: DEFAULT_SIGNED_URL_TTL_SECS,
        }
    }

    pub fn with_signed_url_ttl(mut self, secs: u64) -> Self {
        self.signed_url_ttl_secs = secs;
        self
    }

    pub async fn handle(&self, cmd: GenerateImageCommand) -> Result<GenerateImageResult, GenerationError> {
        let parent_id = cmd
            .parent_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<GenerationId>()
                    .map_err(|_| GenerationError::Validation("parentId is not a valid id".to_string()))
            })
            .transpose()?;

        let request = GenerationRequest::new(cmd.user_id, &cmd.prompt, &cmd.before_image_ref, parent_id)?;
        let outcome = self
            .orchestrator
            .spawn(request)
            .await
            .map_err(|e| GenerationError::StoreUnavailable(format!("generation task failed: {}", e)))??;

        let result_ref = outcome.record.result_path.clone();
        let result_url = match self
            .storage
            .create_signed_url(&result_ref, self.signed_url_ttl_secs)
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(generation_id = %outcome.record.id, error = %e, "Failed to sign result URL");
                None
            }
        };

        Ok(GenerateImageResult {
            record: outcome.record,
            result_ref,
            result_url,
            credits_remaining: outcome.credits_remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::flux::MockImageProvider;
    use crate::adapters::memory::{
        InMemoryGenerationRepository, InMemoryJobCheckpointStore, InMemoryLedgerStore,
        InMemoryObjectStorage, InMemorySubscriptionEventStore,
    };
    use crate::application::services::{CreditLedgerEngine, IdempotencyGuard};
    use crate::domain::billing::{CreditPolicy, ProfileDetails};
    use crate::ports::{LedgerStore, ProviderStatus};
    use std::time::Duration;

    struct Fixture {
        handler: GenerateImageHandler,
        accounts: InMemoryLedgerStore,
        records: InMemoryGenerationRepository,
        checkpoints: InMemoryJobCheckpointStore,
    }

    async fn fixture(provider: MockImageProvider) -> Fixture {
        let accounts = InMemoryLedgerStore::new();
        let guard = Arc::new(IdempotencyGuard::new(Arc::new(InMemorySubscriptionEventStore::new())));
        let ledger = Arc::new(CreditLedgerEngine::new(
            Arc::new(accounts.clone()),
            guard,
            CreditPolicy::default(),
        ));
        let user = UserId::new("user_1").unwrap();
        ledger.on_account_created(&user, ProfileDetails::default()).await.unwrap();
        let storage = InMemoryObjectStorage::new();
        storage.put("user_1/room.jpg", vec![1]).await;
        let records = InMemoryGenerationRepository::new();
        let checkpoints = InMemoryJobCheckpointStore::new();
        let orchestrator = JobOrchestrator::new(
            ledger,
            Arc::new(provider),
            Arc::new(storage.clone()),
            Arc::new(records.clone()),
            Arc::new(checkpoints.clone()),
        );
        Fixture {
            handler: GenerateImageHandler::new(Arc::new(orchestrator), Arc::new(storage)),
            accounts,
            records,
            checkpoints,
        }
    }

    async fn handler() -> GenerateImageHandler {
        fixture(MockImageProvider::succeeding(vec![2])).await.handler
    }

    fn command(parent_id: Option<&str>) -> GenerateImageCommand {
        GenerateImageCommand {
            user_id: UserId::new("user_1").unwrap(),
            prompt: "modern scandinavian".to_string(),
            before_image_ref: "user_1/room.jpg".to_string(),
            parent_id: parent_id.map(str::to_string),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_signed_result_and_balance() {
        let handler = handler().await;

        let result = handler.handle(command(None)).await.unwrap();

        assert_eq!(result.credits_remaining, 1);
        assert!(result.result_ref.starts_with("user_1/results/"));
        assert_eq!(
            result.result_url,
            Some(format!("memory://{}?ttl=7200", result.result_ref))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_request_still_debits_and_records() {
        let f = fixture(
            MockImageProvider::new()
                .with_pending_polls(4)
                .with_poll(Ok(ProviderStatus::Ready {
                    sample_url: "https://mock.provider/sample.png".to_string(),
                }))
                .with_result_bytes(vec![2]),
        )
        .await;

        let abandoned =
            tokio::time::timeout(Duration::from_millis(1200), f.handler.handle(command(None))).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(5)).await;

        let user = UserId::new("user_1").unwrap();
        let account = f.accounts.get_account(&user).await.unwrap().unwrap();
        assert_eq!(account.credits_remaining, 1);
        assert_eq!(f.records.record_count().await, 1);
        assert_eq!(f.checkpoints.job_count().await, 0);
    }

    #[tokio::test]
    async fn malformed_parent_id_is_validation_error() {
        let handler = handler().await;

        let err = handler.handle(command(Some("not-a-uuid"))).await.unwrap_err();

        assert_eq!(err.kind(), "ValidationError");
    }

    #[tokio::test]
    async fn blank_prompt_is_validation_error() {
        let handler = handler().await;
        let mut cmd = command(None);
        cmd.prompt = "  ".to_string();

        let err = handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, GenerationError::Validation(_)));
    }
}
