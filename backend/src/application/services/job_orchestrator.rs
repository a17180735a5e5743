//! JobOrchestrator - drives one image transformation end to end.
//!
//! ```text
//! submit ──► poll loop (checkpoint, sleep, poll) ──► complete
//!                 │                                    │
//!                 ├─ Failed / TimedOut: no debit       ├─ fetch + upload artifact, checkpoint
//!                 └─ checkpoint discarded              ├─ debit one credit (once per job)
//!                                                      └─ insert gallery record (keyed by job)
//! ```
//!
//! The debit happens only after the provider reported success, and the
//! gallery record only after the debit committed. Both are idempotent per
//! job, so a job resumed after a crash at any point is charged once and
//! recorded once. A failed debit or record insert keeps the checkpoint for
//! the next recovery sweep.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::task::JoinHandle;

use crate::domain::billing::LedgerError;
use crate::domain::foundation::{ErrorCode, GenerationId, JobId};
use crate::domain::generation::{
    GenerationError, GenerationJob, GenerationRecord, GenerationRequest, PollingPolicy,
};
use crate::ports::{
    GenerationRepository, ImageTransformProvider, JobCheckpointStore, ObjectStorage, ProviderError,
    ProviderStatus, TransformRequest,
};

use super::CreditLedgerEngine;

const RESULT_CONTENT_TYPE: &str = "image/png";

/// A finished, debited and recorded generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub job_id: JobId,
    pub record: GenerationRecord,
    pub credits_remaining: u32,
}

pub struct JobOrchestrator {
    ledger: Arc<CreditLedgerEngine>,
    provider: Arc<dyn ImageTransformProvider>,
    storage: Arc<dyn ObjectStorage>,
    records: Arc<dyn GenerationRepository>,
    checkpoints: Arc<dyn JobCheckpointStore>,
    polling: PollingPolicy,
}

impl JobOrchestrator {
    pub fn new(
        ledger: Arc<CreditLedgerEngine>,
        provider: Arc<dyn ImageTransformProvider>,
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn GenerationRepository>,
        checkpoints: Arc<dyn JobCheckpointStore>,
    ) -> Self {
        Self {
            ledger,
            provider,
            storage,
            records,
            checkpoints,
            polling: PollingPolicy::default(),
        }
    }

    pub fn with_polling(mut self, polling: PollingPolicy) -> Self {
        self.polling = polling;
        self
    }

    /// Submits, polls and completes one job.
    pub async fn run(&self, request: GenerationRequest) -> Result<GenerationOutcome, GenerationError> {
        let job = self.submit(request).await?;
        self.drive(job).await
    }

    /// Runs one job on its own task. Dropping the returned handle does not
    /// cancel the job.
    pub fn spawn(
        self: &Arc<Self>,
        request: GenerationRequest,
    ) -> JoinHandle<Result<GenerationOutcome, GenerationError>> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.run(request).await })
    }

    /// Drives a submitted or resumed job to completion.
    pub async fn drive(&self, mut job: GenerationJob) -> Result<GenerationOutcome, GenerationError> {
        let sample_url = match job.sample_url() {
            Some(url) => url.to_string(),
            None => self.poll(&mut job).await?,
        };
        self.complete(&mut job, &sample_url).await
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Submit
    // ════════════════════════════════════════════════════════════════════════════

    /// Checks credits and lineage, then hands the source image to the provider.
    ///
    /// The credit check is advisory; nothing is debited here.
    pub async fn submit(&self, request: GenerationRequest) -> Result<GenerationJob, GenerationError> {
        self.ledger.check_can_generate(&request.user_id).await?;

        if let Some(parent_id) = &request.parent_id {
            self.check_parent(&request, parent_id).await?;
        }

        let source = self.storage.download(&request.source_ref).await?;
        let handle = self
            .provider
            .submit(TransformRequest {
                prompt: request.prompt.clone(),
                input_image: STANDARD.encode(source),
            })
            .await
            .map_err(provider_failure)?;

        let job = GenerationJob::submitted(JobId::new(), request, handle);
        tracing::info!(
            job_id = %job.id,
            user_id = %job.user_id,
            request_id = %job.handle.request_id,
            "Generation job submitted"
        );
        self.checkpoint(&job).await?;
        Ok(job)
    }

    async fn check_parent(
        &self,
        request: &GenerationRequest,
        parent_id: &GenerationId,
    ) -> Result<(), GenerationError> {
        let parent = self.records.find_by_id(parent_id).await?;
        match parent {
            Some(parent) if !parent.deleted && parent.is_owned_by(&request.user_id) => Ok(()),
            _ => Err(GenerationError::Validation(
                "parentId must reference one of your generations".to_string(),
            )),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Poll
    // ════════════════════════════════════════════════════════════════════════════

    /// Polls until the provider is ready, fails, or the attempt budget runs out.
    ///
    /// Returns the provider's sample URL. Resumed jobs continue counting from
    /// their checkpointed attempt.
    pub async fn poll(&self, job: &mut GenerationJob) -> Result<String, GenerationError> {
        let first = job.attempts_made() + 1;

        for attempt in first..=self.polling.max_attempts {
            job.begin_attempt(attempt)?;
            self.checkpoint(job).await?;
            tokio::time::sleep(self.polling.interval).await;

            match self.provider.poll(&job.handle).await {
                Ok(ProviderStatus::Ready { sample_url }) => {
                    tracing::debug!(job_id = %job.id, attempt, "Provider result ready");
                    return Ok(sample_url);
                }
                Ok(ProviderStatus::Failed { reason }) => {
                    tracing::warn!(job_id = %job.id, user_id = %job.user_id, reason = %reason, "Provider reported failure");
                    job.fail(reason.clone())?;
                    self.discard(job).await;
                    return Err(GenerationError::ProviderFailed(reason));
                }
                Ok(ProviderStatus::Pending(label)) => {
                    tracing::trace!(job_id = %job.id, attempt, status = %label, "Still pending");
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(job_id = %job.id, attempt, error = %e, "Poll failed, will retry");
                }
                Err(e) => {
                    tracing::warn!(job_id = %job.id, user_id = %job.user_id, error = %e, "Poll rejected");
                    job.fail(e.to_string())?;
                    self.discard(job).await;
                    return Err(provider_failure(e));
                }
            }
        }

        job.time_out()?;
        let attempts = job.attempts_made();
        tracing::warn!(job_id = %job.id, user_id = %job.user_id, attempts, "Generation job timed out");
        self.discard(job).await;
        Err(GenerationError::ProviderTimedOut { attempts })
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Complete
    // ════════════════════════════════════════════════════════════════════════════

    /// Stores the artifact, debits one credit, then records the generation.
    ///
    /// Steps already checkpointed by an earlier attempt are skipped.
    pub async fn complete(
        &self,
        job: &mut GenerationJob,
        sample_url: &str,
    ) -> Result<GenerationOutcome, GenerationError> {
        if job.sample_url().is_none() {
            job.begin_completion(sample_url)?;
            self.checkpoint(job).await?;
        }

        let result_path = match job.stored_result() {
            Some(path) => path.to_string(),
            None => self.store_result(job, sample_url).await?,
        };

        let account = match self.ledger.debit_for_generation(&job.user_id, &job.id).await {
            Ok(account) => account,
            Err(LedgerError::StoreUnavailable(msg)) => {
                tracing::warn!(job_id = %job.id, user_id = %job.user_id, error = %msg, "Debit failed, job kept for recovery");
                return Err(GenerationError::StoreUnavailable(msg));
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, user_id = %job.user_id, error = %e, "Debit refused, discarding result");
                self.remove_artifact(&result_path).await;
                job.fail(e.to_string())?;
                self.discard(job).await;
                return Err(e.into());
            }
        };

        let record = GenerationRecord::new(
            job.generation_id(),
            job.user_id.clone(),
            job.source_ref.clone(),
            result_path.clone(),
            job.prompt.clone(),
            job.parent_id,
        );
        if let Err(e) = self.records.insert(&record).await {
            // The credit is spent; recovery inserts the same record later.
            tracing::error!(
                job_id = %job.id,
                user_id = %job.user_id,
                generation_id = %record.id,
                error = %e,
                "Failed to record debited generation, job kept for recovery"
            );
            return Err(e.into());
        }
        job.succeed(result_path)?;
        self.discard(job).await;

        tracing::info!(
            job_id = %job.id,
            user_id = %job.user_id,
            generation_id = %record.id,
            credits_remaining = account.credits_remaining,
            "Generation completed"
        );
        Ok(GenerationOutcome {
            job_id: job.id,
            record,
            credits_remaining: account.credits_remaining,
        })
    }

    /// Downloads the provider's result into object storage and checkpoints
    /// its path. Failures here happen before any debit.
    async fn store_result(
        &self,
        job: &mut GenerationJob,
        sample_url: &str,
    ) -> Result<String, GenerationError> {
        let bytes = match self.provider.fetch_result(sample_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Result download failed");
                job.fail(e.to_string())?;
                self.discard(job).await;
                return Err(provider_failure(e));
            }
        };

        let result_path = format!("{}/results/{}.png", job.user_id, job.id);
        if let Err(e) = self.storage.upload(&result_path, bytes, RESULT_CONTENT_TYPE).await {
            tracing::error!(job_id = %job.id, error = %e, "Result upload failed");
            job.fail(e.to_string())?;
            self.discard(job).await;
            return Err(e.into());
        }

        job.mark_result_stored(&result_path)?;
        self.checkpoint(job).await?;
        Ok(result_path)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Restart recovery
    // ════════════════════════════════════════════════════════════════════════════

    /// Claims every checkpointed job whose lease has lapsed and resumes each
    /// in its own task. Jobs still leased by a live worker are left alone.
    pub async fn resume_in_flight(
        self: &Arc<Self>,
    ) -> Result<Vec<JoinHandle<Result<GenerationOutcome, GenerationError>>>, GenerationError> {
        let jobs = self.checkpoints.claim_unfinished().await?;
        if !jobs.is_empty() {
            tracing::info!(count = jobs.len(), "Resuming checkpointed generation jobs");
        }

        Ok(jobs
            .into_iter()
            .map(|job| {
                let orchestrator = Arc::clone(self);
                tokio::spawn(async move {
                    let job_id = job.id;
                    let result = orchestrator.drive(job).await;
                    if let Err(e) = &result {
                        tracing::warn!(job_id = %job_id, error = %e, "Resumed job did not complete");
                    }
                    result
                })
            })
            .collect())
    }

    /// Saves the job. Losing the lease stops the job; other failures are
    /// logged and the job carries on.
    async fn checkpoint(&self, job: &GenerationJob) -> Result<(), GenerationError> {
        match self.checkpoints.save(job).await {
            Ok(()) => Ok(()),
            Err(e) if e.code == ErrorCode::JobClaimed => {
                tracing::warn!(job_id = %job.id, error = %e, "Job taken over by another worker");
                Err(GenerationError::StoreUnavailable(e.message))
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Failed to checkpoint job");
                Ok(())
            }
        }
    }

    async fn discard(&self, job: &GenerationJob) {
        if let Err(e) = self.checkpoints.delete(&job.id).await {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to delete job checkpoint");
        }
    }

    async fn remove_artifact(&self, path: &str) {
        if let Err(e) = self.storage.remove(&[path.to_string()]).await {
            tracing::warn!(path, error = %e, "Failed to remove orphaned artifact");
        }
    }
}

fn provider_failure(err: ProviderError) -> GenerationError {
    GenerationError::ProviderFailed(err.to_string())
}
