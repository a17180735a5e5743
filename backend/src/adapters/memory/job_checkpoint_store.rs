//! In-memory JobCheckpointStore.
//!
//! Handles made with `for_worker` share one map, which is how tests model
//! several workers against the same database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, JobId, Timestamp};
use crate::domain::generation::GenerationJob;
use crate::ports::{JobCheckpointStore, DEFAULT_LEASE_SECS, MAX_LEASE_SECS};

#[derive(Debug, Clone)]
struct LeasedJob {
    job: GenerationJob,
    owner: String,
    lease_expires_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct InMemoryJobCheckpointStore {
    jobs: Arc<RwLock<HashMap<JobId, LeasedJob>>>,
    owner: String,
    lease_secs: i64,
}

impl Default for InMemoryJobCheckpointStore {
    fn default() -> Self {
        Self {
            jobs: Arc::default(),
            owner: Uuid::new_v4().to_string(),
            lease_secs: DEFAULT_LEASE_SECS as i64,
        }
    }
}

impl InMemoryJobCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle onto the same checkpoints acting as another worker.
    pub fn for_worker(&self, owner: impl Into<String>) -> Self {
        Self {
            jobs: Arc::clone(&self.jobs),
            owner: owner.into(),
            lease_secs: self.lease_secs,
        }
    }

    pub fn with_lease_secs(mut self, secs: u64) -> Self {
        self.lease_secs = secs.min(MAX_LEASE_SECS) as i64;
        self
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn get(&self, id: &JobId) -> Option<GenerationJob> {
        self.jobs.read().await.get(id).map(|leased| leased.job.clone())
    }

    pub async fn owner_of(&self, id: &JobId) -> Option<String> {
        self.jobs.read().await.get(id).map(|leased| leased.owner.clone())
    }
}

#[async_trait]
impl JobCheckpointStore for InMemoryJobCheckpointStore {
    async fn save(&self, job: &GenerationJob) -> Result<(), DomainError> {
        let now = Timestamp::now();
        let mut jobs = self.jobs.write().await;
        if let Some(existing) = jobs.get(&job.id) {
            if existing.owner != self.owner && existing.lease_expires_at.is_after(&now) {
                return Err(DomainError::new(
                    ErrorCode::JobClaimed,
                    format!("Job {} is leased by {}", job.id, existing.owner),
                ));
            }
        }
        jobs.insert(
            job.id,
            LeasedJob {
                job: job.clone(),
                owner: self.owner.clone(),
                lease_expires_at: now.plus_secs(self.lease_secs),
            },
        );
        Ok(())
    }

    async fn claim_unfinished(&self) -> Result<Vec<GenerationJob>, DomainError> {
        let now = Timestamp::now();
        let mut jobs = self.jobs.write().await;
        let mut claimed: Vec<GenerationJob> = jobs
            .values_mut()
            .filter(|leased| !leased.job.state.is_terminal() && !leased.lease_expires_at.is_after(&now))
            .map(|leased| {
                leased.owner = self.owner.clone();
                leased.lease_expires_at = now.plus_secs(self.lease_secs);
                leased.job.clone()
            })
            .collect();
        claimed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(claimed)
    }

    async fn delete(&self, job_id: &JobId) -> Result<(), DomainError> {
        self.jobs.write().await.remove(job_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::generation::{GenerationRequest, ProviderHandle};

    fn job() -> GenerationJob {
        let request = GenerationRequest::new(
            UserId::new("user_1").unwrap(),
            "paint the walls blue",
            "user_1/room.png",
            None,
        )
        .unwrap();
        GenerationJob::submitted(
            JobId::new(),
            request,
            ProviderHandle {
                request_id: "req_1".to_string(),
                polling_url: "https://provider.test/poll/req_1".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn save_overwrites_previous_checkpoint() {
        let store = InMemoryJobCheckpointStore::new();
        let mut j = job();
        store.save(&j).await.unwrap();

        j.begin_attempt(3).unwrap();
        store.save(&j).await.unwrap();

        assert_eq!(store.job_count().await, 1);
        assert_eq!(store.get(&j.id).await.unwrap().attempts_made(), 3);
    }

    #[tokio::test]
    async fn live_lease_blocks_other_workers() {
        let a = InMemoryJobCheckpointStore::new().for_worker("a");
        let b = a.for_worker("b");
        let j = job();
        a.save(&j).await.unwrap();

        let err = b.save(&j).await.unwrap_err();
        let claimed = b.claim_unfinished().await.unwrap();

        assert_eq!(err.code, ErrorCode::JobClaimed);
        assert!(claimed.is_empty());
        assert_eq!(a.owner_of(&j.id).await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn expired_lease_is_claimed_once() {
        let crashed = InMemoryJobCheckpointStore::new().for_worker("crashed").with_lease_secs(0);
        let b = crashed.for_worker("b").with_lease_secs(60);
        let c = crashed.for_worker("c").with_lease_secs(60);
        let j = job();
        crashed.save(&j).await.unwrap();

        let by_b = b.claim_unfinished().await.unwrap();
        let by_c = c.claim_unfinished().await.unwrap();

        assert_eq!(by_b.len(), 1);
        assert_eq!(by_b[0].id, j.id);
        assert!(by_c.is_empty());
        assert_eq!(b.owner_of(&j.id).await.as_deref(), Some("b"));
        assert_eq!(crashed.save(&j).await.unwrap_err().code, ErrorCode::JobClaimed);
    }

    #[tokio::test]
    async fn claim_skips_terminal_jobs() {
        let crashed = InMemoryJobCheckpointStore::new().with_lease_secs(0);
        let b = crashed.for_worker("b");
        let live = job();
        let mut done = job();
        done.fail("content policy").unwrap();
        crashed.save(&live).await.unwrap();
        crashed.save(&done).await.unwrap();

        let claimed = b.claim_unfinished().await.unwrap();

        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, live.id);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryJobCheckpointStore::new();
        let j = job();
        store.save(&j).await.unwrap();

        store.delete(&j.id).await.unwrap();
        store.delete(&j.id).await.unwrap();

        assert_eq!(store.job_count().await, 0);
    }
}
