//! JobCheckpointStore port - durable, leased state of in-flight generation jobs.
//!
//! Each store handle acts for one worker. Saving a checkpoint renews that
//! worker's lease on the job; a job whose lease has lapsed belongs to whoever
//! claims it next. At most one live worker drives a job at a time.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, JobId};
use crate::domain::generation::GenerationJob;

/// Lease granted by each save or claim, unless configured otherwise.
pub const DEFAULT_LEASE_SECS: u64 = 120;

/// Longest lease a store will grant.
pub const MAX_LEASE_SECS: u64 = 24 * 60 * 60;

#[async_trait]
pub trait JobCheckpointStore: Send + Sync {
    /// Inserts or replaces the checkpoint for `job.id` and renews this
    /// worker's lease.
    ///
    /// Fails with `JobClaimed` when another worker holds a live lease.
    async fn save(&self, job: &GenerationJob) -> Result<(), DomainError>;

    /// Takes over every unfinished job whose lease has expired, oldest first.
    async fn claim_unfinished(&self) -> Result<Vec<GenerationJob>, DomainError>;

    async fn delete(&self, job_id: &JobId) -> Result<(), DomainError>;
}
