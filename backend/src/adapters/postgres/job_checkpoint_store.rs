//! PostgreSQL implementation of JobCheckpointStore.
//!
//! The whole job is stored as JSONB; `terminal` is denormalized so the claim
//! query can use a partial index. Lease checks compare against the database
//! clock so workers never disagree about expiry.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, JobId};
use crate::domain::generation::GenerationJob;
use crate::ports::{JobCheckpointStore, DEFAULT_LEASE_SECS, MAX_LEASE_SECS};

pub struct PostgresJobCheckpointStore {
    pool: PgPool,
    worker_id: String,
    lease_secs: f64,
}

impl PostgresJobCheckpointStore {
    /// A store acting for a fresh, randomly named worker.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            worker_id: Uuid::new_v4().to_string(),
            lease_secs: DEFAULT_LEASE_SECS as f64,
        }
    }

    pub fn with_lease(mut self, worker_id: impl Into<String>, lease_secs: u64) -> Self {
        self.worker_id = worker_id.into();
        self.lease_secs = lease_secs.min(MAX_LEASE_SECS) as f64;
        self
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl JobCheckpointStore for PostgresJobCheckpointStore {
    async fn save(&self, job: &GenerationJob) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO generation_jobs (
                id, user_id, job, terminal, claimed_by, lease_expires_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, NOW() + make_interval(secs => $6), $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                job = EXCLUDED.job,
                terminal = EXCLUDED.terminal,
                claimed_by = EXCLUDED.claimed_by,
                lease_expires_at = EXCLUDED.lease_expires_at,
                updated_at = EXCLUDED.updated_at
            WHERE generation_jobs.claimed_by = EXCLUDED.claimed_by
               OR generation_jobs.lease_expires_at <= NOW()
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.user_id.as_str())
        .bind(Json(job))
        .bind(job.state.is_terminal())
        .bind(&self.worker_id)
        .bind(self.lease_secs)
        .bind(job.created_at.as_datetime())
        .bind(job.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("checkpoint job", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::JobClaimed,
                format!("Job {} is leased by another worker", job.id),
            ));
        }
        Ok(())
    }

    async fn claim_unfinished(&self) -> Result<Vec<GenerationJob>, DomainError> {
        let rows: Vec<(Json<GenerationJob>,)> = sqlx::query_as(
            r#"
            UPDATE generation_jobs SET
                claimed_by = $1,
                lease_expires_at = NOW() + make_interval(secs => $2)
            WHERE terminal = FALSE AND lease_expires_at <= NOW()
            RETURNING job
            "#,
        )
        .bind(&self.worker_id)
        .bind(self.lease_secs)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("claim unfinished jobs", e))?;

        let mut jobs: Vec<GenerationJob> = rows.into_iter().map(|(Json(job),)| job).collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }

    async fn delete(&self, job_id: &JobId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM generation_jobs WHERE id = $1")
            .bind(job_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete job checkpoint", e))?;
        Ok(())
    }
}
