//! PostgreSQL implementation of SubscriptionEventStore.
//!
//! The primary key on `event_id` arbitrates claims: `INSERT ... ON CONFLICT DO
//! NOTHING` succeeds for exactly one concurrent caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{EventOutcome, EventSource, SubscriptionEvent};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{ClaimResult, SubscriptionEventStore};

pub struct PostgresSubscriptionEventStore {
    pool: PgPool,
}

impl PostgresSubscriptionEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    event_id: String,
    source: String,
    event_type: String,
    started_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    outcome: String,
    error: Option<String>,
}

impl TryFrom<EventRow> for SubscriptionEvent {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::domain::foundation::ValidationError| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid event row: {}", e))
        };
        Ok(SubscriptionEvent {
            event_id: row.event_id,
            source: row.source.parse::<EventSource>().map_err(corrupt)?,
            event_type: row.event_type,
            started_at: Timestamp::from_datetime(row.started_at),
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            outcome: row.outcome.parse::<EventOutcome>().map_err(corrupt)?,
            error: row.error,
        })
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl SubscriptionEventStore for PostgresSubscriptionEventStore {
    async fn try_claim(
        &self,
        claim: SubscriptionEvent,
        lease_secs: i64,
    ) -> Result<ClaimResult, DomainError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO subscription_events (event_id, source, event_type, started_at, outcome)
            VALUES ($1, $2, $3, $4, 'processing')
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&claim.event_id)
        .bind(claim.source.as_str())
        .bind(&claim.event_type)
        .bind(claim.started_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("claim event", e))?;

        if inserted.rows_affected() == 1 {
            return Ok(ClaimResult::Claimed);
        }

        let taken_over = sqlx::query(
            r#"
            UPDATE subscription_events SET started_at = $2
            WHERE event_id = $1
              AND outcome = 'processing'
              AND started_at <= $2 - make_interval(secs => $3)
            "#,
        )
        .bind(&claim.event_id)
        .bind(claim.started_at.as_datetime())
        .bind(lease_secs as f64)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("take over event", e))?;

        if taken_over.rows_affected() == 1 {
            return Ok(ClaimResult::TakenOver);
        }

        match self.find(&claim.event_id).await? {
            Some(existing) if existing.outcome.is_final() => Ok(ClaimResult::AlreadyFinalized(existing)),
            _ => Ok(ClaimResult::InFlight),
        }
    }

    async fn find(&self, event_id: &str) -> Result<Option<SubscriptionEvent>, DomainError> {
        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT event_id, source, event_type, started_at, processed_at, outcome, error
            FROM subscription_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch event", e))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn finalize(
        &self,
        event_id: &str,
        outcome: EventOutcome,
        error: Option<String>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscription_events
            SET outcome = $2, error = $3, processed_at = NOW()
            WHERE event_id = $1 AND outcome = 'processing'
            "#,
        )
        .bind(event_id)
        .bind(outcome.as_str())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("finalize event", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, event_id: &str) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM subscription_events WHERE event_id = $1 AND outcome = 'processing'")
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("release event", e))?;
        Ok(())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "DELETE FROM subscription_events WHERE outcome <> 'processing' AND started_at < $1",
        )
        .bind(cutoff.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("delete old events", e))?;

        Ok(result.rows_affected())
    }
}
