//! Idempotency record for inbound webhook deliveries.
//!
//! One row per external event id. A row starts as `Processing` when a worker
//! claims the event and is finalized exactly once as `Applied` or `Failed`.
//! Finalized rows are never modified.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, ValidationError};

/// Which provider delivered the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Payment,
    Identity,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Payment => "payment",
            EventSource::Identity => "identity",
        }
    }
}

impl FromStr for EventSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(EventSource::Payment),
            "identity" => Ok(EventSource::Identity),
            other => Err(ValidationError::invalid_format(
                "source",
                format!("unknown event source '{}'", other),
            )),
        }
    }
}

/// Processing outcome of a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// Claimed by a worker, not yet finalized.
    Processing,
    Applied,
    /// Reported for replays; never persisted as a second row.
    DuplicateSkipped,
    Failed,
}

impl EventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Processing => "processing",
            EventOutcome::Applied => "applied",
            EventOutcome::DuplicateSkipped => "duplicate_skipped",
            EventOutcome::Failed => "failed",
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, EventOutcome::Processing)
    }
}

impl fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventOutcome {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(EventOutcome::Processing),
            "applied" => Ok(EventOutcome::Applied),
            "duplicate_skipped" => Ok(EventOutcome::DuplicateSkipped),
            "failed" => Ok(EventOutcome::Failed),
            other => Err(ValidationError::invalid_format(
                "outcome",
                format!("unknown outcome '{}'", other),
            )),
        }
    }
}

/// Persisted idempotency record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub event_id: String,
    pub source: EventSource,
    pub event_type: String,
    pub started_at: Timestamp,
    pub processed_at: Option<Timestamp>,
    pub outcome: EventOutcome,
    pub error: Option<String>,
}

impl SubscriptionEvent {
    /// New claim for an event that is about to be processed.
    pub fn claim(event_id: impl Into<String>, source: EventSource, event_type: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            source,
            event_type: event_type.into(),
            started_at: Timestamp::now(),
            processed_at: None,
            outcome: EventOutcome::Processing,
            error: None,
        }
    }

    /// True when a processing claim is older than `lease_secs`.
    pub fn is_stale(&self, now: Timestamp, lease_secs: i64) -> bool {
        !self.outcome.is_final() && now.duration_since(&self.started_at).num_seconds() >= lease_secs
    }
}
