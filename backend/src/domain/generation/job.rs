//! Generation job state machine.
//!
//! One job drives one external transformation:
//!
//! ```text
//! Submitted -> Polling{attempt} -> Completing{sample_url, result_path} -> Succeeded
//!                   │                      │
//!                   └─ Failed | TimedOut   └─ Failed
//! ```
//!
//! The job is checkpointed before every sleep and before completion so a
//! restarted process can pick up where it left off. Terminal states are never
//! left.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::{
    GenerationId, JobId, StateMachine, Timestamp, UserId, ValidationError,
};

use super::GenerationRequest;

/// Poll cadence and ceiling for a provider job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_attempts: 180,
        }
    }
}

impl PollingPolicy {
    /// Upper bound on time spent sleeping between polls.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Opaque reference to the provider-side request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHandle {
    pub request_id: String,
    pub polling_url: String,
}

/// Data-free view of `JobState`, used for transition checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    Submitted,
    Polling,
    Completing,
    Succeeded,
    Failed,
    TimedOut,
}

impl StateMachine for JobPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use JobPhase::*;
        match self {
            Submitted | Polling => vec![Polling, Completing, Failed, TimedOut],
            Completing => vec![Succeeded, Failed],
            Succeeded | Failed | TimedOut => vec![],
        }
    }
}

/// Job state with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Polling { attempt: u32 },
    /// The provider reported success; the result is being stored and paid for.
    /// `result_path` is set once the artifact is in object storage.
    Completing {
        sample_url: String,
        result_path: Option<String>,
    },
    Succeeded { result_url: String },
    Failed { reason: String },
    TimedOut { attempts: u32 },
}

impl JobState {
    pub fn phase(&self) -> JobPhase {
        match self {
            JobState::Submitted => JobPhase::Submitted,
            JobState::Polling { .. } => JobPhase::Polling,
            JobState::Completing { .. } => JobPhase::Completing,
            JobState::Succeeded { .. } => JobPhase::Succeeded,
            JobState::Failed { .. } => JobPhase::Failed,
            JobState::TimedOut { .. } => JobPhase::TimedOut,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }
}

/// One in-flight (or finished) transformation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: JobId,
    pub user_id: UserId,
    pub prompt: String,
    pub source_ref: String,
    pub parent_id: Option<GenerationId>,
    pub handle: ProviderHandle,
    pub state: JobState,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GenerationJob {
    /// A freshly submitted job.
    pub fn submitted(id: JobId, request: GenerationRequest, handle: ProviderHandle) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            user_id: request.user_id,
            prompt: request.prompt,
            source_ref: request.source_ref,
            parent_id: request.parent_id,
            handle,
            state: JobState::Submitted,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of polls already made.
    pub fn attempts_made(&self) -> u32 {
        match self.state {
            JobState::Polling { attempt } => attempt,
            JobState::TimedOut { attempts } => attempts,
            _ => 0,
        }
    }

    /// Records that poll number `attempt` (1-based) is about to run.
    pub fn begin_attempt(&mut self, attempt: u32) -> Result<(), ValidationError> {
        self.transition(JobState::Polling { attempt })
    }

    /// Records the provider's result URL before the result is stored.
    pub fn begin_completion(&mut self, sample_url: impl Into<String>) -> Result<(), ValidationError> {
        self.transition(JobState::Completing {
            sample_url: sample_url.into(),
            result_path: None,
        })
    }

    /// Records where the artifact was stored. Only valid while completing.
    pub fn mark_result_stored(&mut self, path: impl Into<String>) -> Result<(), ValidationError> {
        match &mut self.state {
            JobState::Completing { result_path, .. } => {
                *result_path = Some(path.into());
                self.updated_at = Timestamp::now();
                Ok(())
            }
            _ => Err(ValidationError::invalid_format(
                "state",
                "result can only be stored while completing",
            )),
        }
    }

    /// The provider's result URL once polling has finished.
    pub fn sample_url(&self) -> Option<&str> {
        match &self.state {
            JobState::Completing { sample_url, .. } => Some(sample_url),
            _ => None,
        }
    }

    /// Storage path of the artifact, once uploaded.
    pub fn stored_result(&self) -> Option<&str> {
        match &self.state {
            JobState::Completing { result_path, .. } => result_path.as_deref(),
            _ => None,
        }
    }

    /// The gallery record this job produces. Derived from the job id so a
    /// repeated completion targets the same record.
    pub fn generation_id(&self) -> GenerationId {
        GenerationId::from_uuid(*self.id.as_uuid())
    }

    pub fn succeed(&mut self, result_url: impl Into<String>) -> Result<(), ValidationError> {
        self.transition(JobState::Succeeded {
            result_url: result_url.into(),
        })
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), ValidationError> {
        self.transition(JobState::Failed {
            reason: reason.into(),
        })
    }

    pub fn time_out(&mut self) -> Result<(), ValidationError> {
        let attempts = self.attempts_made();
        self.transition(JobState::TimedOut { attempts })
    }

    fn transition(&mut self, next: JobState) -> Result<(), ValidationError> {
        self.state.phase().transition_to(next.phase())?;
        self.state = next;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> GenerationJob {
        let request = GenerationRequest::new(
            UserId::new("user_1").unwrap(),
            "stage the living room",
            "user_1/room.jpg",
            None,
        )
        .unwrap();
        GenerationJob::submitted(
            JobId::new(),
            request,
            ProviderHandle {
                request_id: "req_1".to_string(),
                polling_url: "https://provider/poll/req_1".to_string(),
            },
        )
    }

    // ══════════════════════════════════════════════════════════════
    // Polling policy
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn default_policy_ceiling_is_ninety_seconds() {
        let policy = PollingPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert_eq!(policy.max_attempts, 180);
        assert_eq!(policy.ceiling(), Duration::from_secs(90));
    }

    // ══════════════════════════════════════════════════════════════
    // Transitions
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn submitted_job_starts_with_zero_attempts() {
        let job = job();
        assert_eq!(job.state, JobState::Submitted);
        assert_eq!(job.attempts_made(), 0);
    }

    #[test]
    fn polling_counts_attempts() {
        let mut job = job();
        job.begin_attempt(1).unwrap();
        job.begin_attempt(2).unwrap();
        assert_eq!(job.attempts_made(), 2);
    }

    #[test]
    fn time_out_keeps_attempt_count() {
        let mut job = job();
        job.begin_attempt(180).unwrap();
        job.time_out().unwrap();
        assert_eq!(job.state, JobState::TimedOut { attempts: 180 });
    }

    #[test]
    fn success_requires_completion_first() {
        let mut job = job();
        assert!(job.succeed("user_1/results/x.png").is_err());

        job.begin_attempt(1).unwrap();
        job.begin_completion("https://cdn/sample.png").unwrap();
        assert_eq!(job.sample_url(), Some("https://cdn/sample.png"));
        assert!(job.begin_attempt(2).is_err());
        job.succeed("user_1/results/x.png").unwrap();
        assert_eq!(job.sample_url(), None);
    }

    #[test]
    fn stored_result_survives_serialization() {
        let mut job = job();
        assert!(job.mark_result_stored("user_1/results/x.png").is_err());

        job.begin_completion("https://cdn/sample.png").unwrap();
        assert_eq!(job.stored_result(), None);
        job.mark_result_stored("user_1/results/x.png").unwrap();

        let json = serde_json::to_string(&job).unwrap();
        let restored: GenerationJob = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.stored_result(), Some("user_1/results/x.png"));
        assert_eq!(restored.sample_url(), Some("https://cdn/sample.png"));
    }

    #[test]
    fn generation_id_follows_job_id() {
        let job = job();
        assert_eq!(job.generation_id().as_uuid(), job.id.as_uuid());
    }

    #[test]
    fn terminal_states_cannot_be_left() {
        let mut job = job();
        job.begin_completion("https://cdn/sample.png").unwrap();
        job.succeed("https://cdn/result.png").unwrap();
        assert!(job.state.is_terminal());
        assert!(job.begin_attempt(1).is_err());
        assert!(job.fail("late error").is_err());
    }

    #[test]
    fn failed_job_is_terminal() {
        let mut job = job();
        job.begin_attempt(1).unwrap();
        job.fail("Error").unwrap();
        assert_eq!(job.state.phase(), JobPhase::Failed);
        assert!(job.time_out().is_err());
    }

    #[test]
    fn state_serializes_with_tag() {
        let json = serde_json::to_value(JobState::Polling { attempt: 3 }).unwrap();
        assert_eq!(json["state"], "polling");
        assert_eq!(json["attempt"], 3);
    }
}
