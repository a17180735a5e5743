//! Generation domain - gallery records and the transformation job lifecycle.

mod errors;
mod job;
mod record;

pub use errors::GenerationError;
pub use job::{GenerationJob, JobPhase, JobState, PollingPolicy, ProviderHandle};
pub use record::{validate_object_path, GenerationRecord, GenerationRequest, MAX_PROMPT_CHARS};
