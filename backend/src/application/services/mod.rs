//! Application services shared by the command handlers.

mod idempotency_guard;
mod job_orchestrator;
mod ledger_engine;

pub use idempotency_guard::{BeginOutcome, IdempotencyGuard, DEFAULT_LEASE_SECS};
pub use job_orchestrator::{GenerationOutcome, JobOrchestrator};
pub use ledger_engine::{AccountUpsert, Activation, CreditLedgerEngine};
