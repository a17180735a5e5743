//! Application layer - services and handlers.
//!
//! `services` holds the stateful coordinators (idempotency guard, credit
//! ledger engine, job orchestrator). `handlers` holds one command or query
//! handler per endpoint, built on those services.

pub mod handlers;
pub mod services;

pub use handlers::*;
pub use services::{
    AccountUpsert, Activation, BeginOutcome, CreditLedgerEngine, GenerationOutcome,
    IdempotencyGuard, JobOrchestrator,
};
