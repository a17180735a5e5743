//! PostgreSQL adapters - Database implementations for persistence ports.
//!
//! - `PostgresLedgerStore` - Account rows with atomic billing updates
//! - `PostgresSubscriptionEventStore` - Webhook idempotency records
//! - `PostgresGenerationRepository` - Gallery records
//! - `PostgresJobCheckpointStore` - In-flight job checkpoints

mod generation_repository;
mod job_checkpoint_store;
mod ledger_store;
mod subscription_event_store;

pub use generation_repository::PostgresGenerationRepository;
pub use job_checkpoint_store::PostgresJobCheckpointStore;
pub use ledger_store::PostgresLedgerStore;
pub use subscription_event_store::PostgresSubscriptionEventStore;
