//! In-memory adapters for tests and local development.
//!
//! Each adapter keeps its state behind `Arc<RwLock<_>>` so clones share
//! data, mirroring a shared database.

mod generation_repository;
mod job_checkpoint_store;
mod ledger_store;
mod object_storage;
mod subscription_event_store;

pub use generation_repository::InMemoryGenerationRepository;
pub use job_checkpoint_store::InMemoryJobCheckpointStore;
pub use ledger_store::InMemoryLedgerStore;
pub use object_storage::InMemoryObjectStorage;
pub use subscription_event_store::InMemorySubscriptionEventStore;
