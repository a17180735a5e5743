//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Ledger, idempotency, gallery and checkpoint stores (sqlx)
//! - `memory` - In-process stores for tests and local development
//! - `stripe` - Payment gateway
//! - `clerk` - Identity webhook verification
//! - `flux` - AI image transformation provider
//! - `supabase` - Object storage
//! - `http` - axum routes

pub mod clerk;
pub mod flux;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
pub mod supabase;
