//! Domain layer containing business rules and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, state machines)
//! - `billing` - Plan catalog, subscription status, accounts and credit policy
//! - `generation` - Gallery records and the transformation job lifecycle
//! - `webhooks` - Payment and identity webhook authenticity checks

pub mod billing;
pub mod foundation;
pub mod generation;
pub mod webhooks;
