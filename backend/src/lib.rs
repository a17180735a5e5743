//! StageAI - AI virtual staging backend
//!
//! This crate keeps the per-user credit ledger, reconciles billing and
//! identity webhooks into it, and orchestrates image transformation jobs
//! against an external provider.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
