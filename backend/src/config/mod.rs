//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables carry the `STAGE_AI` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use stage_ai::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod generation;
mod identity;
mod payment;
mod server;
mod storage;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use generation::GenerationConfig;
pub use identity::IdentityConfig;
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};
pub use storage::StorageConfig;

use serde::Deserialize;

use crate::domain::billing::CreditPolicy;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection and retention
    pub database: DatabaseConfig,

    /// Stripe keys and price ids
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Clerk webhook secret and session token key
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Supabase storage bucket
    #[serde(default)]
    pub storage: StorageConfig,

    /// Flux provider and polling budget
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Credit grants, plan limits and cancellation behavior
    #[serde(default)]
    pub billing: CreditPolicy,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `STAGE_AI` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `STAGE_AI__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `STAGE_AI__BILLING__SIGNUP_CREDITS=3` -> `billing.signup_credits = 3`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("STAGE_AI")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let environment = &self.server.environment;
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.identity.validate(environment)?;
        self.storage.validate(environment)?;
        self.generation.validate()?;
        validate_credit_policy(&self.billing)?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

fn validate_credit_policy(policy: &CreditPolicy) -> Result<(), ValidationError> {
    if policy.signup_credits > policy.free_max_generations {
        return Err(ValidationError::InvalidCreditPolicy(
            "signup credits exceed the free plan maximum",
        ));
    }
    Ok(())
}
