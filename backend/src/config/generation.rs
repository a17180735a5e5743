//! Image transformation provider configuration (Flux)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::flux::FluxConfig;
use crate::domain::generation::PollingPolicy;
use crate::ports::MAX_LEASE_SECS;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Model path appended to the base URL.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_submit_timeout")]
    pub submit_timeout_secs: u64,

    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// How long a worker owns a job after its last checkpoint. Also the
    /// interval of the recovery sweep.
    #[serde(default = "default_checkpoint_lease")]
    pub checkpoint_lease_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            submit_timeout_secs: default_submit_timeout(),
            poll_timeout_secs: default_poll_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            checkpoint_lease_secs: default_checkpoint_lease(),
        }
    }
}

impl GenerationConfig {
    pub fn polling_policy(&self) -> PollingPolicy {
        PollingPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_attempts,
        }
    }

    pub fn flux_config(&self) -> Result<FluxConfig, ValidationError> {
        let key = self
            .api_key
            .as_ref()
            .ok_or(ValidationError::MissingRequired("GENERATION__API_KEY"))?;
        Ok(FluxConfig::new(key.expose_secret().as_str())
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .with_timeouts(
                Duration::from_secs(self.submit_timeout_secs),
                Duration::from_secs(self.poll_timeout_secs),
                Duration::from_secs(self.fetch_timeout_secs),
            ))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_none() {
            return Err(ValidationError::MissingRequired("GENERATION__API_KEY"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidPollingPolicy("poll interval must be positive"));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidPollingPolicy("max attempts must be positive"));
        }
        // A lease must outlive the slowest single step between checkpoints.
        let slowest_step = self
            .submit_timeout_secs
            .max(self.poll_timeout_secs + self.poll_interval_ms / 1000 + 1)
            .max(self.fetch_timeout_secs);
        if self.checkpoint_lease_secs <= slowest_step || self.checkpoint_lease_secs > MAX_LEASE_SECS {
            return Err(ValidationError::InvalidPollingPolicy(
                "checkpoint lease must exceed every provider timeout and be at most a day",
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://api.bfl.ai/v1".to_string()
}

fn default_model() -> String {
    "flux-kontext-pro".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_attempts() -> u32 {
    180
}

fn default_submit_timeout() -> u64 {
    30
}

fn default_poll_timeout() -> u64 {
    10
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_checkpoint_lease() -> u64 {
    120
}
