//! Object storage configuration (Supabase)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;
use crate::adapters::supabase::SupabaseStorageConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub supabase_url: String,

    #[serde(default)]
    pub service_role_key: Option<SecretString>,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Lifetime of signed download URLs.
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            service_role_key: None,
            bucket: default_bucket(),
            signed_url_ttl_secs: default_signed_url_ttl(),
        }
    }
}

impl StorageConfig {
    pub fn supabase_config(&self) -> Result<SupabaseStorageConfig, ValidationError> {
        let key = self
            .service_role_key
            .as_ref()
            .ok_or(ValidationError::MissingRequired("STORAGE__SERVICE_ROLE_KEY"))?;
        Ok(SupabaseStorageConfig::new(
            &self.supabase_url,
            key.expose_secret().as_str(),
            &self.bucket,
        ))
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.supabase_url.is_empty() {
            return Err(ValidationError::MissingRequired("STORAGE__SUPABASE_URL"));
        }
        if self.service_role_key.is_none() {
            return Err(ValidationError::MissingRequired("STORAGE__SERVICE_ROLE_KEY"));
        }
        if self.bucket.is_empty() {
            return Err(ValidationError::MissingRequired("STORAGE__BUCKET"));
        }
        if *environment == Environment::Production && !self.supabase_url.starts_with("https://") {
            return Err(ValidationError::MustBeHttps("STORAGE__SUPABASE_URL"));
        }
        Ok(())
    }
}

fn default_bucket() -> String {
    "images".to_string()
}

fn default_signed_url_ttl() -> u64 {
    7200
}
