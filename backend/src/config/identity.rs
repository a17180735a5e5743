//! Identity provider configuration (Clerk)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;
use crate::adapters::http::SessionAuth;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Webhook signing secret, `whsec_<base64>`.
    #[serde(default)]
    pub webhook_secret: Option<SecretString>,

    /// PEM public key for session tokens. Without it, requests are
    /// authenticated by the `X-User-Id` header, which is development only.
    #[serde(default)]
    pub jwt_public_key_pem: Option<String>,

    /// Expected `iss` claim of session tokens.
    #[serde(default)]
    pub jwt_issuer: Option<String>,
}

impl IdentityConfig {
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Session authentication mode for the API router.
    pub fn session_auth(&self) -> Result<SessionAuth, ValidationError> {
        match &self.jwt_public_key_pem {
            Some(pem) => SessionAuth::from_rsa_pem(pem, self.jwt_issuer.as_deref())
                .map_err(|_| ValidationError::InvalidSessionKey),
            None => Ok(SessionAuth::dev_header()),
        }
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let secret = self
            .webhook_secret()
            .ok_or(ValidationError::MissingRequired("IDENTITY__WEBHOOK_SECRET"))?;
        if !secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidIdentityWebhookSecret);
        }
        if *environment == Environment::Production && self.jwt_public_key_pem.is_none() {
            return Err(ValidationError::SessionKeyRequired);
        }
        Ok(())
    }
}
