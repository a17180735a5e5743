//! Payment configuration (Stripe)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::stripe::{PlanPrices, StripeConfig};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key (`sk_...`)
    #[serde(default)]
    pub stripe_api_key: Option<SecretString>,

    /// Stripe webhook signing secret (`whsec_...`)
    #[serde(default)]
    pub stripe_webhook_secret: Option<SecretString>,

    #[serde(default)]
    pub price_pro_individual: Option<String>,

    #[serde(default)]
    pub price_pro_agency: Option<String>,

    #[serde(default)]
    pub price_custom: Option<String>,

    #[serde(default)]
    pub success_url: Option<String>,

    #[serde(default)]
    pub cancel_url: Option<String>,

    /// Reject events sent in test mode.
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.api_key().is_some_and(|k| k.starts_with("sk_test_"))
    }

    pub fn is_live_mode(&self) -> bool {
        self.api_key().is_some_and(|k| k.starts_with("sk_live_"))
    }

    fn api_key(&self) -> Option<&str> {
        self.stripe_api_key.as_ref().map(|k| k.expose_secret().as_str())
    }

    fn webhook_secret(&self) -> Option<&str> {
        self.stripe_webhook_secret
            .as_ref()
            .map(|k| k.expose_secret().as_str())
    }

    /// Builds the gateway configuration. Call after `validate`.
    pub fn stripe_config(&self) -> Result<StripeConfig, ValidationError> {
        let api_key = self
            .api_key()
            .ok_or(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"))?;
        let webhook_secret = self
            .webhook_secret()
            .ok_or(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"))?;

        let mut config = StripeConfig::new(api_key, webhook_secret)
            .with_prices(PlanPrices {
                pro_individual: self.price_pro_individual.clone(),
                pro_agency: self.price_pro_agency.clone(),
                custom: self.price_custom.clone(),
            })
            .with_require_livemode(self.require_livemode);
        if let (Some(success), Some(cancel)) = (&self.success_url, &self.cancel_url) {
            config = config.with_redirect_urls(success, cancel);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self
            .api_key()
            .ok_or(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"))?;
        let webhook_secret = self
            .webhook_secret()
            .ok_or(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"))?;

        if !api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: &str, secret: &str) -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: Some(SecretString::new(api_key.to_string())),
            stripe_webhook_secret: Some(SecretString::new(secret.to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_mode_detection() {
        assert!(config("sk_test_xxx", "whsec_xxx").is_test_mode());
        assert!(config("sk_live_xxx", "whsec_xxx").is_live_mode());
        assert!(!PaymentConfig::default().is_live_mode());
    }

    #[test]
    fn test_validation_missing_api_key() {
        assert_eq!(
            PaymentConfig::default().validate(),
            Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"))
        );
    }

    #[test]
    fn test_validation_invalid_prefixes() {
        assert_eq!(
            config("pk_test_xxx", "whsec_xxx").validate(),
            Err(ValidationError::InvalidStripeKey)
        );
        assert_eq!(
            config("sk_test_xxx", "secret_xxx").validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_valid_config_builds_gateway_config() {
        let mut payment = config("sk_test_abcd1234", "whsec_xyz789");
        payment.price_pro_individual = Some("price_ind".to_string());

        assert!(payment.validate().is_ok());
        assert!(payment.stripe_config().is_ok());
    }
}
