//! Flux Kontext provider - implementation of ImageTransformProvider over the
//! BFL HTTP API.
//!
//! # Protocol
//!
//! - `POST {base_url}/{model}` with `x-key` header and `{prompt, input_image}`
//!   returns `{id, polling_url}`
//! - `GET {polling_url}` returns `{status, result: {sample}}` where status is
//!   `Ready`, `Error`, `Failed` or an in-progress label
//! - the `sample` URL is downloaded without authentication
//!
//! Each call carries its own timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::domain::generation::ProviderHandle;
use crate::ports::{ImageTransformProvider, ProviderError, ProviderStatus, TransformRequest};

/// Configuration for the Flux provider.
#[derive(Debug, Clone)]
pub struct FluxConfig {
    api_key: Secret<String>,
    /// API base URL (default: https://api.bfl.ai/v1).
    pub base_url: String,
    /// Model path appended to the base URL.
    pub model: String,
    pub submit_timeout: Duration,
    pub poll_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl FluxConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            base_url: "https://api.bfl.ai/v1".to_string(),
            model: "flux-kontext-pro".to_string(),
            submit_timeout: Duration::from_secs(30),
            poll_timeout: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeouts(mut self, submit: Duration, poll: Duration, fetch: Duration) -> Self {
        self.submit_timeout = submit;
        self.poll_timeout = poll;
        self.fetch_timeout = fetch;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

pub struct FluxProvider {
    config: FluxConfig,
    client: Client,
}

impl FluxProvider {
    pub fn new(config: FluxConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn submit_url(&self) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), self.config.model)
    }
}

#[derive(Debug, Serialize)]
struct FluxSubmitRequest<'a> {
    prompt: &'a str,
    input_image: &'a str,
}

#[derive(Debug, Deserialize)]
struct FluxSubmitResponse {
    id: String,
    polling_url: String,
}

#[derive(Debug, Deserialize)]
struct FluxPollResponse {
    status: String,
    #[serde(default)]
    result: Option<FluxResult>,
}

#[derive(Debug, Deserialize)]
struct FluxResult {
    #[serde(default)]
    sample: Option<String>,
}

fn map_send_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::network(err.to_string())
    }
}

async fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ProviderError::Rejected {
        status: status.as_u16(),
        message,
    })
}

impl FluxPollResponse {
    fn into_status(self) -> Result<ProviderStatus, ProviderError> {
        match self.status.as_str() {
            "Ready" => self
                .result
                .and_then(|r| r.sample)
                .map(|sample_url| ProviderStatus::Ready { sample_url })
                .ok_or_else(|| ProviderError::invalid_response("Ready status without result sample")),
            "Error" | "Failed" => Ok(ProviderStatus::Failed {
                reason: format!("provider reported {}", self.status),
            }),
            other => Ok(ProviderStatus::Pending(other.to_string())),
        }
    }
}

#[async_trait]
impl ImageTransformProvider for FluxProvider {
    async fn submit(&self, request: TransformRequest) -> Result<ProviderHandle, ProviderError> {
        let body = FluxSubmitRequest {
            prompt: &request.prompt,
            input_image: &request.input_image,
        };

        let response = self
            .client
            .post(self.submit_url())
            .header("x-key", self.config.api_key())
            .timeout(self.config.submit_timeout)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let submitted: FluxSubmitResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(e.to_string()))?;

        tracing::debug!(request_id = %submitted.id, "Flux job submitted");

        Ok(ProviderHandle {
            request_id: submitted.id,
            polling_url: submitted.polling_url,
        })
    }

    async fn poll(&self, handle: &ProviderHandle) -> Result<ProviderStatus, ProviderError> {
        let response = self
            .client
            .get(&handle.polling_url)
            .header("x-key", self.config.api_key())
            .timeout(self.config.poll_timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        let polled: FluxPollResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(e.to_string()))?;

        polled.into_status()
    }

    async fn fetch_result(&self, sample_url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .get(sample_url)
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        let bytes = ensure_success(response)
            .await?
            .bytes()
            .await
            .map_err(map_send_error)?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll_response(json: &str) -> FluxPollResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn submit_url_joins_base_and_model() {
        let provider = FluxProvider::new(FluxConfig::new("key").with_base_url("https://bfl.test/v1/")).unwrap();
        assert_eq!(provider.submit_url(), "https://bfl.test/v1/flux-kontext-pro");
    }

    #[test]
    fn ready_with_sample_is_ready() {
        let status = poll_response(r#"{"status":"Ready","result":{"sample":"https://cdn/x.png"}}"#)
            .into_status()
            .unwrap();
        assert_eq!(
            status,
            ProviderStatus::Ready {
                sample_url: "https://cdn/x.png".to_string()
            }
        );
    }

    #[test]
    fn ready_without_sample_is_invalid() {
        let result = poll_response(r#"{"status":"Ready"}"#).into_status();
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn error_and_failed_are_failures() {
        for label in ["Error", "Failed"] {
            let status = poll_response(&format!(r#"{{"status":"{}"}}"#, label))
                .into_status()
                .unwrap();
            assert!(matches!(status, ProviderStatus::Failed { .. }));
        }
    }

    #[test]
    fn other_labels_are_pending() {
        let status = poll_response(r#"{"status":"Pending"}"#).into_status().unwrap();
        assert_eq!(status, ProviderStatus::Pending("Pending".to_string()));
    }

    #[test]
    fn default_timeouts() {
        let config = FluxConfig::new("key");
        assert_eq!(config.submit_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_timeout, Duration::from_secs(10));
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
    }
}
