//! ImageTransformProvider port - the external AI image editing service.
//!
//! Jobs are asynchronous on the provider side: `submit` returns a handle,
//! `poll` reports progress, and `fetch_result` downloads the finished image.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::generation::ProviderHandle;

/// A transformation request as sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    pub prompt: String,
    /// Source image, base64 encoded.
    pub input_image: String,
}

/// Provider-reported job status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    /// Still running; carries the provider's raw status label.
    Pending(String),
    Ready { sample_url: String },
    Failed { reason: String },
}

/// Errors from provider calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the provider.
    #[error("provider returned status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn network(message: impl Into<String>) -> Self {
        ProviderError::Network(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        ProviderError::InvalidResponse(message.into())
    }

    /// Transport-level failures that a later poll may not repeat.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout | ProviderError::Network(_) => true,
            ProviderError::Rejected { status, .. } => *status == 429 || *status >= 500,
            ProviderError::InvalidResponse(_) => false,
        }
    }
}

#[async_trait]
pub trait ImageTransformProvider: Send + Sync {
    async fn submit(&self, request: TransformRequest) -> Result<ProviderHandle, ProviderError>;

    async fn poll(&self, handle: &ProviderHandle) -> Result<ProviderStatus, ProviderError>;

    async fn fetch_result(&self, sample_url: &str) -> Result<Vec<u8>, ProviderError>;
}
