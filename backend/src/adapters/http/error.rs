//! HTTP error mapping.
//!
//! Every failure a client can see is rendered as `{kind, message}`. The
//! message is the user-safe text; technical detail is logged here instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::billing::LedgerError;
use crate::domain::foundation::DomainError;
use crate::domain::generation::GenerationError;

/// Structured error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error kind for programmatic handling.
    pub kind: String,
    /// Human-readable message, safe to show to the end user.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Error returned by the API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> &str {
        &self.body.kind
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        let status = err.status_code();
        if status.is_server_error() {
            tracing::error!(error = %err, kind = err.kind(), "Request failed");
        } else {
            tracing::debug!(error = %err, kind = err.kind(), "Request rejected");
        }
        Self {
            status,
            body: ErrorResponse::new(err.kind(), err.user_message()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        GenerationError::from(err).into()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        GenerationError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ErrorCode, UserId};

    #[test]
    fn insufficient_credits_is_402_with_paywall_kind() {
        let err: ApiError = LedgerError::InsufficientCredits(UserId::new("user_1").unwrap()).into();
        assert_eq!(err.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.kind(), "InsufficientCredits");
    }

    #[test]
    fn store_failure_hides_detail() {
        let err: ApiError = LedgerError::StoreUnavailable("connection refused on 10.0.0.4".to_string()).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.body.message.contains("10.0.0.4"));
    }

    #[test]
    fn domain_validation_maps_to_400() {
        let err: ApiError = DomainError::new(ErrorCode::ValidationFailed, "plan is not a paid tier").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(err.body.message, "plan is not a paid tier");
    }

    #[test]
    fn timeout_maps_to_504() {
        let err: ApiError = GenerationError::ProviderTimedOut { attempts: 180 }.into();
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.kind(), "Timeout");
    }

    #[test]
    fn error_response_serializes_kind_and_message() {
        let json = serde_json::to_value(ErrorResponse::new("Forbidden", "nope")).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "Forbidden", "message": "nope"}));
    }
}
