//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `auth_middleware` - Layer that resolves the caller and injects it into extensions
//! - `RequireAuth` - Extractor that requires an authenticated caller
//!
//! # Modes
//!
//! `SessionAuth::Jwt` verifies `Authorization: Bearer <token>` issued by the
//! identity provider (RS256, `sub` is the user id). `SessionAuth::DevHeader`
//! trusts an `X-User-Id` header and exists for local development and tests.
//!
//! ```text
//! Request → auth_middleware → injects AuthenticatedUser into extensions
//!                                      ↓
//!                              Handler → RequireAuth extractor reads from extensions
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::domain::foundation::UserId;

/// Header trusted in development mode.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// The caller of an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// How requests are authenticated.
#[derive(Clone)]
pub enum SessionAuth {
    Jwt {
        key: Arc<DecodingKey>,
        validation: Arc<Validation>,
    },
    DevHeader,
}

impl SessionAuth {
    /// Verifies session tokens against the identity provider's RSA public key.
    pub fn from_rsa_pem(pem: &str, issuer: Option<&str>) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Ok(SessionAuth::Jwt {
            key: Arc::new(key),
            validation: Arc::new(validation),
        })
    }

    pub fn dev_header() -> Self {
        SessionAuth::DevHeader
    }

    pub fn is_dev_header(&self) -> bool {
        matches!(self, SessionAuth::DevHeader)
    }

    /// Resolves the caller from request headers.
    ///
    /// `Ok(None)` means no credentials were presented.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Option<AuthenticatedUser>, AuthRejection> {
        match self {
            SessionAuth::Jwt { key, validation } => {
                let Some(token) = headers
                    .get("Authorization")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|h| h.strip_prefix("Bearer "))
                else {
                    return Ok(None);
                };

                let data = decode::<SessionClaims>(token, key, validation).map_err(|e| match e.kind() {
                    ErrorKind::ExpiredSignature => AuthRejection::TokenExpired,
                    _ => {
                        tracing::debug!(error = %e, "Session token rejected");
                        AuthRejection::InvalidToken
                    }
                })?;
                let user_id = UserId::new(data.claims.sub).map_err(|_| AuthRejection::InvalidToken)?;
                Ok(Some(AuthenticatedUser {
                    user_id,
                    email: data.claims.email,
                }))
            }
            SessionAuth::DevHeader => {
                let Some(raw) = headers.get(DEV_USER_HEADER).and_then(|h| h.to_str().ok()) else {
                    return Ok(None);
                };
                let user_id = UserId::new(raw.trim()).map_err(|_| AuthRejection::InvalidToken)?;
                Ok(Some(AuthenticatedUser::new(user_id)))
            }
        }
    }
}

/// Authentication middleware.
///
/// Missing credentials pass through so `RequireAuth` can reject them per
/// route. Invalid credentials are rejected here with 401.
pub async fn auth_middleware(
    State(auth): State<SessionAuth>,
    mut request: Request,
    next: Next,
) -> Response {
    match auth.authenticate(request.headers()) {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(rejection) => rejection.into_response(),
    }
}

/// Extractor that requires authentication.
///
/// ```ignore
/// async fn my_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .cloned()
                .map(RequireAuth)
                .ok_or(AuthRejection::Unauthenticated)
        })
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No credentials were presented.
    Unauthenticated,
    InvalidToken,
    TokenExpired,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            AuthRejection::Unauthenticated => "Authentication required",
            AuthRejection::InvalidToken => "Invalid token",
            AuthRejection::TokenExpired => "Token expired",
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "kind": "Unauthorized",
                "message": message
            })),
        )
            .into_response()
    }
}
