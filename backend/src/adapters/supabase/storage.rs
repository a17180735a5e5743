//! Supabase Storage adapter - implementation of ObjectStorage over the
//! storage REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{ObjectStorage, SignedUpload};

#[derive(Clone)]
pub struct SupabaseStorageConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub project_url: String,
    service_role_key: SecretString,
    pub bucket: String,
    pub request_timeout: Duration,
}

impl SupabaseStorageConfig {
    pub fn new(
        project_url: impl Into<String>,
        service_role_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            project_url: project_url.into().trim_end_matches('/').to_string(),
            service_role_key: SecretString::new(service_role_key.into()),
            bucket: bucket.into(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

pub struct SupabaseStorage {
    config: SupabaseStorageConfig,
    client: Client,
}

#[derive(Serialize)]
struct SignRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

#[derive(Deserialize)]
struct UploadSignResponse {
    url: String,
}

#[derive(Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

fn storage_error(action: &str, detail: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::StorageError, format!("Storage {} failed: {}", action, detail))
}

async fn ensure_success(action: &str, response: Response) -> Result<Response, DomainError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(storage_error(action, format!("{} {}", status.as_u16(), body)))
}

/// Pulls the `token` query parameter out of a signed upload URL.
fn token_from_url(url: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "token")
        .map(|(_, value)| value.to_string())
}

impl SupabaseStorage {
    pub fn new(config: SupabaseStorageConfig) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| storage_error("client setup", e))?;
        Ok(Self { config, client })
    }

    fn api(&self, suffix: &str) -> String {
        format!("{}/storage/v1{}", self.config.project_url, suffix)
    }

    fn object_url(&self, kind: &str, path: &str) -> String {
        self.api(&format!("/object{}/{}/{}", kind, self.config.bucket, path))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.config.service_role_key.expose_secret();
        request.bearer_auth(key).header("apikey", key.as_str())
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn download(&self, path: &str) -> Result<Vec<u8>, DomainError> {
        let response = self
            .authorized(self.client.get(self.object_url("", path)))
            .send()
            .await
            .map_err(|e| storage_error("download", e))?;
        let bytes = ensure_success("download", response)
            .await?
            .bytes()
            .await
            .map_err(|e| storage_error("download", e))?;
        Ok(bytes.to_vec())
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), DomainError> {
        let response = self
            .authorized(self.client.post(self.object_url("", path)))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| storage_error("upload", e))?;
        ensure_success("upload", response).await?;
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), DomainError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.api(&format!("/object/{}", self.config.bucket));
        let response = self
            .authorized(self.client.delete(url))
            .json(&RemoveRequest { prefixes: paths })
            .send()
            .await
            .map_err(|e| storage_error("remove", e))?;
        ensure_success("remove", response).await?;
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, ttl_secs: u64) -> Result<String, DomainError> {
        let response = self
            .authorized(self.client.post(self.object_url("/sign", path)))
            .json(&SignRequest { expires_in: ttl_secs })
            .send()
            .await
            .map_err(|e| storage_error("sign", e))?;
        let signed: SignResponse = ensure_success("sign", response)
            .await?
            .json()
            .await
            .map_err(|e| storage_error("sign", e))?;
        Ok(self.api(&signed.signed_url))
    }

    async fn create_signed_upload_url(&self, path: &str) -> Result<SignedUpload, DomainError> {
        let response = self
            .authorized(self.client.post(self.object_url("/upload/sign", path)))
            .send()
            .await
            .map_err(|e| storage_error("upload sign", e))?;
        let signed: UploadSignResponse = ensure_success("upload sign", response)
            .await?
            .json()
            .await
            .map_err(|e| storage_error("upload sign", e))?;

        Ok(SignedUpload {
            token: token_from_url(&signed.url),
            signed_url: self.api(&signed.url),
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SupabaseStorage {
        SupabaseStorage::new(SupabaseStorageConfig::new(
            "https://xyz.supabase.co/",
            "service-key",
            "images",
        ))
        .unwrap()
    }

    #[test]
    fn object_urls() {
        let s = storage();
        assert_eq!(
            s.object_url("", "user_1/a.png"),
            "https://xyz.supabase.co/storage/v1/object/images/user_1/a.png"
        );
        assert_eq!(
            s.object_url("/sign", "user_1/a.png"),
            "https://xyz.supabase.co/storage/v1/object/sign/images/user_1/a.png"
        );
        assert_eq!(
            s.object_url("/upload/sign", "user_1/a.png"),
            "https://xyz.supabase.co/storage/v1/object/upload/sign/images/user_1/a.png"
        );
    }

    #[test]
    fn token_is_extracted_from_signed_upload_url() {
        assert_eq!(
            token_from_url("/object/upload/sign/images/u/a.png?token=abc.def").as_deref(),
            Some("abc.def")
        );
        assert_eq!(token_from_url("/object/upload/sign/images/u/a.png"), None);
    }

    #[test]
    fn sign_request_uses_camel_case() {
        let json = serde_json::to_string(&SignRequest { expires_in: 7200 }).unwrap();
        assert_eq!(json, r#"{"expiresIn":7200}"#);
    }
}
