//! Data Transfer Objects for generation endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::{GalleryItem, GenerateImageResult};
use crate::ports::SignedUpload;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to transform an image.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Optional; when present it must match the authenticated caller.
    #[serde(default)]
    pub user_id: Option<String>,
    pub prompt: String,
    /// Storage path of the uploaded source image.
    pub before_image_ref: String,
    /// Generation this one regenerates from.
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Request for a signed upload URL.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub generation_id: String,
    pub result_ref: String,
    pub result_url: Option<String>,
    pub credits_remaining: u32,
    pub parent_id: Option<String>,
}

impl From<GenerateImageResult> for GenerateResponse {
    fn from(result: GenerateImageResult) -> Self {
        Self {
            generation_id: result.record.id.to_string(),
            result_ref: result.result_ref,
            result_url: result.result_url,
            credits_remaining: result.credits_remaining,
            parent_id: result.record.parent_id.map(|id| id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItemResponse {
    pub id: String,
    pub prompt: String,
    pub original_path: String,
    pub result_path: String,
    pub before_url: Option<String>,
    pub after_url: Option<String>,
    pub parent_id: Option<String>,
    pub created_at: String,
}

impl From<GalleryItem> for GalleryItemResponse {
    fn from(item: GalleryItem) -> Self {
        let record = item.record;
        Self {
            id: record.id.to_string(),
            prompt: record.prompt,
            original_path: record.original_path,
            result_path: record.result_path,
            before_url: item.before_url,
            after_url: item.after_url,
            parent_id: record.parent_id.map(|id| id.to_string()),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryResponse {
    pub generations: Vec<GalleryItemResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub signed_url: String,
    pub path: String,
    pub token: Option<String>,
}

impl From<SignedUpload> for UploadUrlResponse {
    fn from(upload: SignedUpload) -> Self {
        Self {
            signed_url: upload.signed_url,
            path: upload.path,
            token: upload.token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{GenerationId, UserId};
    use crate::domain::generation::GenerationRecord;

    #[test]
    fn generate_request_accepts_camel_case() {
        let json = r#"{"userId":"user_1","prompt":"modern","beforeImageRef":"user_1/room.png"}"#;
        let req: GenerateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.user_id.as_deref(), Some("user_1"));
        assert_eq!(req.before_image_ref, "user_1/room.png");
        assert!(req.parent_id.is_none());
    }

    #[test]
    fn gallery_item_serializes_camel_case() {
        let parent = GenerationId::new();
        let record = GenerationRecord::new(
            GenerationId::new(),
            UserId::new("user_1").unwrap(),
            "user_1/room.png",
            "user_1/results/a.png",
            "modern",
            Some(parent),
        );
        let item = GalleryItem {
            record,
            before_url: Some("https://signed/before".to_string()),
            after_url: None,
        };

        let json = serde_json::to_value(GalleryItemResponse::from(item)).unwrap();

        assert_eq!(json["originalPath"], "user_1/room.png");
        assert_eq!(json["beforeUrl"], "https://signed/before");
        assert_eq!(json["parentId"], parent.to_string());
        assert!(json["afterUrl"].is_null());
    }
}
