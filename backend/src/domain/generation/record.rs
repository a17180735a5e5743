//! Generation records and validated generation requests.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{GenerationId, Timestamp, UserId, ValidationError};

/// Longest accepted prompt, in characters.
pub const MAX_PROMPT_CHARS: usize = 2000;

/// One completed transformation in a user's gallery.
///
/// # Invariants
///
/// - Created only after the debit for it has been committed
/// - `parent_id`, when set, points at a record owned by the same user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: GenerationId,
    pub user_id: UserId,
    /// Storage path of the source image.
    pub original_path: String,
    /// Storage path of the transformed image.
    pub result_path: String,
    pub prompt: String,
    pub parent_id: Option<GenerationId>,
    pub deleted: bool,
    pub created_at: Timestamp,
}

impl GenerationRecord {
    pub fn new(
        id: GenerationId,
        user_id: UserId,
        original_path: impl Into<String>,
        result_path: impl Into<String>,
        prompt: impl Into<String>,
        parent_id: Option<GenerationId>,
    ) -> Self {
        Self {
            id,
            user_id,
            original_path: original_path.into(),
            result_path: result_path.into(),
            prompt: prompt.into(),
            parent_id,
            deleted: false,
            created_at: Timestamp::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }
}

/// A validated request to transform one source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub user_id: UserId,
    pub prompt: String,
    pub source_ref: String,
    pub parent_id: Option<GenerationId>,
}

impl GenerationRequest {
    /// Validates and normalizes request fields.
    ///
    /// The prompt is trimmed and must be non-empty. The source reference must
    /// be a relative path inside the caller's own storage folder.
    pub fn new(
        user_id: UserId,
        prompt: &str,
        source_ref: &str,
        parent_id: Option<GenerationId>,
    ) -> Result<Self, ValidationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ValidationError::empty_field("prompt"));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(ValidationError::invalid_format(
                "prompt",
                format!("must be at most {} characters", MAX_PROMPT_CHARS),
            ));
        }

        let source_ref = source_ref.trim();
        validate_object_path("beforeImageRef", source_ref)?;
        if !source_ref.starts_with(&format!("{}/", user_id)) {
            return Err(ValidationError::invalid_format(
                "beforeImageRef",
                "must reference an object in the caller's folder",
            ));
        }

        Ok(Self {
            user_id,
            prompt: prompt.to_string(),
            source_ref: source_ref.to_string(),
            parent_id,
        })
    }
}

/// Rejects empty, absolute and parent-traversing object paths.
pub fn validate_object_path(field: &str, path: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    if path.starts_with('/') || path.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return Err(ValidationError::invalid_format(field, "not a valid object path"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("user_1").unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Request validation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn request_trims_prompt() {
        let req = GenerationRequest::new(user(), "  stage this room  ", "user_1/room.jpg", None).unwrap();
        assert_eq!(req.prompt, "stage this room");
    }

    #[test]
    fn request_rejects_blank_prompt() {
        let err = GenerationRequest::new(user(), "   ", "user_1/room.jpg", None).unwrap_err();
        assert_eq!(err, ValidationError::empty_field("prompt"));
    }

    #[test]
    fn request_rejects_overlong_prompt() {
        let prompt = "a".repeat(MAX_PROMPT_CHARS + 1);
        assert!(GenerationRequest::new(user(), &prompt, "user_1/room.jpg", None).is_err());
    }

    #[test]
    fn request_rejects_foreign_source() {
        let result = GenerationRequest::new(user(), "stage", "user_2/room.jpg", None);
        assert!(result.is_err());
    }

    #[test]
    fn request_rejects_traversal() {
        assert!(GenerationRequest::new(user(), "stage", "user_1/../user_2/room.jpg", None).is_err());
        assert!(GenerationRequest::new(user(), "stage", "/user_1/room.jpg", None).is_err());
    }

    #[test]
    fn object_path_rules() {
        assert!(validate_object_path("f", "a/b.png").is_ok());
        assert!(validate_object_path("f", "").is_err());
        assert!(validate_object_path("f", "a//b.png").is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Record
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn new_record_is_live() {
        let record = GenerationRecord::new(
            GenerationId::new(),
            user(),
            "user_1/room.jpg",
            "user_1/results/x.png",
            "stage",
            None,
        );
        assert!(!record.deleted);
        assert!(record.is_owned_by(&user()));
        assert!(!record.is_owned_by(&UserId::new("user_2").unwrap()));
    }
}
