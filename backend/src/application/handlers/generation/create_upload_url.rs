//! CreateUploadUrlHandler - signed upload target inside the caller's folder.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::generation::{validate_object_path, GenerationError};
use crate::ports::{ObjectStorage, SignedUpload};

#[derive(Debug, Clone)]
pub struct CreateUploadUrlCommand {
    pub user_id: UserId,
    pub file_name: String,
}

pub struct CreateUploadUrlHandler {
    storage: Arc<dyn ObjectStorage>,
}

impl CreateUploadUrlHandler {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    pub async fn handle(&self, cmd: CreateUploadUrlCommand) -> Result<SignedUpload, GenerationError> {
        let file_name = cmd.file_name.trim();
        validate_object_path("fileName", file_name)?;
        if file_name.contains('/') {
            return Err(GenerationError::Validation(
                "fileName must not contain '/'".to_string(),
            ));
        }

        let path = format!("{}/{}", cmd.user_id, file_name);
        let upload = self.storage.create_signed_upload_url(&path).await?;
        tracing::debug!(user_id = %cmd.user_id, path = %upload.path, "Upload URL issued");
        Ok(upload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryObjectStorage;

    fn handler() -> CreateUploadUrlHandler {
        CreateUploadUrlHandler::new(Arc::new(InMemoryObjectStorage::new()))
    }

    fn command(file_name: &str) -> CreateUploadUrlCommand {
        CreateUploadUrlCommand {
            user_id: UserId::new("user_1").unwrap(),
            file_name: file_name.to_string(),
        }
    }

    #[tokio::test]
    async fn issues_url_in_user_folder() {
        let upload = handler().handle(command("living-room.jpg")).await.unwrap();

        assert_eq!(upload.path, "user_1/living-room.jpg");
        assert_eq!(upload.signed_url, "memory://upload/user_1/living-room.jpg");
    }

    #[tokio::test]
    async fn rejects_nested_or_traversing_names() {
        for name in ["", "../x.jpg", "a/b.jpg", ".."] {
            assert!(handler().handle(command(name)).await.is_err(), "{name:?} accepted");
        }
    }
}
