//! Upload payloads and the object store seam.

use std::path::Path;

use async_trait::async_trait;
use clipdrop_models::Category;

use crate::error::{StorageError, StorageResult};
use crate::keys::{content_type_for, extension_of};

/// Bytes to upload plus the metadata needed to store them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Original file name; its extension picks the key suffix
    pub file_name: String,
}

impl UploadPayload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Read `path` fully, inferring the content type from its extension.
    pub async fn from_file(path: &Path) -> StorageResult<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| StorageError::upload_failed(format!("No file name in {}", path.display())))?;
        let bytes = tokio::fs::read(path).await?;
        let content_type = content_type_for(&extension_of(&file_name, ""));
        Ok(Self::new(bytes, content_type, file_name))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A stored object and its public URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Object storage used by the publisher.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload_video(&self, payload: UploadPayload, category: Category) -> StorageResult<StoredObject>;

    async fn upload_thumbnail(&self, payload: UploadPayload, category: Category) -> StorageResult<StoredObject>;

    async fn delete_object(&self, key: &str) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_payload_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("thumb.JPG");
        tokio::fs::write(&path, b"jpeg").await.unwrap();

        let payload = UploadPayload::from_file(&path).await.unwrap();
        assert_eq!(payload.bytes, b"jpeg");
        assert_eq!(payload.content_type, "image/jpeg");
        assert_eq!(payload.file_name, "thumb.JPG");
        assert_eq!(payload.len(), 4);
    }

    #[tokio::test]
    async fn test_payload_missing_file() {
        let result = UploadPayload::from_file(Path::new("/no/such/clip.mp4")).await;
        assert!(matches!(result, Err(StorageError::Io(_))));
    }
}
