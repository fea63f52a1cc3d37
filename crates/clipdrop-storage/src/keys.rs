//! Object key layout.
//!
//! ```text
//! <category>/videos/<uuid>.<ext>
//! <category>/thumbnails/<uuid>.jpg
//! ```

use clipdrop_models::Category;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Object kind, which decides the key folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Video,
    Thumbnail,
}

impl ObjectKind {
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Video => "videos",
            Self::Thumbnail => "thumbnails",
        }
    }
}

/// Lowercased extension of `file_name`, falling back to `default`.
pub fn extension_of(file_name: &str, default: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| default.to_string())
}

/// Fresh key for an object of `kind` in `category`.
pub fn object_key(category: Category, kind: ObjectKind, extension: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        category.as_str(),
        kind.folder(),
        Uuid::new_v4(),
        extension.trim_start_matches('.')
    )
}

pub fn video_key(category: Category, file_name: &str) -> String {
    object_key(category, ObjectKind::Video, &extension_of(file_name, "mp4"))
}

pub fn thumbnail_key(category: Category) -> String {
    object_key(category, ObjectKind::Thumbnail, "jpg")
}

/// Content type for a video or image extension.
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// Reject keys that would escape the bucket layout.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|s| s.is_empty() || s == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
