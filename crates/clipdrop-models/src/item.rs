//! Ingestion queue items.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::category::{Category, CategoryClassification};
use crate::video::VideoMetadata;

/// Lifecycle status of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
        }
    }

    /// Status only moves forward: pending -> processing -> completed | failed.
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Pending, ItemStatus::Processing)
                | (ItemStatus::Processing, ItemStatus::Completed)
                | (ItemStatus::Processing, ItemStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Failed)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A discovered video file awaiting or undergoing processing.
///
/// The absolute file path is the item's identity.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueueItem {
    pub path: PathBuf,

    pub file_name: String,

    #[serde(default)]
    pub status: ItemStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<CategoryClassification>,

    /// Category taken from the watched subfolder, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_override: Option<Category>,

    pub discovered_at: DateTime<Utc>,

    /// Directory names between the watch root and the file, outermost first
    #[serde(default)]
    pub path_segments: Vec<String>,
}

impl QueueItem {
    /// Create a pending item for a discovered file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            path,
            file_name,
            status: ItemStatus::Pending,
            error: None,
            metadata: None,
            classification: None,
            category_override: None,
            discovered_at: Utc::now(),
            path_segments: Vec::new(),
        }
    }

    pub fn with_segments(mut self, segments: Vec<String>) -> Self {
        self.path_segments = segments;
        self
    }

    pub fn with_override(mut self, category: Option<Category>) -> Self {
        self.category_override = category;
        self
    }

    /// File name without its extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.file_name.clone())
    }

    /// Lowercased extension, defaulting to "mp4".
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "mp4".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_monotonic() {
        use ItemStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Processing));
    }

    #[test]
    fn test_new_item() {
        let item = QueueItem::new("/watch/beauty/Serum_Ad.MOV");
        assert_eq!(item.file_name, "Serum_Ad.MOV");
        assert_eq!(item.stem(), "Serum_Ad");
        assert_eq!(item.extension(), "mov");
        assert_eq!(item.status, ItemStatus::Pending);
        assert!(item.category_override.is_none());
    }
}
