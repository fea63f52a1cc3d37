//! Pipeline error types.

use thiserror::Error;

use clipdrop_catalog::CatalogError;
use clipdrop_media::MediaError;
use clipdrop_models::Stage;
use clipdrop_queue::QueueError;
use clipdrop_storage::StorageError;

pub type WorkerResult<T> = Result<T, PipelineError>;

/// Everything that can fail an item or stop the worker from starting.
///
/// Item-level variants are caught at the worker boundary and turned into a
/// `failed` item; none of them crash the process.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Processing failed: {0}")]
    Processing(#[from] MediaError),

    #[error("Upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error("Catalog write failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Stage {stage} timed out after {secs}s")]
    StageTimeout { stage: Stage, secs: u64 },

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Rejected by the acceptance rules.
    pub fn is_validation(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }

    /// Metric label for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::Processing(_) => "processing",
            PipelineError::Upload(_) => "upload",
            PipelineError::Catalog(_) => "catalog",
            PipelineError::StageTimeout { .. } => "timeout",
            PipelineError::Queue(_) => "queue",
            PipelineError::Config(_) => "config",
            PipelineError::Watcher(_) => "watcher",
            PipelineError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_joined() {
        let err = PipelineError::Validation(vec![
            "Duration 30s (30.00s measured) is outside the allowed 9-11s window".into(),
            "File size 150.0 MB exceeds the 100 MB limit".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: Duration 30s (30.00s measured) is outside the allowed 9-11s window; \
             File size 150.0 MB exceeds the 100 MB limit"
        );
        assert!(err.is_validation());
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_stage_timeout_display() {
        let err = PipelineError::StageTimeout {
            stage: Stage::Watermark,
            secs: 300,
        };
        assert_eq!(err.to_string(), "Stage watermark timed out after 300s");
    }

    #[test]
    fn test_media_error_converts() {
        let err: PipelineError = MediaError::invalid_video("no video stream").into();
        assert_eq!(err.kind(), "processing");
        assert!(err.to_string().contains("no video stream"));
    }
}
