//! Pipeline progress events.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::category::Category;

/// Processing stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Probe,
    Validation,
    Watermark,
    Metadata,
    Classification,
    Thumbnail,
    Publish,
    Finalize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Probe => "probe",
            Stage::Validation => "validation",
            Stage::Watermark => "watermark",
            Stage::Metadata => "metadata",
            Stage::Classification => "classification",
            Stage::Thumbnail => "thumbnail",
            Stage::Publish => "publish",
            Stage::Finalize => "finalize",
        }
    }

    /// Overall progress reported once this stage completes.
    pub fn percent_done(&self) -> u8 {
        match self {
            Stage::Probe => 5,
            Stage::Validation => 15,
            Stage::Watermark => 45,
            Stage::Metadata => 55,
            Stage::Classification => 70,
            Stage::Thumbnail => 80,
            Stage::Publish => 95,
            Stage::Finalize => 100,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event published on the progress channel.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// File discovered and queued
    Queued {
        path: PathBuf,
        timestamp: DateTime<Utc>,
    },

    /// Stage finished (0-100)
    Progress {
        path: PathBuf,
        stage: Stage,
        percent: u8,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Item failed
    Failed {
        path: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<Stage>,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Item published
    Completed {
        path: PathBuf,
        #[serde(rename = "assetId")]
        asset_id: String,
        #[serde(rename = "videoUrl")]
        video_url: String,
        #[serde(rename = "thumbnailUrl")]
        thumbnail_url: String,
        category: Category,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    pub fn queued(path: impl Into<PathBuf>) -> Self {
        Self::Queued {
            path: path.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn progress(path: impl Into<PathBuf>, stage: Stage, message: impl Into<String>) -> Self {
        Self::Progress {
            path: path.into(),
            stage,
            percent: stage.percent_done(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn failed(path: impl Into<PathBuf>, stage: Option<Stage>, error: impl Into<String>) -> Self {
        Self::Failed {
            path: path.into(),
            stage,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn completed(
        path: impl Into<PathBuf>,
        asset_id: impl Into<String>,
        video_url: impl Into<String>,
        thumbnail_url: impl Into<String>,
        category: Category,
    ) -> Self {
        Self::Completed {
            path: path.into(),
            asset_id: asset_id.into(),
            video_url: video_url.into(),
            thumbnail_url: thumbnail_url.into(),
            category,
            timestamp: Utc::now(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            PipelineEvent::Queued { path, .. }
            | PipelineEvent::Progress { path, .. }
            | PipelineEvent::Failed { path, .. }
            | PipelineEvent::Completed { path, .. } => path,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Failed { .. } | PipelineEvent::Completed { .. })
    }
}
