//! Worker configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clipdrop_classifier::OrtClassifierConfig;
use clipdrop_models::watermark::{
    DEFAULT_ANGLE, DEFAULT_COLOR, DEFAULT_FONT_SIZE, DEFAULT_OPACITY, DEFAULT_SPACING, DEFAULT_WATERMARK_TEXT,
};
use clipdrop_models::{CategoryFolderMap, TextWatermark, WatermarkConfig};
use clipdrop_media::DEFAULT_THUMBNAIL_OFFSET_SECS;

use crate::error::{PipelineError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root of the watched tree
    pub watch_root: PathBuf,
    /// Sources land here after a successful publish
    pub processed_dir: PathBuf,
    /// Sources land here after any failure
    pub failed_dir: PathBuf,
    /// Scratch space for frames, thumbnails and watermarked copies
    pub work_dir: PathBuf,
    /// Delete the source instead of moving it to `processed_dir`
    pub delete_source_on_success: bool,
    /// Derive a category override from the file's parent folders
    pub subfolder_categorization: bool,
    pub category_folders: CategoryFolderMap,
    pub watermark: WatermarkConfig,
    pub thumbnail_offset_secs: f64,
    /// Deadline for each pipeline stage
    pub stage_timeout: Duration,
    /// Quiet period before a filesystem event is acted on
    pub watch_debounce: Duration,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub classifier_model_path: Option<PathBuf>,
    pub classifier_labels_path: Option<PathBuf>,
    /// Prometheus exporter port; disabled when unset
    pub metrics_port: Option<u16>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            watch_root: PathBuf::from("./inbox"),
            processed_dir: PathBuf::from("./processed"),
            failed_dir: PathBuf::from("./failed"),
            work_dir: std::env::temp_dir().join("clipdrop"),
            delete_source_on_success: false,
            subfolder_categorization: true,
            category_folders: CategoryFolderMap::new(),
            watermark: WatermarkConfig::default(),
            thumbnail_offset_secs: DEFAULT_THUMBNAIL_OFFSET_SECS,
            stage_timeout: Duration::from_secs(300),
            watch_debounce: Duration::from_millis(2000),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            classifier_model_path: None,
            classifier_labels_path: None,
            metrics_port: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let category_folders = match env_string("CATEGORY_FOLDER_MAP") {
            Some(json) => CategoryFolderMap::from_json(&json)
                .map_err(|e| PipelineError::config(format!("CATEGORY_FOLDER_MAP is not a valid map: {}", e)))?,
            None => CategoryFolderMap::new(),
        };

        let opacity = env_parse("WATERMARK_OPACITY", DEFAULT_OPACITY);
        let text = TextWatermark {
            text: env_string("WATERMARK_TEXT").unwrap_or_else(|| DEFAULT_WATERMARK_TEXT.to_string()),
            opacity,
            font_size: env_parse("WATERMARK_FONT_SIZE", DEFAULT_FONT_SIZE),
            color: env_string("WATERMARK_COLOR").unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            spacing: env_parse("WATERMARK_SPACING", DEFAULT_SPACING),
            angle: env_parse("WATERMARK_ANGLE", DEFAULT_ANGLE),
            font_file: env_path("WATERMARK_FONT_FILE"),
        };
        let watermark = WatermarkConfig::select(
            env_path("WATERMARK_IMAGE_PATH"),
            text,
            opacity,
            env_flag("WATERMARK_COMPAT_TRANSCODE", false),
        );
        watermark
            .validate()
            .map_err(|e| PipelineError::config(format!("Invalid watermark configuration: {}", e)))?;

        Ok(Self {
            watch_root: env_path("WATCH_ROOT").unwrap_or(defaults.watch_root),
            processed_dir: env_path("PROCESSED_DIR").unwrap_or(defaults.processed_dir),
            failed_dir: env_path("FAILED_DIR").unwrap_or(defaults.failed_dir),
            work_dir: env_path("WORK_DIR").unwrap_or(defaults.work_dir),
            delete_source_on_success: env_flag("DELETE_SOURCE_ON_SUCCESS", defaults.delete_source_on_success),
            subfolder_categorization: env_flag("SUBFOLDER_CATEGORIZATION", defaults.subfolder_categorization),
            category_folders,
            watermark,
            thumbnail_offset_secs: env_parse("THUMBNAIL_OFFSET_SECS", DEFAULT_THUMBNAIL_OFFSET_SECS),
            stage_timeout: Duration::from_secs(env_parse("STAGE_TIMEOUT_SECS", 300)),
            watch_debounce: Duration::from_millis(env_parse("WATCH_DEBOUNCE_MS", 2000)),
            ffmpeg_path: env_path("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: env_path("FFPROBE_PATH").unwrap_or(defaults.ffprobe_path),
            classifier_model_path: env_path("CLASSIFIER_MODEL_PATH"),
            classifier_labels_path: env_path("CLASSIFIER_LABELS_PATH"),
            metrics_port: env_string("METRICS_PORT").and_then(|s| s.parse().ok()),
        })
    }

    /// Defaults with every directory placed under `base`.
    pub fn rooted_at(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            watch_root: base.join("inbox"),
            processed_dir: base.join("processed"),
            failed_dir: base.join("failed"),
            work_dir: base.join("work"),
            ..Self::default()
        }
    }

    pub fn with_watermark(mut self, watermark: WatermarkConfig) -> Self {
        self.watermark = watermark;
        self
    }

    pub fn with_category_folders(mut self, folders: CategoryFolderMap) -> Self {
        self.category_folders = folders;
        self
    }

    pub fn with_delete_source(mut self, delete: bool) -> Self {
        self.delete_source_on_success = delete;
        self
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.work_dir.join("frames")
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.work_dir.join("thumbnails")
    }

    pub fn watermarked_dir(&self) -> PathBuf {
        self.work_dir.join("watermarked")
    }

    /// Image model settings, when a model is configured. The labels file
    /// defaults to `labels.txt` next to the model.
    pub fn classifier_config(&self) -> Option<OrtClassifierConfig> {
        let model = self.classifier_model_path.as_ref()?;
        let labels = self
            .classifier_labels_path
            .clone()
            .unwrap_or_else(|| model.with_file_name("labels.txt"));
        Some(OrtClassifierConfig::new(model, labels))
    }

    /// Every directory the worker creates at startup.
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs = vec![
            self.watch_root.clone(),
            self.processed_dir.clone(),
            self.failed_dir.clone(),
            self.work_dir.clone(),
            self.frames_dir(),
            self.thumbnails_dir(),
            self.watermarked_dir(),
        ];
        dirs.extend(
            self.category_folders
                .folder_names()
                .into_iter()
                .map(|name| self.watch_root.join(name)),
        );
        dirs
    }

    /// Create all directories (idempotent) and rewrite the paths in
    /// canonical form so they compare equal to watcher event paths.
    pub async fn prepare_directories(mut self) -> WorkerResult<Self> {
        for dir in self.directories() {
            tokio::fs::create_dir_all(&dir).await?;
        }

        self.watch_root = tokio::fs::canonicalize(&self.watch_root).await?;
        self.processed_dir = tokio::fs::canonicalize(&self.processed_dir).await?;
        self.failed_dir = tokio::fs::canonicalize(&self.failed_dir).await?;
        self.work_dir = tokio::fs::canonicalize(&self.work_dir).await?;
        Ok(self)
    }

    /// Whether `path` lives in a folder the watcher must never pick up from.
    pub fn is_excluded(&self, path: &Path) -> bool {
        [&self.processed_dir, &self.failed_dir, &self.work_dir]
            .iter()
            .any(|dir| path.starts_with(dir))
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_string(key).map(PathBuf::from)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_string(key).and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    match env_string(key).map(|s| s.to_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
