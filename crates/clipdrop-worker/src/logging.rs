//! Structured per-item logging.
//!
//! Every line carries the item path and the current stage so one file's
//! journey through the pipeline can be filtered out of the worker log.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn, Span};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipdrop_models::Stage;

/// Install the global subscriber for a binary.
///
/// `LOG_FORMAT=json` selects JSON lines, anything else colored text.
/// `RUST_LOG` directives are honored on top of the defaults.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = ["clipdrop=info", "ort=warn", "onnxruntime=warn"]
        .iter()
        .filter_map(|d| d.parse::<Directive>().ok())
        .fold(EnvFilter::from_default_env(), |filter, directive| filter.add_directive(directive));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

/// Logger bound to one queue item.
#[derive(Debug, Clone)]
pub struct ItemLogger {
    path: PathBuf,
    stage: Option<Stage>,
}

impl ItemLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            stage: None,
        }
    }

    /// Same item, at `stage`.
    pub fn at(&self, stage: Stage) -> Self {
        Self {
            path: self.path.clone(),
            stage: Some(stage),
        }
    }

    fn stage_name(&self) -> &'static str {
        self.stage.map(|s| s.as_str()).unwrap_or("queued")
    }

    pub fn log_start(&self, message: &str) {
        info!(
            path = %self.path.display(),
            stage = self.stage_name(),
            "Item started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            path = %self.path.display(),
            stage = self.stage_name(),
            "Item progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            path = %self.path.display(),
            stage = self.stage_name(),
            "Item warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            path = %self.path.display(),
            stage = self.stage_name(),
            "Item failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            path = %self.path.display(),
            stage = self.stage_name(),
            "Item completed: {}", message
        );
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    /// Span covering the item's whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "item",
            path = %self.path.display(),
            stage = self.stage_name()
        )
    }
}
