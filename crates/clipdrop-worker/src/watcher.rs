//! Watch-folder discovery.
//!
//! Files appear in the queue in two ways: the startup scan of everything
//! already under the watch root, and debounced filesystem events after
//! that. Both paths go through [`Intake::offer`], so filtering and de-dupe
//! behave the same.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer, RecommendedCache};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use clipdrop_classifier::segments_between;
use clipdrop_models::QueueItem;
use clipdrop_queue::{IngestionQueue, ProgressChannel};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::metrics;

/// Video containers picked up by the watcher.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm", "m4v", "mkv"];

/// Extension check, case-insensitive.
pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Turns discovered paths into pending queue items.
#[derive(Clone)]
pub struct Intake {
    config: Arc<WorkerConfig>,
    queue: Arc<IngestionQueue>,
    progress: ProgressChannel,
}

impl Intake {
    pub fn new(config: Arc<WorkerConfig>, queue: Arc<IngestionQueue>, progress: ProgressChannel) -> Self {
        Self {
            config,
            queue,
            progress,
        }
    }

    /// Enqueue `path` if it is a supported file under the watch root that is
    /// not already queued. Returns whether an item was inserted.
    pub fn offer(&self, path: &Path) -> bool {
        if !is_supported_video(path) || !path.starts_with(&self.config.watch_root) || self.config.is_excluded(path) {
            return false;
        }
        if !path.is_file() || self.queue.contains(path) {
            return false;
        }

        let segments = segments_between(&self.config.watch_root, path);
        let category_override = if self.config.subfolder_categorization {
            self.config.category_folders.resolve_nearest(&segments)
        } else {
            None
        };

        let item = QueueItem::new(path)
            .with_segments(segments)
            .with_override(category_override);
        if !self.queue.enqueue(item) {
            return false;
        }

        info!(
            path = %path.display(),
            category_override = ?category_override,
            "Queued video"
        );
        metrics::record_item_enqueued();
        metrics::set_queue_length(self.queue.len());
        self.progress.queued(path);
        true
    }

    /// Offer every file already under the watch root, in path order.
    pub async fn scan(&self) -> WorkerResult<usize> {
        let mut files = Vec::new();
        let mut pending = vec![self.config.watch_root.clone()];

        while let Some(dir) = pending.pop() {
            if self.config.is_excluded(&dir) {
                continue;
            }
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
        }

        files.sort();
        let queued = files.iter().filter(|path| self.offer(path)).count();
        debug!(root = %self.config.watch_root.display(), queued, "Initial scan complete");
        Ok(queued)
    }
}

/// Recursive watcher over the configured root.
pub struct DirectoryWatcher {
    intake: Intake,
    notify: Arc<Notify>,
    debounce: Duration,
    debouncer: Option<Debouncer<RecommendedWatcher, RecommendedCache>>,
    task: Option<JoinHandle<()>>,
}

impl DirectoryWatcher {
    /// `notify` is signalled after every burst that queued something.
    pub fn new(intake: Intake, notify: Arc<Notify>) -> Self {
        let debounce = intake.config.watch_debounce;
        Self {
            intake,
            notify,
            debounce,
            debouncer: None,
            task: None,
        }
    }

    pub fn intake(&self) -> &Intake {
        &self.intake
    }

    pub fn is_running(&self) -> bool {
        self.debouncer.is_some()
    }

    /// Queue pre-existing files and wake the worker if any were found.
    pub async fn initial_scan(&self) -> WorkerResult<usize> {
        let queued = self.intake.scan().await?;
        if queued > 0 {
            self.notify.notify_one();
        }
        Ok(queued)
    }

    /// Start watching, then queue pre-existing files. The watch goes up
    /// first so a file landing mid-scan is caught by one path or the other;
    /// intake de-dupe absorbs the overlap.
    pub async fn start_and_scan(&mut self) -> WorkerResult<usize> {
        self.start()?;
        self.initial_scan().await
    }

    /// Start watching. Must be called from inside the tokio runtime.
    pub fn start(&mut self) -> WorkerResult<()> {
        if self.is_running() {
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel::<Vec<DebouncedEvent>>(256);
        let mut debouncer = new_debouncer(self.debounce, None, move |result: DebounceEventResult| match result {
            Ok(events) => {
                let _ = tx.blocking_send(events);
            }
            Err(errors) => {
                for e in errors {
                    error!(error = ?e, "Filesystem watch error");
                }
            }
        })?;
        debouncer.watch(&self.intake.config.watch_root, RecursiveMode::Recursive)?;

        let intake = self.intake.clone();
        let notify = Arc::clone(&self.notify);
        self.task = Some(tokio::spawn(async move {
            while let Some(events) = rx.recv().await {
                let queued = events
                    .iter()
                    .filter_map(candidate_path)
                    .filter(|path| intake.offer(path))
                    .count();
                if queued > 0 {
                    notify.notify_one();
                }
            }
            debug!("Watch event stream closed");
        }));

        info!(
            root = %self.intake.config.watch_root.display(),
            debounce_ms = self.debounce.as_millis() as u64,
            "Watching for new videos"
        );
        self.debouncer = Some(debouncer);
        Ok(())
    }

    /// Drop the OS watch. The event task ends once the channel drains.
    pub fn stop(&mut self) {
        if self.debouncer.take().is_some() {
            info!("Stopped watching");
        }
        self.task.take();
    }
}

/// Path a debounced event introduces, if any. Creations and rename targets
/// count; metadata changes and removals do not.
fn candidate_path(event: &DebouncedEvent) -> Option<&PathBuf> {
    match event.event.kind {
        EventKind::Create(_) => event.event.paths.first(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.event.paths.first(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event.event.paths.last(),
        _ => None,
    }
}
