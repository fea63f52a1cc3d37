//! Single sequential queue worker.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{watch, Notify};
use tracing::{debug, info, Instrument};

use clipdrop_media::{move_into_dir, remove_if_exists};
use clipdrop_models::{ItemStatus, QueueItem, Stage};
use clipdrop_queue::{IngestionQueue, ProgressChannel};

use crate::config::WorkerConfig;
use crate::logging::ItemLogger;
use crate::metrics;
use crate::pipeline::{Artifacts, ItemContext, ItemPipeline, StageFailure};
use crate::publisher::PublishedAsset;

/// Drains the ingestion queue one item at a time.
///
/// Discovery wakes the worker through [`QueueWorker::notifier`]. A drain
/// never overlaps another: calling [`QueueWorker::process_queue`] while one
/// is running returns immediately.
pub struct QueueWorker {
    config: Arc<WorkerConfig>,
    queue: Arc<IngestionQueue>,
    progress: ProgressChannel,
    pipeline: ItemPipeline,
    notify: Arc<Notify>,
    draining: AtomicBool,
    shutdown: Option<watch::Receiver<bool>>,
}

impl QueueWorker {
    pub fn new(
        config: Arc<WorkerConfig>,
        queue: Arc<IngestionQueue>,
        progress: ProgressChannel,
        pipeline: ItemPipeline,
    ) -> Self {
        Self {
            config,
            queue,
            progress,
            pipeline,
            notify: Arc::new(Notify::new()),
            draining: AtomicBool::new(false),
            shutdown: None,
        }
    }

    /// Stop picking up new items once `shutdown` flips to `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Wait for wake-ups and drain until shutdown.
    pub async fn run(self: Arc<Self>) {
        let mut shutdown = self.shutdown.clone();
        info!("Queue worker started");

        loop {
            self.process_queue().await;
            if self.shutdown_requested() {
                break;
            }

            match shutdown.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        changed = rx.changed() => {
                            if changed.is_err() || *rx.borrow() {
                                break;
                            }
                        }
                    }
                }
                None => self.notify.notified().await,
            }
        }

        info!("Queue worker stopped");
    }

    /// Process every pending item in insertion order.
    ///
    /// Returns the number of items taken to a terminal state; 0 when another
    /// drain is already running.
    pub async fn process_queue(&self) -> usize {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Drain already in progress");
            return 0;
        }

        let mut processed = 0;
        while !self.shutdown_requested() {
            let Some(item) = self.queue.next_pending() else {
                break;
            };
            self.process_item(item).await;
            processed += 1;
        }

        self.draining.store(false, Ordering::Release);
        metrics::set_queue_length(self.queue.len());
        processed
    }

    async fn process_item(&self, item: QueueItem) {
        let logger = ItemLogger::new(&item.path);
        let span = logger.create_span();
        self.run_item(item, logger).instrument(span).await;
    }

    async fn run_item(&self, item: QueueItem, logger: ItemLogger) {
        let started = Instant::now();
        let path = item.path.clone();

        let item = match self.queue.transition(&path, ItemStatus::Processing) {
            Ok(item) => item,
            Err(e) => {
                logger.log_warning(&format!("Skipping item: {}", e));
                self.queue.remove(&path);
                return;
            }
        };
        logger.log_start(&item.file_name);
        self.progress.progress(&path, Stage::Probe, "Processing started");

        let ctx = ItemContext {
            queue: &self.queue,
            progress: &self.progress,
            logger: &logger,
        };
        let mut artifacts = Artifacts::default();
        let result = self.pipeline.run(&item, &mut artifacts, &ctx).await;

        match result {
            Ok(published) => {
                self.finish_success(&path, &logger, &published, &mut artifacts).await;
                metrics::record_item_completed(published.category.as_str(), started.elapsed().as_secs_f64());
            }
            Err(failure) => {
                let (stage, kind) = (failure.stage, failure.error.kind());
                self.finish_failure(&path, &logger, failure, &mut artifacts).await;
                metrics::record_item_failed(Some(stage), kind, started.elapsed().as_secs_f64());
            }
        }

        self.queue.remove(&path);
    }

    async fn finish_success(
        &self,
        path: &Path,
        logger: &ItemLogger,
        published: &PublishedAsset,
        artifacts: &mut Artifacts,
    ) {
        let logger = logger.at(Stage::Finalize);
        if let Err(e) = self.queue.transition(path, ItemStatus::Completed) {
            logger.log_warning(&e.to_string());
        }

        if self.config.delete_source_on_success {
            if let Err(e) = remove_if_exists(path).await {
                logger.log_warning(&format!("Failed to delete source: {}", e));
            }
        } else if let Err(e) = move_into_dir(path, &self.config.processed_dir).await {
            logger.log_warning(&format!("Failed to move source to processed folder: {}", e));
        }

        artifacts.cleanup(path).await;

        self.progress.completed(
            path,
            &published.asset_id,
            &published.video.url,
            &published.thumbnail.url,
            published.category,
        );
        logger.log_completion(&format!("asset {}", published.asset_id));
    }

    async fn finish_failure(
        &self,
        path: &Path,
        logger: &ItemLogger,
        failure: StageFailure,
        artifacts: &mut Artifacts,
    ) {
        let StageFailure { stage, error } = failure;
        let logger = logger.at(stage);
        let message = error.to_string();

        if let Err(e) = self.queue.fail(path, message.as_str()) {
            logger.log_warning(&e.to_string());
        }

        if let Err(e) = move_into_dir(path, &self.config.failed_dir).await {
            logger.log_warning(&format!("Failed to move source to failed folder: {}", e));
        }

        artifacts.cleanup(path).await;

        self.progress.failed(path, Some(stage), message.as_str());
        logger.log_error(&message);
    }
}
