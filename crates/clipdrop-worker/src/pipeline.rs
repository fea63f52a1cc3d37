//! Per-item stage sequence.
//!
//! probe -> validate -> watermark -> probe (watermarked) -> classify ->
//! thumbnail -> publish. Each stage runs under the configured deadline; the
//! first error aborts the rest and is reported together with its stage.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use clipdrop_classifier::{apply_override, CategoryClassifier, ClassifyRequest};
use clipdrop_media::{
    apply_watermark, generate_thumbnail, probe_metadata, remove_if_exists, validate_video, Encoder,
    ThumbnailOptions,
};
use clipdrop_models::{CategoryClassification, QueueItem, Stage, VideoMetadata};
use clipdrop_queue::{IngestionQueue, ProgressChannel};

use crate::config::WorkerConfig;
use crate::error::{PipelineError, WorkerResult};
use crate::logging::ItemLogger;
use crate::metrics;
use crate::publisher::{PublishRequest, PublishedAsset, Publisher};

/// A stage error tagged with the stage that raised it.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: PipelineError,
}

/// Scratch files produced for one item.
#[derive(Debug, Default)]
pub struct Artifacts {
    pub watermarked: Option<PathBuf>,
    pub thumbnail: Option<PathBuf>,
}

impl Artifacts {
    /// Remove every scratch file, never touching `source`.
    pub async fn cleanup(&mut self, source: &Path) {
        for path in [self.watermarked.take(), self.thumbnail.take()].into_iter().flatten() {
            if path == source {
                continue;
            }
            if let Err(e) = remove_if_exists(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
            }
        }
    }
}

/// Shared state an item run reports into.
pub struct ItemContext<'a> {
    pub queue: &'a IngestionQueue,
    pub progress: &'a ProgressChannel,
    pub logger: &'a ItemLogger,
}

impl ItemContext<'_> {
    fn report(&self, path: &Path, stage: Stage, message: &str) {
        self.logger.at(stage).log_progress(message);
        self.progress.progress(path, stage, message);
    }
}

/// Runs the stages for one item.
#[derive(Clone)]
pub struct ItemPipeline {
    config: Arc<WorkerConfig>,
    encoder: Arc<dyn Encoder>,
    classifier: Arc<CategoryClassifier>,
    publisher: Publisher,
}

impl ItemPipeline {
    pub fn new(
        config: Arc<WorkerConfig>,
        encoder: Arc<dyn Encoder>,
        classifier: Arc<CategoryClassifier>,
        publisher: Publisher,
    ) -> Self {
        Self {
            config,
            encoder,
            classifier,
            publisher,
        }
    }

    pub async fn run(
        &self,
        item: &QueueItem,
        artifacts: &mut Artifacts,
        ctx: &ItemContext<'_>,
    ) -> Result<PublishedAsset, StageFailure> {
        let source = item.path.as_path();
        let encoder = self.encoder.as_ref();

        let source_meta = self
            .stage(Stage::Probe, async { Ok::<_, PipelineError>(probe_metadata(encoder, source).await?) })
            .await?;

        self.stage(Stage::Validation, async {
            validate_video(source, &source_meta)
                .into_result()
                .map_err(PipelineError::Validation)
        })
        .await?;
        ctx.report(source, Stage::Validation, "Passed validation");

        let watermarked = self.scratch_path(&self.config.watermarked_dir(), item, "mp4");
        artifacts.watermarked = Some(watermarked.clone());
        self.stage(Stage::Watermark, async {
            Ok::<_, PipelineError>(apply_watermark(encoder, source, &watermarked, &self.config.watermark, Some(&source_meta)).await?)
        })
        .await?;
        ctx.report(source, Stage::Watermark, self.config.watermark.mode_name());

        let metadata = self
            .stage(Stage::Metadata, async { Ok::<_, PipelineError>(probe_metadata(encoder, &watermarked).await?) })
            .await?;
        self.record(ctx, source, |i| i.metadata = Some(metadata.clone()))?;
        ctx.report(source, Stage::Metadata, &format!("{} {}s", metadata.resolution, metadata.duration_secs));

        let classification = self
            .stage(Stage::Classification, async {
                Ok::<_, PipelineError>(self.classify(item, &watermarked, &metadata).await)
            })
            .await?;
        self.record(ctx, source, |i| i.classification = Some(classification.clone()))?;
        ctx.report(
            source,
            Stage::Classification,
            &format!("{} ({}%)", classification.category, classification.confidence_percent()),
        );

        let thumbnail = self.scratch_path(&self.config.thumbnails_dir(), item, "jpg");
        artifacts.thumbnail = Some(thumbnail.clone());
        let options = ThumbnailOptions {
            offset_secs: Some(self.config.thumbnail_offset_secs),
            watermark: self.config.watermark.image().cloned(),
        };
        self.stage(Stage::Thumbnail, async {
            Ok::<_, PipelineError>(generate_thumbnail(encoder, source, &thumbnail, Some(source_meta.duration_exact), &options).await?)
        })
        .await?;
        ctx.report(source, Stage::Thumbnail, "Thumbnail ready");

        let request = PublishRequest {
            source_file_name: &item.file_name,
            metadata: &metadata,
            classification: &classification,
            video_path: &watermarked,
            thumbnail_path: &thumbnail,
        };
        let published = self.stage(Stage::Publish, self.publisher.publish(request)).await?;
        ctx.report(source, Stage::Publish, &published.asset_id);

        Ok(published)
    }

    async fn classify(&self, item: &QueueItem, video: &Path, metadata: &VideoMetadata) -> CategoryClassification {
        let request = ClassifyRequest::new(item.file_name.clone())
            .with_file_path(item.path.clone())
            .with_segments(item.path_segments.clone())
            .with_video(video, metadata.duration_exact);

        let classification = self.classifier.classify(&request).await;
        match item.category_override {
            Some(category) => {
                debug!(path = %item.path.display(), category = %category, "Applying folder override");
                apply_override(classification, category, &request)
            }
            None => classification,
        }
    }

    fn record<F>(&self, ctx: &ItemContext<'_>, path: &Path, f: F) -> Result<(), StageFailure>
    where
        F: FnOnce(&mut QueueItem),
    {
        ctx.queue.update(path, f).map_err(|e| StageFailure {
            stage: Stage::Finalize,
            error: e.into(),
        })
    }

    /// `<dir>/<stem>-<discovery millis>.<ext>`
    fn scratch_path(&self, dir: &Path, item: &QueueItem, extension: &str) -> PathBuf {
        dir.join(format!(
            "{}-{}.{}",
            item.stem(),
            item.discovered_at.timestamp_millis(),
            extension
        ))
    }

    async fn stage<T, F>(&self, stage: Stage, fut: F) -> Result<T, StageFailure>
    where
        F: Future<Output = WorkerResult<T>>,
    {
        let started = Instant::now();
        let timeout = self.config.stage_timeout;
        let result = tokio::time::timeout(timeout, fut).await;
        metrics::record_stage_duration(stage, started.elapsed().as_secs_f64());

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(StageFailure { stage, error }),
            Err(_) => Err(StageFailure {
                stage,
                error: PipelineError::StageTimeout {
                    stage,
                    secs: timeout.as_secs(),
                },
            }),
        }
    }
}
