//! Ingestion worker binary.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use clipdrop_catalog::{FirestoreClient, VideoAssetRepository};
use clipdrop_classifier::{CategoryClassifier, OrtImageClassifier};
use clipdrop_media::{Encoder, FfmpegEncoder};
use clipdrop_queue::{IngestionQueue, ProgressChannel};
use clipdrop_storage::R2Client;
use clipdrop_worker::metrics::init_metrics;
use clipdrop_worker::{
    init_tracing, DirectoryWatcher, Intake, ItemPipeline, Publisher, QueueWorker, WorkerConfig,
};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider was already installed");
    }

    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting clipdrop-worker");

    if let Err(e) = run().await {
        error!("Worker error: {:#}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

async fn run() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?
        .prepare_directories()
        .await
        .context("Failed to create working directories")?;
    info!("Worker config: {:?}", config);

    if let Some(port) = config.metrics_port {
        init_metrics(port).context("Failed to start metrics exporter")?;
        info!(port, "Serving Prometheus metrics");
    }

    let ffmpeg = FfmpegEncoder::new(&config.ffmpeg_path, &config.ffprobe_path)
        .with_timeout(config.stage_timeout.as_secs());
    let (ffmpeg_bin, ffprobe_bin) = ffmpeg.check()?;
    info!(ffmpeg = %ffmpeg_bin.display(), ffprobe = %ffprobe_bin.display(), "Encoder available");
    let encoder: Arc<dyn Encoder> = Arc::new(ffmpeg);

    let mut classifier = CategoryClassifier::new(Arc::clone(&encoder), config.frames_dir());
    if let Some(model_config) = config.classifier_config() {
        let model_path = model_config.model_path.clone();
        match tokio::task::spawn_blocking(move || OrtImageClassifier::load(model_config)).await? {
            Ok(model) => {
                info!(model = %model_path.display(), "Loaded image classifier");
                classifier = classifier.with_model(Arc::new(model));
            }
            Err(e) => warn!(
                model = %model_path.display(),
                error = %e,
                "Image classifier unavailable, using filename classification only"
            ),
        }
    }

    let store = R2Client::from_env().await.context("Failed to create storage client")?;
    let firestore = FirestoreClient::from_env().await.context("Failed to create catalog client")?;
    let publisher = Publisher::new(Arc::new(store), Arc::new(VideoAssetRepository::new(firestore)));

    let config = Arc::new(config);
    let queue = Arc::new(IngestionQueue::new());
    let progress = ProgressChannel::default();
    spawn_event_log(&progress);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pipeline = ItemPipeline::new(Arc::clone(&config), encoder, Arc::new(classifier), publisher);
    let worker = Arc::new(
        QueueWorker::new(Arc::clone(&config), Arc::clone(&queue), progress.clone(), pipeline)
            .with_shutdown(shutdown_rx),
    );

    let intake = Intake::new(Arc::clone(&config), queue, progress);
    let mut watcher = DirectoryWatcher::new(intake, worker.notifier());
    let existing = watcher.start_and_scan().await?;
    info!(existing, "Initial scan queued existing files");

    let worker_handle = tokio::spawn(Arc::clone(&worker).run());

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    watcher.stop();
    shutdown_tx.send(true).ok();
    if worker.is_draining() {
        info!("Waiting for the current item to finish");
    }
    worker_handle.await?;
    Ok(())
}

/// Mirror pipeline events into the debug log.
fn spawn_event_log(progress: &ProgressChannel) {
    let mut rx = progress.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => debug!(event = %json, "Pipeline event"),
                    Err(e) => warn!(error = %e, "Failed to serialize pipeline event"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Event log fell behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
