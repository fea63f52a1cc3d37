use std::path::Path;

use clipdrop_catalog::FirestoreConfig;
use clipdrop_media::{check_ffmpeg, check_ffprobe};
use clipdrop_storage::R2Config;
use clipdrop_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env()?;

    println!(
        "clipdrop-selfcheck: watch_root={} work_dir={}",
        config.watch_root.display(),
        config.work_dir.display()
    );

    let ffmpeg = check_ffmpeg(&config.ffmpeg_path)?;
    let ffprobe = check_ffprobe(&config.ffprobe_path)?;
    println!("clipdrop-selfcheck: ffmpeg={} ffprobe={}", ffmpeg.display(), ffprobe.display());

    let config = config.prepare_directories().await?;
    println!("clipdrop-selfcheck: {} directories ready", config.directories().len());

    if let Some(image) = config.watermark.image() {
        ensure_file("watermark image", &image.image_path)?;
    }
    if let Some(model) = config.classifier_config() {
        ensure_file("classifier model", &model.model_path)?;
        ensure_file("classifier labels", &model.labels_path)?;
    }

    let r2 = R2Config::from_env()?;
    println!("clipdrop-selfcheck: bucket={} public_base={}", r2.bucket_name, r2.public_base_url);
    let firestore = FirestoreConfig::from_env()?;
    println!(
        "clipdrop-selfcheck: project={} collection={}",
        firestore.project_id, firestore.collection
    );

    println!("clipdrop-selfcheck: ok");
    Ok(())
}

fn ensure_file(what: &str, path: &Path) -> anyhow::Result<()> {
    if !path.is_file() {
        return Err(anyhow::anyhow!("{} not found at {}", what, path.display()));
    }
    Ok(())
}
