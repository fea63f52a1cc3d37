//! Standalone watermarking tool.
//!
//! Stamps a positioned image watermark onto one video or every supported
//! video in a directory, optionally emitting a thumbnail per output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info};

use clipdrop_media::{
    apply_positioned_watermark, generate_thumbnail, Encoder, FfmpegEncoder, PositionedOverlay, ThumbnailOptions,
};
use clipdrop_models::{EncodingConfig, WatermarkPosition};
use clipdrop_worker::{init_tracing, is_supported_video};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Apply a positioned image watermark to videos",
    long_about = "Watermarks a single video or every supported video in a directory using ffmpeg."
)]
struct WatermarkArgs {
    /// Input video file or directory of videos
    #[arg(required = true, value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Directory where watermarked files are written
    #[arg(required = true, value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Watermark image (PNG with alpha works best)
    #[arg(short, long, value_name = "IMAGE")]
    image: PathBuf,

    /// top-left, top-right, bottom-left, bottom-right or center
    #[arg(short, long, default_value = "bottom-right")]
    position: WatermarkPosition,

    /// Watermark opacity between 0 and 1
    #[arg(long, default_value_t = 0.7)]
    opacity: f32,

    /// Watermark width as a fraction of the video width
    #[arg(long, default_value_t = 0.15)]
    size_ratio: f32,

    /// Also write a thumbnail taken at this many seconds
    #[arg(long, value_name = "SECONDS")]
    thumbnail_at: Option<f64>,

    /// Re-encode audio and use a baseline H.264 profile
    #[arg(long)]
    compat: bool,

    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    #[arg(long, default_value = "ffprobe")]
    ffprobe: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = WatermarkArgs::parse();
    run(args).await
}

async fn run(args: WatermarkArgs) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&args.opacity) {
        bail!("--opacity must be between 0 and 1, got {}", args.opacity);
    }
    if !(args.size_ratio > 0.0 && args.size_ratio <= 1.0) {
        bail!("--size-ratio must be in (0, 1], got {}", args.size_ratio);
    }
    if !args.image.is_file() {
        bail!("Watermark image not found: {}", args.image.display());
    }

    let inputs = collect_inputs(&args.input_path).await?;
    if inputs.is_empty() {
        bail!("No supported videos found in {}", args.input_path.display());
    }

    let ffmpeg = FfmpegEncoder::new(&args.ffmpeg, &args.ffprobe);
    ffmpeg.check()?;
    let encoder: Arc<dyn Encoder> = Arc::new(ffmpeg);

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let overlay = PositionedOverlay::default()
        .with_position(args.position)
        .with_opacity(args.opacity)
        .with_size_ratio(args.size_ratio);
    let encoding = EncodingConfig::for_compatibility(args.compat);

    let mut failures = 0usize;
    for input in &inputs {
        match process_one(encoder.as_ref(), input, &args, &overlay, &encoding).await {
            Ok(output) => info!(input = %input.display(), output = %output.display(), "Watermarked"),
            Err(e) => {
                error!(input = %input.display(), "Failed: {:#}", e);
                failures += 1;
            }
        }
    }

    info!(total = inputs.len(), failures, "Done");
    if failures > 0 {
        bail!("{} of {} videos failed", failures, inputs.len());
    }
    Ok(())
}

async fn process_one(
    encoder: &dyn Encoder,
    input: &Path,
    args: &WatermarkArgs,
    overlay: &PositionedOverlay,
    encoding: &EncodingConfig,
) -> anyhow::Result<PathBuf> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .context("Input has no file name")?;
    let output = args.output_dir.join(format!("{}_watermarked.mp4", stem));

    apply_positioned_watermark(encoder, input, &output, &args.image, overlay, encoding).await?;

    if let Some(at) = args.thumbnail_at {
        let thumbnail = args.output_dir.join(format!("{}_thumb.jpg", stem));
        let options = ThumbnailOptions {
            offset_secs: Some(at),
            watermark: None,
        };
        generate_thumbnail(encoder, &output, &thumbnail, None, &options).await?;
    }
    Ok(output)
}

/// A single file, or the supported videos directly inside a directory.
async fn collect_inputs(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let metadata = tokio::fs::metadata(input)
        .await
        .with_context(|| format!("Cannot read input {}", input.display()))?;

    if metadata.is_file() {
        if !is_supported_video(input) {
            bail!("Unsupported video type: {}", input.display());
        }
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(input).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && is_supported_video(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
