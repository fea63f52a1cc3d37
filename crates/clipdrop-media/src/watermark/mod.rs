//! Watermarking.
//!
//! Two pipeline modes, chosen by [`WatermarkConfig`]:
//!
//! - tiled text: a diagonal brick grid of `drawtext` cells ([`tiled`])
//! - full-frame image: the watermark stretched over the frame ([`image`])
//!
//! A third, corner-positioned image overlay backs the standalone CLI.
//! Every mode writes a new file and leaves the input untouched.

pub mod image;
pub mod tiled;

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use clipdrop_models::{EncodingConfig, VideoMetadata, WatermarkConfig};

use crate::command::FfmpegCommand;
use crate::encoder::Encoder;
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_metadata;

pub use image::{build_full_frame_filter, PositionedOverlay};
pub use tiled::{build_tiled_filter, row_shift, TileGrid};

/// Result of a successful watermark pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkOutcome {
    pub output_path: PathBuf,
}

/// Apply the configured watermark to `input`, writing `output`.
///
/// `source` is the already-probed metadata of `input`, if available.
pub async fn apply_watermark(
    encoder: &dyn Encoder,
    input: &Path,
    output: &Path,
    config: &WatermarkConfig,
    source: Option<&VideoMetadata>,
) -> MediaResult<WatermarkOutcome> {
    ensure_distinct(input, output)?;

    let cmd = match config {
        WatermarkConfig::TiledText(text) => {
            let filter = build_tiled_filter(text, source.map(VideoMetadata::dimensions))?;
            FfmpegCommand::new(input, output)
                .video_filter(filter)
                .output_args(EncodingConfig::fast().to_ffmpeg_args())
        }
        WatermarkConfig::FullFrameImage(image) => {
            if !image.image_path.exists() {
                return Err(MediaError::WatermarkAssetMissing(image.image_path.clone()));
            }

            let (width, height) = match source {
                Some(meta) => meta.dimensions(),
                None => probe_metadata(encoder, input).await?.dimensions(),
            };
            if width == 0 || height == 0 {
                return Err(MediaError::invalid_video(format!(
                    "Cannot watermark {}: source resolution is {}x{}",
                    input.display(),
                    width,
                    height
                )));
            }

            FfmpegCommand::new(input, output)
                .add_input(&image.image_path)
                .filter_complex(build_full_frame_filter(image.opacity))
                .map("[out]")
                .map("0:a?")
                .output_args(EncodingConfig::for_compatibility(image.compatibility).to_ffmpeg_args())
        }
    };

    info!(
        input = %input.display(),
        output = %output.display(),
        mode = config.mode_name(),
        "Applying watermark"
    );
    run_or_cleanup(encoder, &cmd, output).await?;

    Ok(WatermarkOutcome {
        output_path: output.to_path_buf(),
    })
}

/// Overlay `image` at a fixed position, writing `output`.
pub async fn apply_positioned_watermark(
    encoder: &dyn Encoder,
    input: &Path,
    output: &Path,
    image: &Path,
    overlay: &PositionedOverlay,
    encoding: &EncodingConfig,
) -> MediaResult<WatermarkOutcome> {
    ensure_distinct(input, output)?;
    if !image.exists() {
        return Err(MediaError::WatermarkAssetMissing(image.to_path_buf()));
    }

    let cmd = FfmpegCommand::new(input, output)
        .add_input(image)
        .filter_complex(overlay.build_filter())
        .map("[out]")
        .map("0:a?")
        .output_args(encoding.to_ffmpeg_args());

    info!(
        input = %input.display(),
        position = %overlay.position,
        opacity = overlay.opacity,
        "Applying positioned watermark"
    );
    run_or_cleanup(encoder, &cmd, output).await?;

    Ok(WatermarkOutcome {
        output_path: output.to_path_buf(),
    })
}

fn ensure_distinct(input: &Path, output: &Path) -> MediaResult<()> {
    if input == output {
        return Err(MediaError::internal(format!(
            "Watermark output must differ from input: {}",
            input.display()
        )));
    }
    Ok(())
}

/// Run the encode, removing any partial output on failure.
async fn run_or_cleanup(encoder: &dyn Encoder, cmd: &FfmpegCommand, output: &Path) -> MediaResult<()> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if let Err(e) = encoder.run(cmd).await {
        if let Err(rm) = tokio::fs::remove_file(output).await {
            if rm.kind() != std::io::ErrorKind::NotFound {
                warn!(output = %output.display(), error = %rm, "Failed to remove partial watermark output");
            }
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::FakeEncoder;
    use clipdrop_models::{ImageWatermark, TextWatermark};
    use tempfile::TempDir;

    fn meta(w: u32, h: u32) -> VideoMetadata {
        VideoMetadata::new(10.0, w, h, 30.0, 0, "h264", 1024, "mp4")
    }

    #[tokio::test]
    async fn test_tiled_text_copies_audio() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("wm").join("out.mp4");
        let fake = FakeEncoder::new();
        let config = WatermarkConfig::TiledText(TextWatermark::default());

        let outcome = apply_watermark(&fake, Path::new("/in.mp4"), &out, &config, Some(&meta(1080, 1920)))
            .await
            .unwrap();

        assert_eq!(outcome.output_path, out);
        let args = fake.commands()[0].build_args();
        assert!(args.windows(2).any(|w| w == ["-c:a", "copy"]));
        assert!(args.iter().any(|a| a.starts_with("drawtext=")));
    }

    #[tokio::test]
    async fn test_full_frame_image_compat_reencodes_audio() {
        let dir = TempDir::new().unwrap();
        let logo = dir.path().join("logo.png");
        tokio::fs::write(&logo, b"png").await.unwrap();
        let out = dir.path().join("out.mp4");
        let fake = FakeEncoder::new();
        let config = WatermarkConfig::FullFrameImage(ImageWatermark::new(&logo).with_compatibility(true));

        apply_watermark(&fake, Path::new("/in.mp4"), &out, &config, Some(&meta(1080, 1920)))
            .await
            .unwrap();

        let args = fake.commands()[0].build_args();
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(args.windows(2).any(|w| w == ["-profile:v", "baseline"]));
        assert!(args.iter().any(|a| a.contains("scale2ref")));
    }

    #[tokio::test]
    async fn test_zero_resolution_is_error() {
        let dir = TempDir::new().unwrap();
        let logo = dir.path().join("logo.png");
        tokio::fs::write(&logo, b"png").await.unwrap();
        let fake = FakeEncoder::new();
        let config = WatermarkConfig::FullFrameImage(ImageWatermark::new(&logo));

        let err = apply_watermark(&fake, Path::new("/in.mp4"), &dir.path().join("o.mp4"), &config, Some(&meta(0, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidVideo(_)));
        assert!(fake.commands().is_empty());
    }

    #[tokio::test]
    async fn test_missing_image_asset() {
        let fake = FakeEncoder::new();
        let config = WatermarkConfig::FullFrameImage(ImageWatermark::new("/nope/logo.png"));
        let err = apply_watermark(&fake, Path::new("/in.mp4"), Path::new("/out.mp4"), &config, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::WatermarkAssetMissing(_)));
    }

    #[tokio::test]
    async fn test_failed_encode_removes_partial_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("broken.mp4");
        tokio::fs::write(&out, b"partial").await.unwrap();
        let fake = FakeEncoder::new().fail_outputs_containing("broken");

        let result = apply_watermark(&fake, Path::new("/in.mp4"), &out, &WatermarkConfig::default(), None).await;
        assert!(result.is_err());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_output_must_differ_from_input() {
        let fake = FakeEncoder::new();
        let same = Path::new("/v/a.mp4");
        assert!(apply_watermark(&fake, same, same, &WatermarkConfig::default(), None).await.is_err());
    }
}
