//! Thumbnail generation.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use clipdrop_models::{ImageWatermark, THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH};

use crate::command::FfmpegCommand;
use crate::encoder::Encoder;
use crate::error::{MediaError, MediaResult};
use crate::watermark::build_full_frame_filter;

/// Default seek offset into the clip.
pub const DEFAULT_THUMBNAIL_OFFSET_SECS: f64 = 2.0;

/// Thumbnail options.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailOptions {
    /// Seek offset; `None` uses [`DEFAULT_THUMBNAIL_OFFSET_SECS`]
    pub offset_secs: Option<f64>,
    /// Composite this image over the frame
    pub watermark: Option<ImageWatermark>,
}

/// Seek offset, clamped to half the duration for very short clips.
pub fn effective_offset(requested: f64, duration: Option<f64>) -> f64 {
    let requested = requested.max(0.0);
    match duration {
        Some(d) if d > 0.0 => requested.min(d / 2.0),
        _ => requested,
    }
}

/// Scale to cover 9:16 then center-crop.
pub fn portrait_crop_filter() -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
        w = THUMBNAIL_WIDTH,
        h = THUMBNAIL_HEIGHT
    )
}

/// Generate a 9:16 JPEG thumbnail at `output_path`.
pub async fn generate_thumbnail(
    encoder: &dyn Encoder,
    video_path: &Path,
    output_path: &Path,
    duration: Option<f64>,
    options: &ThumbnailOptions,
) -> MediaResult<PathBuf> {
    let offset = effective_offset(
        options.offset_secs.unwrap_or(DEFAULT_THUMBNAIL_OFFSET_SECS),
        duration,
    );

    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let Some(watermark) = &options.watermark else {
        extract_frame(encoder, video_path, output_path, offset).await?;
        return Ok(output_path.to_path_buf());
    };

    if !watermark.image_path.exists() {
        return Err(MediaError::WatermarkAssetMissing(watermark.image_path.clone()));
    }

    let intermediate = output_path.with_extension("raw.jpg");
    let result = async {
        extract_frame(encoder, video_path, &intermediate, offset).await?;

        let composite = FfmpegCommand::new(&intermediate, output_path)
            .add_input(&watermark.image_path)
            .filter_complex(build_full_frame_filter(watermark.opacity))
            .map("[out]")
            .single_frame()
            .image_quality(2);
        encoder.run(&composite).await
    }
    .await;

    if let Err(e) = tokio::fs::remove_file(&intermediate).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %intermediate.display(), error = %e, "Failed to remove intermediate thumbnail");
        }
    }

    result?;
    Ok(output_path.to_path_buf())
}

async fn extract_frame(encoder: &dyn Encoder, video_path: &Path, output: &Path, offset: f64) -> MediaResult<()> {
    debug!(video = %video_path.display(), offset, "Extracting thumbnail frame");
    let cmd = FfmpegCommand::new(video_path, output)
        .seek(offset)
        .single_frame()
        .video_filter(portrait_crop_filter())
        .image_quality(2);
    encoder.run(&cmd).await
}
