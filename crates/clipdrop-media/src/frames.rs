//! Evenly spaced frame sampling for image classification.

use std::path::{Path, PathBuf};

use crate::command::FfmpegCommand;
use crate::encoder::Encoder;
use crate::error::{MediaError, MediaResult};

pub const DEFAULT_SAMPLE_COUNT: usize = 3;

/// `n` timestamps at `duration/(n+1) * i` for `i = 1..=n`.
pub fn sample_timestamps(duration: f64, n: usize) -> Vec<f64> {
    if n == 0 || !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }
    let step = duration / (n as f64 + 1.0);
    (1..=n).map(|i| step * i as f64).collect()
}

/// Extract `n` JPEG frames into `out_dir`, named `<prefix>_<i>.jpg`.
pub async fn extract_frames(
    encoder: &dyn Encoder,
    video_path: &Path,
    out_dir: &Path,
    prefix: &str,
    duration: f64,
    n: usize,
) -> MediaResult<Vec<PathBuf>> {
    let timestamps = sample_timestamps(duration, n);
    if timestamps.is_empty() {
        return Err(MediaError::invalid_video(format!(
            "Cannot sample frames from {}: duration {:.2}s",
            video_path.display(),
            duration
        )));
    }

    tokio::fs::create_dir_all(out_dir).await?;

    let mut frames = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.into_iter().enumerate() {
        let frame = out_dir.join(format!("{}_{}.jpg", prefix, i + 1));
        let cmd = FfmpegCommand::new(video_path, &frame)
            .seek(ts)
            .single_frame()
            .image_quality(3);

        if let Err(e) = encoder.run(&cmd).await {
            remove_frames(&frames).await;
            return Err(e);
        }
        frames.push(frame);
    }

    Ok(frames)
}

/// Best-effort removal of sampled frames.
pub async fn remove_frames(frames: &[PathBuf]) {
    for frame in frames {
        let _ = tokio::fs::remove_file(frame).await;
    }
}
