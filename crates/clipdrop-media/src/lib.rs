//! FFmpeg CLI wrapper for the ingestion pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a deadline-bounded runner
//! - The [`Encoder`] seam with an FFmpeg-backed implementation
//! - Probe parsing into [`clipdrop_models::VideoMetadata`]
//! - Acceptance rules for incoming clips
//! - Tiled-text and image watermarking
//! - Thumbnail extraction and frame sampling

pub mod command;
pub mod encoder;
pub mod error;
pub mod frames;
pub mod fs_utils;
pub mod probe;
mod progress;
pub mod thumbnail;
pub mod validation;
pub mod watermark;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
#[cfg(any(test, feature = "test-util"))]
pub use encoder::FakeEncoder;
pub use encoder::{Encoder, FfmpegEncoder};
pub use error::{MediaError, MediaResult};
pub use frames::{extract_frames, remove_frames, sample_timestamps, DEFAULT_SAMPLE_COUNT};
pub use fs_utils::{move_file, move_into_dir, remove_if_exists};
pub use probe::{parse_frame_rate, probe_metadata, video_metadata_from_probe, FfprobeOutput};
pub use thumbnail::{generate_thumbnail, ThumbnailOptions, DEFAULT_THUMBNAIL_OFFSET_SECS};
pub use validation::{validate_video, ValidationReport};
pub use watermark::{apply_positioned_watermark, apply_watermark, PositionedOverlay, WatermarkOutcome};
