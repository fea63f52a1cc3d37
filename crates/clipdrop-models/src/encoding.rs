//! Video encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "veryfast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 20;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Default pixel format
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Thumbnail output size (9:16)
pub const THUMBNAIL_WIDTH: u32 = 720;
pub const THUMBNAIL_HEIGHT: u32 = 1280;

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "veryfast", "medium")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec ("copy" to pass the source stream through)
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate, ignored when copying audio
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// H.264 profile (e.g. "baseline")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// H.264 level (e.g. "4.2"); left to the encoder when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Move the moov atom to the front for progressive playback
    #[serde(default)]
    pub faststart: bool,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            profile: None,
            level: None,
            faststart: true,
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadest playback compatibility: baseline profile, re-encoded AAC audio.
    ///
    /// No level is pinned; libx264 derives one from the frame size and rate,
    /// so 1080p and larger sources are not capped at a 720p-class level.
    pub fn compatibility() -> Self {
        Self {
            preset: "medium".to_string(),
            profile: Some("baseline".to_string()),
            ..Default::default()
        }
    }

    /// Re-encode video only; the audio stream is copied unchanged.
    pub fn fast() -> Self {
        Self {
            audio_codec: "copy".to_string(),
            ..Default::default()
        }
    }

    pub fn for_compatibility(compat: bool) -> Self {
        if compat {
            Self::compatibility()
        } else {
            Self::fast()
        }
    }

    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    pub fn copies_audio(&self) -> bool {
        self.audio_codec == "copy"
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
        ];

        if let Some(profile) = &self.profile {
            args.extend(["-profile:v".to_string(), profile.clone()]);
        }
        if let Some(level) = &self.level {
            args.extend(["-level".to_string(), level.clone()]);
        }

        args.extend(["-c:a".to_string(), self.audio_codec.clone()]);
        if !self.copies_audio() {
            args.extend(["-b:a".to_string(), self.audio_bitrate.clone()]);
        }

        if self.faststart {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }

        args.extend(self.extra_args.clone());

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncodingConfig::default();
        assert_eq!(config.codec, "libx264");
        assert_eq!(config.crf, 20);
    }

    #[test]
    fn test_compatibility_args() {
        let args = EncodingConfig::compatibility().to_ffmpeg_args();
        assert!(args.windows(2).any(|w| w == ["-profile:v", "baseline"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(args.contains(&"-b:a".to_string()));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "yuv420p"]));
    }

    #[test]
    fn test_compatibility_leaves_level_to_encoder() {
        let config = EncodingConfig::compatibility();
        assert_eq!(config.level, None);
        assert!(!config.to_ffmpeg_args().contains(&"-level".to_string()));

        let pinned = EncodingConfig {
            level: Some("4.2".to_string()),
            ..EncodingConfig::compatibility()
        };
        assert!(pinned.to_ffmpeg_args().windows(2).any(|w| w == ["-level", "4.2"]));
    }

    #[test]
    fn test_fast_copies_audio() {
        let config = EncodingConfig::fast();
        assert!(config.copies_audio());
        let args = config.to_ffmpeg_args();
        assert!(args.windows(2).any(|w| w == ["-c:a", "copy"]));
        assert!(!args.contains(&"-b:a".to_string()));
    }
}
