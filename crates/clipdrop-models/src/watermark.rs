//! Watermark configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

pub const DEFAULT_WATERMARK_TEXT: &str = "ClipDrop";
pub const DEFAULT_OPACITY: f32 = 0.3;
pub const DEFAULT_FONT_SIZE: u32 = 36;
pub const DEFAULT_COLOR: &str = "white";
pub const DEFAULT_SPACING: u32 = 200;
pub const DEFAULT_ANGLE: f32 = 45.0;

/// Repeating diagonal text watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct TextWatermark {
    #[validate(length(min = 1))]
    pub text: String,

    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    #[validate(range(min = 1))]
    #[serde(default = "default_font_size")]
    pub font_size: u32,

    #[validate(length(min = 1))]
    #[serde(default = "default_color")]
    pub color: String,

    /// Grid pitch in pixels
    #[validate(range(min = 1))]
    #[serde(default = "default_spacing")]
    pub spacing: u32,

    /// Diagonal angle in degrees
    #[serde(default = "default_angle")]
    pub angle: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_file: Option<PathBuf>,
}

fn default_opacity() -> f32 {
    DEFAULT_OPACITY
}
fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}
fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}
fn default_spacing() -> u32 {
    DEFAULT_SPACING
}
fn default_angle() -> f32 {
    DEFAULT_ANGLE
}

impl Default for TextWatermark {
    fn default() -> Self {
        Self {
            text: DEFAULT_WATERMARK_TEXT.to_string(),
            opacity: DEFAULT_OPACITY,
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_COLOR.to_string(),
            spacing: DEFAULT_SPACING,
            angle: DEFAULT_ANGLE,
            font_file: None,
        }
    }
}

impl TextWatermark {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set opacity (clamped to 0.0-1.0).
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_spacing(mut self, spacing: u32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_font_size(mut self, size: u32) -> Self {
        self.font_size = size;
        self
    }
}

/// Image stretched over the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ImageWatermark {
    pub image_path: PathBuf,

    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    /// Re-encode audio and use a widely compatible H.264 profile
    #[serde(default)]
    pub compatibility: bool,
}

impl ImageWatermark {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            opacity: DEFAULT_OPACITY,
            compatibility: false,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_compatibility(mut self, compatibility: bool) -> Self {
        self.compatibility = compatibility;
        self
    }
}

/// Watermarking mode for one pipeline instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WatermarkConfig {
    TiledText(TextWatermark),
    FullFrameImage(ImageWatermark),
}

impl WatermarkConfig {
    /// Image mode wins whenever an image path is configured.
    pub fn select(image_path: Option<PathBuf>, text: TextWatermark, opacity: f32, compatibility: bool) -> Self {
        match image_path {
            Some(path) => WatermarkConfig::FullFrameImage(
                ImageWatermark::new(path)
                    .with_opacity(opacity)
                    .with_compatibility(compatibility),
            ),
            None => WatermarkConfig::TiledText(text),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            WatermarkConfig::TiledText(t) => t.validate(),
            WatermarkConfig::FullFrameImage(i) => i.validate(),
        }
    }

    pub fn image(&self) -> Option<&ImageWatermark> {
        match self {
            WatermarkConfig::FullFrameImage(i) => Some(i),
            WatermarkConfig::TiledText(_) => None,
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            WatermarkConfig::TiledText(_) => "tiled_text",
            WatermarkConfig::FullFrameImage(_) => "full_frame_image",
        }
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        WatermarkConfig::TiledText(TextWatermark::default())
    }
}

/// Corner placement for positioned overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl WatermarkPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatermarkPosition::TopLeft => "top-left",
            WatermarkPosition::TopRight => "top-right",
            WatermarkPosition::BottomLeft => "bottom-left",
            WatermarkPosition::BottomRight => "bottom-right",
            WatermarkPosition::Center => "center",
        }
    }
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WatermarkPosition {
    type Err = PositionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "top-left" => Ok(WatermarkPosition::TopLeft),
            "top-right" => Ok(WatermarkPosition::TopRight),
            "bottom-left" => Ok(WatermarkPosition::BottomLeft),
            "bottom-right" => Ok(WatermarkPosition::BottomRight),
            "center" | "centre" => Ok(WatermarkPosition::Center),
            _ => Err(PositionParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown watermark position: {0}")]
pub struct PositionParseError(String);
