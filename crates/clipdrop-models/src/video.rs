//! Probed video metadata.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata extracted from a video file by probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Duration rounded to the nearest second
    pub duration_secs: u32,

    /// Unrounded duration, used for frame sampling
    pub duration_exact: f64,

    /// "WIDTHxHEIGHT"
    pub resolution: String,

    pub width: u32,
    pub height: u32,

    /// Frames per second (0.0 when unknown)
    pub fps: f64,

    /// Bits per second (0 when unknown)
    pub bitrate: u64,

    /// Video codec name, e.g. "h264"
    pub codec: String,

    /// File size in bytes
    pub size_bytes: u64,

    /// Container format name as reported by the probe, e.g. "mov,mp4,m4a,3gp,3g2,mj2"
    pub format_name: String,
}

impl VideoMetadata {
    /// Build metadata, deriving the resolution string and rounded duration.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        duration: f64,
        width: u32,
        height: u32,
        fps: f64,
        bitrate: u64,
        codec: impl Into<String>,
        size_bytes: u64,
        format_name: impl Into<String>,
    ) -> Self {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        Self {
            duration_secs: duration.round() as u32,
            duration_exact: duration,
            resolution: format!("{}x{}", width, height),
            width,
            height,
            fps,
            bitrate,
            codec: codec.into(),
            size_bytes,
            format_name: format_name.into(),
        }
    }

    /// Numeric (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    /// Format parts reported by the probe ("mov,mp4,m4a" -> ["mov", "mp4", "m4a"]).
    pub fn format_parts(&self) -> impl Iterator<Item = &str> {
        self.format_name
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn resolution_tier(&self) -> ResolutionTier {
        ResolutionTier::from_dimensions(self.width, self.height)
    }

    /// Aspect ratio tag such as "9:16", reduced by the greatest common divisor
    /// and snapped to the common social formats when within 1%.
    pub fn aspect_tag(&self) -> String {
        if self.width == 0 || self.height == 0 {
            return "unknown".to_string();
        }

        const KNOWN: &[(u32, u32)] = &[(9, 16), (16, 9), (1, 1), (4, 5)];
        let ratio = self.width as f64 / self.height as f64;
        for (w, h) in KNOWN {
            let known = *w as f64 / *h as f64;
            if ((ratio - known) / known).abs() < 0.01 {
                return format!("{}:{}", w, h);
            }
        }

        let divisor = gcd(self.width, self.height);
        format!("{}:{}", self.width / divisor, self.height / divisor)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

/// Coarse resolution bucket used for tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ResolutionTier {
    #[serde(rename = "4K")]
    UltraHd,
    #[serde(rename = "Full HD")]
    FullHd,
    #[serde(rename = "HD")]
    Hd,
}

impl ResolutionTier {
    /// Tier is decided by the shorter side.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        let min_side = width.min(height);
        if min_side >= 2160 {
            ResolutionTier::UltraHd
        } else if min_side >= 1080 {
            ResolutionTier::FullHd
        } else {
            ResolutionTier::Hd
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::UltraHd => "4K",
            ResolutionTier::FullHd => "Full HD",
            ResolutionTier::Hd => "HD",
        }
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
