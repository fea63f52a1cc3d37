//! Image watermark filter graphs: full-frame and corner-positioned.

use clipdrop_models::WatermarkPosition;

/// Default margin from the frame edge for positioned overlays.
pub const DEFAULT_MARGIN: u32 = 20;

/// Default watermark width as a fraction of the frame width.
pub const DEFAULT_SIZE_RATIO: f32 = 0.15;

/// Alpha stage shared by every overlay: nothing is added at full opacity.
fn alpha_chain(input: &str, output: &str, opacity: f32) -> String {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity < 1.0 {
        format!("[{}]format=rgba,colorchannelmixer=aa={:.2}[{}]", input, opacity, output)
    } else {
        format!("[{}]format=rgba[{}]", input, output)
    }
}

/// Stretch input 1 over input 0 at `opacity`. Output label: `[out]`.
pub fn build_full_frame_filter(opacity: f32) -> String {
    format!(
        "[1:v][0:v]scale2ref=w=main_w:h=main_h[wm][base];{};[base][wma]overlay=0:0:format=auto[out]",
        alpha_chain("wm", "wma", opacity)
    )
}

/// Positioned overlay (input 1 over input 0), scaled to `size_ratio` of the frame width.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedOverlay {
    pub position: WatermarkPosition,
    pub opacity: f32,
    pub size_ratio: f32,
    pub margin: u32,
}

impl Default for PositionedOverlay {
    fn default() -> Self {
        Self {
            position: WatermarkPosition::default(),
            opacity: 0.7,
            size_ratio: DEFAULT_SIZE_RATIO,
            margin: DEFAULT_MARGIN,
        }
    }
}

impl PositionedOverlay {
    pub fn with_position(mut self, position: WatermarkPosition) -> Self {
        self.position = position;
        self
    }

    /// Set watermark opacity (0.0 = invisible, 1.0 = fully opaque).
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Set the watermark width relative to the frame (0.01-1.0).
    pub fn with_size_ratio(mut self, ratio: f32) -> Self {
        self.size_ratio = ratio.clamp(0.01, 1.0);
        self
    }

    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    fn coordinates(&self) -> String {
        let m = self.margin;
        match self.position {
            WatermarkPosition::TopLeft => format!("{m}:{m}"),
            WatermarkPosition::TopRight => format!("W-w-{m}:{m}"),
            WatermarkPosition::BottomLeft => format!("{m}:H-h-{m}"),
            WatermarkPosition::BottomRight => format!("W-w-{m}:H-h-{m}"),
            WatermarkPosition::Center => "(W-w)/2:(H-h)/2".to_string(),
        }
    }

    /// Output label: `[out]`.
    pub fn build_filter(&self) -> String {
        format!(
            "[1:v][0:v]scale2ref=w=main_w*{:.3}:h=ow/a[wm][base];{};[base][wma]overlay={}:format=auto[out]",
            self.size_ratio,
            alpha_chain("wm", "wma", self.opacity),
            self.coordinates()
        )
    }
}
