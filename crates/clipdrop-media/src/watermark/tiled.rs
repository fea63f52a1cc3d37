//! Tiled diagonal text watermark.

use std::ops::RangeInclusive;

use clipdrop_models::TextWatermark;

use crate::command::escape_filter_value;
use crate::error::{MediaError, MediaResult};

pub const DEFAULT_ROWS: RangeInclusive<i32> = -5..=15;
pub const DEFAULT_COLS: RangeInclusive<i32> = -5..=20;

pub const MAX_ANGLE_DEG: f32 = 60.0;

/// Upper bound on drawtext instances in one graph.
pub const MAX_TILE_CELLS: usize = 5_000;

/// Grid of text cells, in units of the spacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    pub rows: RangeInclusive<i32>,
    pub cols: RangeInclusive<i32>,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
        }
    }
}

/// Horizontal shift per row, in pixels. 45 degrees gives half the spacing.
pub fn row_shift(spacing: u32, angle_deg: f32) -> f64 {
    let angle = angle_deg.clamp(0.0, MAX_ANGLE_DEG) as f64;
    (spacing as f64 / 2.0) * angle.to_radians().tan()
}

impl TileGrid {
    /// Default bounds, extended (never shrunk) until they cover the frame.
    pub fn for_frame(width: u32, height: u32, spacing: u32, shift: f64) -> Self {
        let s = spacing.max(1) as f64;
        let visible_rows = (height as f64 / s).ceil() as i32;
        let needed_cols = (width as f64 / s).ceil() as i32;
        let left_reach = -((visible_rows as f64 * shift / s).ceil() as i32);

        Self {
            rows: *DEFAULT_ROWS.start()..=(*DEFAULT_ROWS.end()).max(visible_rows),
            cols: (*DEFAULT_COLS.start()).min(left_reach)..=(*DEFAULT_COLS.end()).max(needed_cols),
        }
    }

    /// True when every pixel of a `width`x`height` frame lies inside some row's span.
    pub fn covers(&self, width: u32, height: u32, spacing: u32, shift: f64) -> bool {
        let s = spacing.max(1) as f64;
        let last_visible_row = ((height as f64 / s).ceil() as i32).min(*self.rows.end());

        *self.rows.start() <= 0
            && *self.rows.end() as f64 * s >= height as f64
            && *self.cols.start() as f64 * s + last_visible_row as f64 * shift <= 1e-6
            && *self.cols.end() as f64 * s >= width as f64
    }

    pub fn cell_count(&self) -> usize {
        let rows = (self.rows.end() - self.rows.start() + 1).max(0) as usize;
        let cols = (self.cols.end() - self.cols.start() + 1).max(0) as usize;
        rows * cols
    }
}

/// Build the drawtext chain for a tiled watermark.
///
/// `frame` is the source resolution when known; it only ever enlarges the grid.
pub fn build_tiled_filter(config: &TextWatermark, frame: Option<(u32, u32)>) -> MediaResult<String> {
    let spacing = config.spacing.max(1);
    let shift = row_shift(spacing, config.angle);
    let grid = match frame {
        Some((w, h)) if w > 0 && h > 0 => TileGrid::for_frame(w, h, spacing, shift),
        _ => TileGrid::default(),
    };

    let cells = grid.cell_count();
    if cells > MAX_TILE_CELLS {
        return Err(MediaError::TooManyTiles {
            cells,
            limit: MAX_TILE_CELLS,
        });
    }

    let text = escape_filter_value(&config.text);
    let font = config
        .font_file
        .as_ref()
        .map(|f| format!(":fontfile={}", escape_filter_value(&f.to_string_lossy())))
        .unwrap_or_default();
    let style = format!(
        "text={}{}:fontsize={}:fontcolor={}@{:.2}:expansion=none",
        text,
        font,
        config.font_size,
        config.color,
        config.opacity.clamp(0.0, 1.0)
    );

    let mut filters = Vec::with_capacity(cells);
    for row in grid.rows.clone() {
        let y = row as i64 * spacing as i64;
        let offset = (row as f64 * shift).round() as i64;
        for col in grid.cols.clone() {
            let x = col as i64 * spacing as i64 + offset;
            filters.push(format!("drawtext={}:x={}:y={}", style, x, y));
        }
    }

    Ok(filters.join(","))
}
