//! Raster snapshot of a run's log.
//!
//! No text is drawn: each line becomes a bar whose color encodes its
//! severity and whose length follows the line's character count.

use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

use super::{LogLine, Severity};

const BACKGROUND: Rgb<u8> = Rgb([16, 16, 16]);

/// Canvas geometry, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLayout {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    /// Vertical distance between the tops of consecutive rows.
    pub row_pitch: u32,
    pub bar_height: u32,
    /// Horizontal pixels per character of the rendered line.
    pub glyph_width: u32,
}

impl Default for ImageLayout {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            padding: 10,
            row_pitch: 20,
            bar_height: 12,
            glyph_width: 8,
        }
    }
}

impl ImageLayout {
    /// How many rows fit between the top and bottom padding.
    pub fn visible_rows(&self) -> usize {
        let usable = self.height.saturating_sub(2 * self.padding);
        if self.row_pitch == 0 || usable < self.bar_height {
            return 0;
        }
        ((usable - self.bar_height) / self.row_pitch + 1) as usize
    }
}

pub fn severity_color(severity: Severity) -> Rgb<u8> {
    match severity {
        Severity::Info => Rgb([255, 200, 0]),
        Severity::Ok => Rgb([0, 200, 0]),
        Severity::Error => Rgb([200, 0, 0]),
    }
}

/// Draw `lines` top to bottom; rows past the bottom padding are dropped.
pub fn render_log_image<'a>(
    lines: impl IntoIterator<Item = &'a LogLine>,
    layout: &ImageLayout,
) -> RgbImage {
    let mut img = RgbImage::from_pixel(layout.width, layout.height, BACKGROUND);
    let max_bar = layout.width.saturating_sub(2 * layout.padding);

    for (row, line) in lines.into_iter().take(layout.visible_rows()).enumerate() {
        let top = layout.padding + row as u32 * layout.row_pitch;
        let chars = line.to_string().chars().count() as u32;
        let bar_len = chars.saturating_mul(layout.glyph_width).min(max_bar);
        let color = severity_color(line.severity);

        for y in top..top + layout.bar_height {
            for x in layout.padding..layout.padding + bar_len {
                img.put_pixel(x, y, color);
            }
        }
    }

    img
}

/// Render `lines` and write the result to `path` as PNG.
pub fn save_log_image<'a>(
    lines: impl IntoIterator<Item = &'a LogLine>,
    path: &Path,
    layout: &ImageLayout,
) -> Result<()> {
    let img = render_log_image(lines, layout);
    img.save_with_format(path, ImageFormat::Png)?;
    debug!(path = %path.display(), "log image written");
    Ok(())
}
