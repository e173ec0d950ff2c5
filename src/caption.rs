//! Caption rasterization
//!
//! A caption is drawn once into an RGBA raster sized to the text's measured
//! ink bounds. The raster is as wide as the text advance and as tall as the
//! ascent plus descent plus a fixed padding; the text sits on a baseline
//! `descent` pixels above the bottom edge, leaving the padding on top.

use egui::epaint::text::Fonts;
use egui::{Color32, FontDefinitions, FontId};
use log::debug;

/// Extra rows added above the ink bounds
pub const CAPTION_PADDING_PX: f32 = 8.0;

/// Canvas-style text measurement, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    /// Advance width of the whole string
    pub width: f32,
    /// Distance from the baseline up to the highest ink
    pub ascent: f32,
    /// Distance from the baseline down to the lowest ink
    pub descent: f32,
}

/// Source of text measurement and glyph coverage
pub trait TextRenderer {
    fn measure(&self, text: &str, font_px: f32) -> TextMetrics;

    /// Draw `text` into `raster` with its baseline at `baseline_y`, starting at x = 0
    fn fill_text(&self, text: &str, font_px: f32, raster: &mut CaptionRaster, baseline_y: f32);
}

/// Straight-alpha RGBA8 image, rows top to bottom
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionRaster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl CaptionRaster {
    /// Fully transparent raster
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Height over width, the caption plane's aspect
    pub fn aspect(&self) -> f32 {
        self.height as f32 / self.width as f32
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.pixels[(y as usize * self.width as usize + x as usize) * 4 + 3]
    }

    /// Blend white coverage into one pixel, keeping the strongest alpha
    pub fn cover(&mut self, x: i32, y: i32, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let alpha = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
        if alpha > self.pixels[idx + 3] {
            self.pixels[idx..idx + 4].copy_from_slice(&[255, 255, 255, alpha]);
        }
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|p| p[3] == 0)
    }
}

/// Rasterize a caption sized to its measured bounds.
///
/// Width is the truncated advance width and height the truncated
/// `ascent + descent + CAPTION_PADDING_PX`. Both are clamped to at least one
/// pixel so an empty caption still yields a texture.
pub fn render_caption<R: TextRenderer + ?Sized>(renderer: &R, text: &str, font_px: f32) -> CaptionRaster {
    let metrics = renderer.measure(text, font_px);
    let width = (metrics.width as u32).max(1);
    let height = ((metrics.ascent + metrics.descent + CAPTION_PADDING_PX) as u32).max(1);

    let mut raster = CaptionRaster::new(width, height);
    renderer.fill_text(text, font_px, &mut raster, height as f32 - metrics.descent);

    debug!(
        "Caption {:?}: {}x{} (advance {:.2}, ascent {:.2}, descent {:.2})",
        text, width, height, metrics.width, metrics.ascent, metrics.descent
    );
    raster
}

/// Text renderer backed by egui's built-in fonts (proportional family)
pub struct EguiTextRenderer {
    fonts: Fonts,
}

impl EguiTextRenderer {
    const MAX_TEXTURE_SIDE: usize = 4096;

    pub fn new() -> Self {
        Self {
            fonts: Fonts::new(1.0, Self::MAX_TEXTURE_SIDE, FontDefinitions::default()),
        }
    }

    /// Advance width and glyph bitmaps of the laid-out string, vertical
    /// positions relative to the first glyph's baseline
    fn glyph_boxes(&self, text: &str, font_px: f32) -> (f32, Vec<GlyphBox>) {
        let galley = self
            .fonts
            .layout_no_wrap(text.to_owned(), FontId::proportional(font_px), Color32::WHITE);

        let mut baseline = None;
        let mut boxes = Vec::new();
        for row in &galley.rows {
            for glyph in &row.glyphs {
                let baseline_y = *baseline.get_or_insert(glyph.pos.y);
                let uv = &glyph.uv_rect;
                if uv.max[0] <= uv.min[0] || uv.max[1] <= uv.min[1] {
                    continue;
                }
                boxes.push(GlyphBox {
                    left: glyph.pos.x + uv.offset.x,
                    top: glyph.pos.y + uv.offset.y - baseline_y,
                    height: uv.size.y,
                    atlas_min: uv.min,
                    atlas_max: uv.max,
                });
            }
        }
        (galley.size().x, boxes)
    }
}

impl Default for EguiTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

struct GlyphBox {
    left: f32,
    /// Top edge relative to the baseline (negative above it)
    top: f32,
    height: f32,
    atlas_min: [u16; 2],
    atlas_max: [u16; 2],
}

impl TextRenderer for EguiTextRenderer {
    fn measure(&self, text: &str, font_px: f32) -> TextMetrics {
        let (width, boxes) = self.glyph_boxes(text, font_px);
        if boxes.is_empty() {
            return TextMetrics { width, ascent: 0.0, descent: 0.0 };
        }
        let ink_top = boxes.iter().map(|b| b.top).fold(f32::INFINITY, f32::min);
        let ink_bottom = boxes.iter().map(|b| b.top + b.height).fold(f32::NEG_INFINITY, f32::max);
        TextMetrics {
            width,
            ascent: -ink_top,
            descent: ink_bottom,
        }
    }

    fn fill_text(&self, text: &str, font_px: f32, raster: &mut CaptionRaster, baseline_y: f32) {
        let (_, boxes) = self.glyph_boxes(text, font_px);
        // Layout populates the atlas, so read it afterwards
        let atlas = self.fonts.image();
        let atlas_width = atlas.size[0];

        for glyph in boxes {
            let x0 = glyph.left.round() as i32;
            let y0 = (baseline_y + glyph.top).round() as i32;
            let [min_x, min_y] = glyph.atlas_min;
            let [max_x, max_y] = glyph.atlas_max;
            for ay in min_y..max_y {
                for ax in min_x..max_x {
                    let coverage = atlas.pixels[ay as usize * atlas_width + ax as usize];
                    if coverage > 0.0 {
                        raster.cover(x0 + (ax - min_x) as i32, y0 + (ay - min_y) as i32, coverage);
                    }
                }
            }
        }
    }
}
