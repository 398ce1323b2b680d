use std::path::Path;

use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};

use crate::canvas::{Color, PixelBuffer};
use crate::error::{EditorError, EditorResult};

/// Per-character advance, as a fraction of the font size, when no font is loaded.
pub const FALLBACK_ADVANCE: f32 = 0.6;

/// Load a TTF/OTF file.
pub fn load_font(path: &Path) -> EditorResult<FontArc> {
    let bytes = std::fs::read(path)?;
    font_from_bytes(bytes)
}

pub fn font_from_bytes(bytes: Vec<u8>) -> EditorResult<FontArc> {
    FontArc::try_from_vec(bytes).map_err(|e| EditorError::Font(e.to_string()))
}

/// Lay out a single line, left-aligned at x = 0.
/// Returns `(glyphs with their pen x, total_width)`.
pub fn layout_text(font: &FontArc, text: &str, font_size: f32) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(font_size);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    (glyphs, cursor_x)
}

/// Advance width of `text`.
pub fn measure_text(font: Option<&FontArc>, text: &str, font_size: f32) -> f32 {
    match font {
        Some(f) => layout_text(f, text, font_size).1,
        None => text.chars().count() as f32 * font_size * FALLBACK_ADVANCE,
    }
}

/// A placed text overlay.  `(x, y)` is the left end of the baseline.
#[derive(Clone, Debug, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub color: Color,
    /// Measured when the item is placed.
    pub width: f32,
}

impl TextItem {
    pub fn new(
        text: impl Into<String>,
        x: f32,
        y: f32,
        font_size: f32,
        color: Color,
        font: Option<&FontArc>,
    ) -> Self {
        let text = text.into();
        let font_size = font_size.max(1.0);
        let width = measure_text(font, &text, font_size);
        Self { text, x, y, font_size, color, width }
    }

    /// Hit box `[x, x + width] × [y − font_size, y]`, inclusive.
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y - self.font_size && py <= self.y
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    pub fn anchor(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Draw the glyphs over `target`.  Without a font there is nothing to draw.
    pub fn draw(&self, target: &mut PixelBuffer, font: Option<&FontArc>) {
        let Some(font) = font else {
            return;
        };
        let (glyphs, _) = layout_text(font, &self.text, self.font_size);
        for (glyph_id, gx) in glyphs {
            let glyph = glyph_id.with_scale_and_position(
                self.font_size,
                point(self.x + gx, self.y),
            );
            if let Some(outlined) = font.outline_glyph(glyph) {
                let b = outlined.px_bounds();
                let (bx, by) = (b.min.x as i32, b.min.y as i32);
                outlined.draw(|px, py, cov| {
                    target.blend_pixel(bx + px as i32, by + py as i32, self.color, cov);
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_measure_scales_with_length() {
        assert!((measure_text(None, "abcd", 10.0) - 24.0).abs() < 1e-4);
        assert_eq!(measure_text(None, "", 10.0), 0.0);
    }

    #[test]
    fn hit_box_sits_above_baseline() {
        let t = TextItem::new("hello", 10.0, 50.0, 20.0, [0, 0, 0, 255], None);
        assert!((t.width - 60.0).abs() < 1e-4);
        assert!(t.contains_point(10.0, 30.0));
        assert!(t.contains_point(69.9, 50.0));
        assert!(!t.contains_point(70.5, 40.0));
        assert!(!t.contains_point(20.0, 51.0));
    }

    #[test]
    fn drawing_without_font_is_a_noop() {
        let t = TextItem::new("x", 0.0, 5.0, 5.0, [255, 255, 255, 255], None);
        let mut buf = PixelBuffer::new(8, 8);
        t.draw(&mut buf, None);
        assert!(buf.as_raw().iter().all(|&b| b == 0));
    }

    #[test]
    fn garbage_font_bytes_are_rejected() {
        assert!(matches!(font_from_bytes(vec![0; 16]), Err(EditorError::Font(_))));
    }
}
