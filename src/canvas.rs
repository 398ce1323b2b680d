use image::{imageops, Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::{EditorError, EditorResult};

/// Straight (non-premultiplied) RGBA colour used by shapes, text and fills.
pub type Color = [u8; 4];

pub const TRANSPARENT: Color = [0, 0, 0, 0];
pub const WHITE: Color = [255, 255, 255, 255];

// ============================================================================
// PIXEL BUFFER: fixed-size RGBA8 grid, the unit every component reads/writes
// ============================================================================

/// A `width × height` grid of RGBA samples stored row-major, 4 bytes per pixel.
///
/// `Clone` is always a deep copy; history snapshots rely on this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl PixelBuffer {
    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: RgbaImage::new(width, height) }
    }

    pub fn new_filled(width: u32, height: u32, color: Color) -> Self {
        Self { image: RgbaImage::from_pixel(width, height, Rgba(color)) }
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Wrap raw RGBA bytes.  Returns `None` unless `data.len() == width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(|image| Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// True when the buffer holds no pixels (nothing loaded yet).
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_rgba_image(self) -> RgbaImage {
        self.image
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    /// Read a pixel, or `None` when `(x, y)` is outside the buffer.
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, px: Rgba<u8>) {
        if x < self.width() && y < self.height() {
            self.image.put_pixel(x, y, px);
        }
    }

    pub fn fill(&mut self, color: Color) {
        for px in self.image.pixels_mut() {
            *px = Rgba(color);
        }
    }

    pub fn clear(&mut self) {
        self.fill(TRANSPARENT);
    }

    /// Overwrite every pixel with `other`'s.  Refuses mismatched sizes instead
    /// of copying a partial/skewed image.
    pub fn copy_from(&mut self, other: &PixelBuffer) -> EditorResult<()> {
        if self.dimensions() != other.dimensions() {
            return Err(EditorError::DimensionMismatch {
                expected: self.dimensions(),
                found: other.dimensions(),
            });
        }
        self.as_raw_mut().copy_from_slice(other.as_raw());
        Ok(())
    }

    /// Composite one straight-alpha pixel over the existing one.
    /// `coverage` scales the source alpha (anti-aliasing, partial fills).
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color, coverage: f32) {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let base = *self.image.get_pixel(x, y);
        let out = blend_over(base, Rgba(color), coverage);
        self.image.put_pixel(x, y, out);
    }

    /// Source-over an RGBA patch (`patch_w × patch_h`, top-left at `(off_x, off_y)`).
    /// Pixels falling outside the buffer are dropped.
    pub fn blend_patch(&mut self, patch: &[u8], patch_w: u32, patch_h: u32, off_x: i32, off_y: i32) {
        if self.is_empty() || patch_w == 0 || patch.len() < (patch_w * patch_h) as usize * 4 {
            return;
        }
        let w = self.width() as i32;
        let stride = self.width() as usize * 4;
        let patch_stride = patch_w as usize * 4;
        self.as_raw_mut()
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                let py = y as i32 - off_y;
                if py < 0 || py >= patch_h as i32 {
                    return;
                }
                let src_row = &patch[py as usize * patch_stride..(py as usize + 1) * patch_stride];
                for px in 0..patch_w as i32 {
                    let x = px + off_x;
                    if x < 0 || x >= w {
                        continue;
                    }
                    let si = px as usize * 4;
                    if src_row[si + 3] == 0 {
                        continue;
                    }
                    let di = x as usize * 4;
                    let base = Rgba([row[di], row[di + 1], row[di + 2], row[di + 3]]);
                    let top = Rgba([src_row[si], src_row[si + 1], src_row[si + 2], src_row[si + 3]]);
                    let out = blend_over(base, top, 1.0);
                    row[di..di + 4].copy_from_slice(&out.0);
                }
            });
    }

    /// Draw `src` over this buffer at `(x, y)` with source-over blending.
    pub fn draw_over(&mut self, src: &PixelBuffer, x: i32, y: i32) {
        self.blend_patch(src.as_raw(), src.width(), src.height(), x, y);
    }

    /// Stretch `src` into the `w × h` rectangle at `(x, y)` and draw it over
    /// this buffer (the canvas `drawImage(img, x, y, w, h)` behaviour).
    pub fn draw_stretched(&mut self, src: &PixelBuffer, x: i32, y: i32, w: u32, h: u32) {
        if w == 0 || h == 0 || src.is_empty() {
            return;
        }
        if src.dimensions() == (w, h) {
            self.draw_over(src, x, y);
            return;
        }
        let scaled = imageops::resize(src.as_rgba_image(), w, h, imageops::FilterType::Triangle);
        self.blend_patch(scaled.as_raw(), w, h, x, y);
    }

    /// Resample to a new size (bilinear).
    pub fn resized(&self, width: u32, height: u32) -> PixelBuffer {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        PixelBuffer::from_rgba_image(imageops::resize(
            &self.image,
            width,
            height,
            imageops::FilterType::Triangle,
        ))
    }
}

// ============================================================================
// BLENDING
// ============================================================================

/// Straight-alpha source-over.  `coverage` multiplies the top alpha.
pub fn blend_over(base: Rgba<u8>, top: Rgba<u8>, coverage: f32) -> Rgba<u8> {
    let coverage = coverage.clamp(0.0, 1.0);
    if top[3] == 0 || coverage <= 0.0 {
        return base;
    }
    if top[3] == 255 && coverage >= 1.0 {
        return top;
    }

    let top_a = top[3] as f32 / 255.0 * coverage;
    let base_a = base[3] as f32 / 255.0;
    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mix = |t: u8, b: u8| -> u8 {
        let v = (t as f32 * top_a + b as f32 * base_a * (1.0 - top_a)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        mix(top[0], base[0]),
        mix(top[1], base[1]),
        mix(top[2], base[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Hermite smoothstep, used for anti-aliased coverage from signed distances.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_is_a_deep_copy() {
        let mut a = PixelBuffer::new_filled(2, 2, WHITE);
        let b = a.clone();
        a.put_pixel(0, 0, Rgba([1, 2, 3, 4]));
        assert_eq!(b.get_pixel(0, 0), Rgba(WHITE));
        assert_eq!(a.as_raw().len(), 2 * 2 * 4);
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 15]).is_none());
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn copy_from_refuses_mismatched_dimensions() {
        let mut a = PixelBuffer::new(4, 4);
        let b = PixelBuffer::new(2, 2);
        assert!(matches!(
            a.copy_from(&b),
            Err(EditorError::DimensionMismatch { expected: (4, 4), found: (2, 2) })
        ));
    }

    #[test]
    fn opaque_top_replaces_and_transparent_top_keeps_base() {
        let base = Rgba([10, 20, 30, 255]);
        assert_eq!(blend_over(base, Rgba([200, 0, 0, 255]), 1.0), Rgba([200, 0, 0, 255]));
        assert_eq!(blend_over(base, Rgba([200, 0, 0, 0]), 1.0), base);
    }

    #[test]
    fn half_alpha_over_opaque_mixes_evenly() {
        let out = blend_over(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 128]), 1.0);
        assert_eq!(out[3], 255);
        assert!((out[0] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn draw_over_clips_to_bounds() {
        let mut dst = PixelBuffer::new(4, 4);
        let src = PixelBuffer::new_filled(3, 3, [255, 0, 0, 255]);
        dst.draw_over(&src, 2, 2);
        assert_eq!(dst.get_pixel(3, 3), Rgba([255, 0, 0, 255]));
        assert_eq!(dst.get_pixel(1, 1), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn stretched_draw_fills_target_rect() {
        let mut dst = PixelBuffer::new(10, 10);
        let src = PixelBuffer::new_filled(2, 2, [0, 255, 0, 255]);
        dst.draw_stretched(&src, 2, 3, 4, 5);
        assert_eq!(dst.get_pixel(2, 3), Rgba([0, 255, 0, 255]));
        assert_eq!(dst.get_pixel(5, 7), Rgba([0, 255, 0, 255]));
        assert_eq!(dst.get_pixel(6, 3)[3], 0);
        assert_eq!(dst.get_pixel(2, 8)[3], 0);
    }
}
