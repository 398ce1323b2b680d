// ============================================================================
// TRANSFORM OPERATIONS: rotate, flip, resize, crop (whole canvas, all layers)
// ============================================================================

use image::imageops;

use crate::canvas::PixelBuffer;
use crate::components::layers::LayerManager;
use crate::error::{EditorError, EditorResult};

/// Rotate the entire canvas 90° counter-clockwise (swaps W↔H).
pub fn rotate_left(layers: &mut LayerManager) {
    layers.map_layers(|p| PixelBuffer::from_rgba_image(imageops::rotate270(p.as_rgba_image())));
}

/// Rotate the entire canvas 90° clockwise (swaps W↔H).
pub fn rotate_right(layers: &mut LayerManager) {
    layers.map_layers(|p| PixelBuffer::from_rgba_image(imageops::rotate90(p.as_rgba_image())));
}

/// Mirror left↔right.
pub fn flip_x(layers: &mut LayerManager) {
    layers.map_layers(|p| PixelBuffer::from_rgba_image(imageops::flip_horizontal(p.as_rgba_image())));
}

/// Mirror top↔bottom.
pub fn flip_y(layers: &mut LayerManager) {
    layers.map_layers(|p| PixelBuffer::from_rgba_image(imageops::flip_vertical(p.as_rgba_image())));
}

/// Resample every layer to `width × height`.
pub fn resize(layers: &mut LayerManager, width: u32, height: u32) -> EditorResult<()> {
    if width == 0 || height == 0 {
        return Err(EditorError::geometry(format!("resize to {}x{}", width, height)));
    }
    layers.map_layers(|p| p.resized(width, height));
    Ok(())
}

/// Keep the `(x, y, width, height)` rectangle of every layer.  The rectangle
/// is clipped to the canvas first; an empty result is an error.
pub fn crop(layers: &mut LayerManager, x: u32, y: u32, width: u32, height: u32) -> EditorResult<()> {
    let (cw, ch) = layers.dimensions();
    let x0 = x.min(cw);
    let y0 = y.min(ch);
    let x1 = x.saturating_add(width).min(cw);
    let y1 = y.saturating_add(height).min(ch);
    if x1 <= x0 || y1 <= y0 {
        return Err(EditorError::geometry(format!(
            "crop {}x{}+{}+{} is empty on a {}x{} canvas",
            width, height, x, y, cw, ch
        )));
    }
    let (w, h) = (x1 - x0, y1 - y0);
    layers.map_layers(|p| {
        PixelBuffer::from_rgba_image(imageops::crop_imm(p.as_rgba_image(), x0, y0, w, h).to_image())
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    /// 3×2 canvas with a red pixel at the top-left.
    fn marked() -> LayerManager {
        let mut buf = PixelBuffer::new_filled(3, 2, [0, 0, 0, 255]);
        buf.put_pixel(0, 0, RED);
        let mut m = LayerManager::from_image(buf);
        m.add_layer();
        m
    }

    #[test]
    fn rotations_swap_dimensions_on_every_layer() {
        let mut m = marked();
        rotate_right(&mut m);
        assert_eq!(m.dimensions(), (2, 3));
        assert!(m.layers().iter().all(|l| l.pixels.dimensions() == (2, 3)));
        assert_eq!(m.layers()[0].pixels.get_pixel(1, 0), RED);

        rotate_left(&mut m);
        assert_eq!(m.dimensions(), (3, 2));
        assert_eq!(m.layers()[0].pixels.get_pixel(0, 0), RED);
    }

    #[test]
    fn rotate_left_moves_top_left_to_bottom_left() {
        let mut m = marked();
        rotate_left(&mut m);
        assert_eq!(m.layers()[0].pixels.get_pixel(0, 2), RED);
    }

    #[test]
    fn flips_mirror() {
        let mut m = marked();
        flip_x(&mut m);
        assert_eq!(m.layers()[0].pixels.get_pixel(2, 0), RED);
        flip_y(&mut m);
        assert_eq!(m.layers()[0].pixels.get_pixel(2, 1), RED);
    }

    #[test]
    fn resize_rejects_zero() {
        let mut m = marked();
        assert!(resize(&mut m, 0, 5).is_err());
        resize(&mut m, 6, 4).unwrap();
        assert_eq!(m.dimensions(), (6, 4));
    }

    #[test]
    fn crop_clips_to_canvas() {
        let mut m = marked();
        crop(&mut m, 0, 0, 100, 1).unwrap();
        assert_eq!(m.dimensions(), (3, 1));
        assert_eq!(m.layers()[0].pixels.get_pixel(0, 0), RED);
        assert!(crop(&mut m, 5, 0, 2, 2).is_err());
    }
}
