// ============================================================================
// LAYER MANAGER: ordered same-size surfaces, one active, composited in order
// ============================================================================

use image::Rgba;
use rayon::prelude::*;

use crate::canvas::{blend_over, PixelBuffer};

#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub name: String,
    pub visible: bool,
    /// 0.0..=1.0, multiplies the layer's alpha during compositing.
    pub opacity: f32,
    pub pixels: PixelBuffer,
}

impl Layer {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::from_pixels(name, PixelBuffer::new(width, height))
    }

    pub fn from_pixels(name: impl Into<String>, pixels: PixelBuffer) -> Self {
        Self { name: name.into(), visible: true, opacity: 1.0, pixels }
    }
}

/// Owns the layer stack and the derived composite.
///
/// Invariants: at least one layer exists, `active` indexes into `layers`,
/// and every layer has the manager's dimensions.
#[derive(Clone, Debug)]
pub struct LayerManager {
    layers: Vec<Layer>,
    active: usize,
    width: u32,
    height: u32,
    base: PixelBuffer,
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl LayerManager {
    /// One transparent "Background" layer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            layers: vec![Layer::new("Background", width, height)],
            active: 0,
            width,
            height,
            base: PixelBuffer::new(width, height),
        }
    }

    /// Start a stack from a loaded image.
    pub fn from_image(image: PixelBuffer) -> Self {
        let (width, height) = image.dimensions();
        let mut mgr = Self {
            layers: vec![Layer::from_pixels("Background", image)],
            active: 0,
            width,
            height,
            base: PixelBuffer::new(width, height),
        };
        mgr.composite();
        mgr
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Layer {
        &self.layers[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.active]
    }

    pub fn active_pixels_mut(&mut self) -> &mut PixelBuffer {
        &mut self.layers[self.active].pixels
    }

    pub fn layer_pixels_mut(&mut self, index: usize) -> Option<&mut PixelBuffer> {
        self.layers.get_mut(index).map(|l| &mut l.pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Append a transparent layer and make it active.  Returns its index.
    pub fn add_layer(&mut self) -> usize {
        let name = format!("Layer {}", self.layers.len() + 1);
        self.layers.push(Layer::new(name, self.width, self.height));
        self.active = self.layers.len() - 1;
        crate::log_debug!("added layer {} ({} total)", self.active, self.layers.len());
        self.active
    }

    /// Remove the active layer; the new last layer becomes active.
    /// Refused (returns `false`) when only one layer is left.
    pub fn remove_layer(&mut self) -> bool {
        if self.layers.len() <= 1 {
            crate::log_warn!("remove_layer refused: at least one layer must remain");
            return false;
        }
        let removed = self.layers.remove(self.active);
        self.active = self.layers.len() - 1;
        crate::log_debug!("removed layer '{}', active is now {}", removed.name, self.active);
        true
    }

    /// Bounds-checked switch of the active layer.
    pub fn set_current_layer(&mut self, index: usize) -> bool {
        if index >= self.layers.len() {
            crate::log_debug!("set_current_layer({}) out of range", index);
            return false;
        }
        self.active = index;
        true
    }

    /// Clear the base surface and draw every visible layer over it in order.
    pub fn composite(&mut self) -> &PixelBuffer {
        if self.base.dimensions() != (self.width, self.height) {
            self.base = PixelBuffer::new(self.width, self.height);
        } else {
            self.base.clear();
        }
        if self.width == 0 || self.height == 0 {
            return &self.base;
        }
        let stride = self.width as usize * 4;
        for layer in self.layers.iter().filter(|l| l.visible && l.opacity > 0.0) {
            let src = layer.pixels.as_raw();
            let opacity = layer.opacity;
            self.base
                .as_raw_mut()
                .par_chunks_mut(stride)
                .zip(src.par_chunks(stride))
                .for_each(|(dst_row, src_row)| {
                    for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                        if s[3] == 0 {
                            continue;
                        }
                        let out = blend_over(
                            Rgba([d[0], d[1], d[2], d[3]]),
                            Rgba([s[0], s[1], s[2], s[3]]),
                            opacity,
                        );
                        d.copy_from_slice(&out.0);
                    }
                });
        }
        &self.base
    }

    /// Last composite result.
    pub fn base(&self) -> &PixelBuffer {
        &self.base
    }

    /// Replace every layer's pixels with `f(pixels)`; the results must share
    /// one size, which becomes the new canvas size.
    pub fn map_layers<F>(&mut self, f: F)
    where
        F: Fn(&PixelBuffer) -> PixelBuffer + Sync,
    {
        let mapped: Vec<PixelBuffer> = self.layers.par_iter().map(|l| f(&l.pixels)).collect();
        for (layer, pixels) in self.layers.iter_mut().zip(mapped) {
            layer.pixels = pixels;
        }
        let (w, h) = self.layers[0].pixels.dimensions();
        self.width = w;
        self.height = h;
        self.composite();
    }

    /// Wholesale restore (history).  An empty list is ignored.
    pub fn restore(&mut self, layers: Vec<Layer>, active: usize, width: u32, height: u32) {
        if layers.is_empty() {
            return;
        }
        self.active = active.min(layers.len() - 1);
        self.layers = layers;
        self.width = width;
        self.height = height;
        for (i, layer) in self.layers.iter_mut().enumerate() {
            if layer.pixels.dimensions() != (width, height) {
                crate::log_warn!(
                    "layer {} is {:?}, canvas is {:?}; resampling",
                    i,
                    layer.pixels.dimensions(),
                    (width, height)
                );
                layer.pixels = layer.pixels.resized(width, height);
            }
        }
        self.composite();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_appends_and_activates() {
        let mut m = LayerManager::new(4, 4);
        assert_eq!(m.add_layer(), 1);
        assert_eq!(m.add_layer(), 2);
        assert_eq!(m.active_index(), 2);
        assert_eq!(m.layers()[2].name, "Layer 3");
        assert_eq!(m.layers()[2].pixels.dimensions(), (4, 4));
    }

    #[test]
    fn last_layer_cannot_be_removed() {
        let mut m = LayerManager::new(2, 2);
        assert!(!m.remove_layer());
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn remove_moves_active_to_new_last() {
        let mut m = LayerManager::new(2, 2);
        m.add_layer();
        m.add_layer();
        m.set_current_layer(0);
        assert!(m.remove_layer());
        assert_eq!(m.len(), 2);
        assert_eq!(m.active_index(), 1);
    }

    #[test]
    fn out_of_range_select_is_noop() {
        let mut m = LayerManager::new(2, 2);
        m.add_layer();
        assert!(!m.set_current_layer(5));
        assert_eq!(m.active_index(), 1);
        assert!(m.set_current_layer(0));
        assert_eq!(m.active_index(), 0);
    }

    #[test]
    fn later_layers_paint_over_earlier() {
        let mut m = LayerManager::from_image(PixelBuffer::new_filled(2, 1, [255, 0, 0, 255]));
        m.add_layer();
        m.active_pixels_mut().put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        let base = m.composite();
        assert_eq!(base.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(base.get_pixel(1, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn hidden_layers_are_skipped() {
        let mut m = LayerManager::from_image(PixelBuffer::new_filled(1, 1, [10, 10, 10, 255]));
        m.add_layer();
        m.active_pixels_mut().fill([200, 200, 200, 255]);
        m.active_mut().visible = false;
        assert_eq!(m.composite().get_pixel(0, 0), Rgba([10, 10, 10, 255]));
    }

    #[test]
    fn restore_resamples_mismatched_layers() {
        let mut m = LayerManager::new(4, 4);
        let layers = vec![Layer::new("a", 4, 4), Layer::new("b", 2, 2)];
        m.restore(layers, 9, 4, 4);
        assert_eq!(m.active_index(), 1);
        assert!(m.layers().iter().all(|l| l.pixels.dimensions() == (4, 4)));
    }
}
