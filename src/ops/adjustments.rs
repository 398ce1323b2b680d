// ============================================================================
// ADJUSTMENT PIPELINE: non-destructive slider adjustments
// ============================================================================
//
// Every slider move replays the full adjustment state against an untouched
// copy of the layer being edited (its "original"), so adjustments never
// compound.
// Stages run in the fixed order of `Adjustment::ALL`; each stage writes back
// 8-bit values before the next one reads them.
// Per-pixel stages are parallelized over rows via rayon.
// ============================================================================

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;

use crate::canvas::PixelBuffer;
use crate::error::EditorError;

// ============================================================================
// PARAMETERS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Adjustment {
    Brightness,
    Contrast,
    Saturation,
    Hue,
    Blur,
    Opacity,
    Invert,
    Grayscale,
    Sepia,
}

impl Adjustment {
    /// Pipeline order.
    pub const ALL: [Adjustment; 9] = [
        Adjustment::Brightness,
        Adjustment::Contrast,
        Adjustment::Saturation,
        Adjustment::Hue,
        Adjustment::Blur,
        Adjustment::Opacity,
        Adjustment::Invert,
        Adjustment::Grayscale,
        Adjustment::Sepia,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Adjustment::Brightness => "brightness",
            Adjustment::Contrast => "contrast",
            Adjustment::Saturation => "saturation",
            Adjustment::Hue => "hue",
            Adjustment::Blur => "blur",
            Adjustment::Opacity => "opacity",
            Adjustment::Invert => "invert",
            Adjustment::Grayscale => "grayscale",
            Adjustment::Sepia => "sepia",
        }
    }

    /// Inclusive `(min, max)` slider range.
    pub fn range(self) -> (f32, f32) {
        match self {
            Adjustment::Brightness => (0.0, 400.0),
            Adjustment::Contrast | Adjustment::Saturation => (0.0, 200.0),
            Adjustment::Hue => (0.0, 360.0),
            Adjustment::Blur => (0.0, 10.0),
            Adjustment::Opacity
            | Adjustment::Invert
            | Adjustment::Grayscale
            | Adjustment::Sepia => (0.0, 100.0),
        }
    }

    /// The neutral value; a stage at this value is skipped.
    pub fn default_value(self) -> f32 {
        match self {
            Adjustment::Brightness => 200.0,
            Adjustment::Contrast | Adjustment::Saturation | Adjustment::Opacity => 100.0,
            Adjustment::Hue
            | Adjustment::Blur
            | Adjustment::Invert
            | Adjustment::Grayscale
            | Adjustment::Sepia => 0.0,
        }
    }

    /// Clamp into range.  Blur radius is whole pixels; NaN falls back to the default.
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_value();
        }
        let (lo, hi) = self.range();
        let v = value.clamp(lo, hi);
        if self == Adjustment::Blur { v.round() } else { v }
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Adjustment {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Adjustment::ALL
            .into_iter()
            .find(|a| a.name() == key)
            .ok_or_else(|| EditorError::UnknownAdjustment(s.to_string()))
    }
}

/// Current value of all nine sliders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjustmentState {
    values: [f32; 9],
}

impl Default for AdjustmentState {
    fn default() -> Self {
        Self { values: Adjustment::ALL.map(Adjustment::default_value) }
    }
}

impl AdjustmentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, adj: Adjustment) -> f32 {
        self.values[adj.index()]
    }

    /// Store a clamped value and return what was stored.
    pub fn set(&mut self, adj: Adjustment, value: f32) -> f32 {
        let v = adj.clamp(value);
        self.values[adj.index()] = v;
        v
    }

    pub fn is_neutral(&self, adj: Adjustment) -> bool {
        self.get(adj) == adj.default_value()
    }

    pub fn is_default(&self) -> bool {
        Adjustment::ALL.iter().all(|a| self.is_neutral(*a))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Non-neutral stages in pipeline order.
    pub fn active(&self) -> impl Iterator<Item = (Adjustment, f32)> + '_ {
        Adjustment::ALL
            .into_iter()
            .filter(|a| !self.is_neutral(*a))
            .map(|a| (a, self.get(a)))
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Untouched copy of one layer, the source every recompute replays from.
#[derive(Clone, Debug, PartialEq)]
pub struct OriginalBuffer {
    pub layer: usize,
    pub pixels: PixelBuffer,
}

/// Slider values are session-wide; originals are kept per layer so that
/// switching layers never turns adjusted pixels into a new original.
#[derive(Clone, Debug, Default)]
pub struct AdjustmentPipeline {
    state: AdjustmentState,
    originals: Vec<OriginalBuffer>,
}

impl AdjustmentPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AdjustmentState {
        &self.state
    }

    pub fn original(&self, layer_idx: usize) -> Option<&OriginalBuffer> {
        self.originals.iter().find(|o| o.layer == layer_idx)
    }

    pub fn originals(&self) -> &[OriginalBuffer] {
        &self.originals
    }

    /// Clamp `value`, store it, and recompute `target` (layer `layer_idx`)
    /// from that layer's original.  The original is captured from `target`
    /// on first use, or re-captured when its dimensions are stale.
    /// Returns the stored (clamped) value.
    pub fn set_parameter(
        &mut self,
        adj: Adjustment,
        value: f32,
        layer_idx: usize,
        target: &mut PixelBuffer,
    ) -> f32 {
        let stored = self.state.set(adj, value);
        if stored != value {
            crate::log_debug!("{} clamped {} -> {}", adj, value, stored);
        }
        self.recompute(layer_idx, target);
        stored
    }

    /// `target ← original`, then every active stage in order.
    pub fn recompute(&mut self, layer_idx: usize, target: &mut PixelBuffer) {
        if target.is_empty() {
            crate::log_warn!("adjustment recompute skipped: no image loaded");
            return;
        }
        let slot = self.ensure_original(layer_idx, target);
        if let Err(e) = target.copy_from(&self.originals[slot].pixels) {
            // ensure_original guarantees matching sizes
            crate::log_err!("adjustment recompute: {}", e);
            return;
        }
        for (adj, value) in self.state.active() {
            apply_adjustment(target, adj, value);
        }
    }

    /// Index into `originals` of the entry for `layer_idx`, capturing it
    /// from `target` when missing or sized differently.
    fn ensure_original(&mut self, layer_idx: usize, target: &PixelBuffer) -> usize {
        match self.originals.iter().position(|o| o.layer == layer_idx) {
            Some(slot) if self.originals[slot].pixels.dimensions() == target.dimensions() => slot,
            Some(slot) => {
                crate::log_debug!(
                    "re-capturing original of layer {}: {:?} -> {:?}",
                    layer_idx,
                    self.originals[slot].pixels.dimensions(),
                    target.dimensions()
                );
                self.originals[slot].pixels = target.clone();
                slot
            }
            None => {
                crate::log_debug!("capturing original of layer {}", layer_idx);
                self.originals.push(OriginalBuffer { layer: layer_idx, pixels: target.clone() });
                self.originals.len() - 1
            }
        }
    }

    /// Explicitly (re)capture a layer's original, e.g. from a freshly loaded image.
    pub fn capture_original(&mut self, layer_idx: usize, pixels: &PixelBuffer) {
        match self.originals.iter_mut().find(|o| o.layer == layer_idx) {
            Some(o) => o.pixels = pixels.clone(),
            None => self.originals.push(OriginalBuffer { layer: layer_idx, pixels: pixels.clone() }),
        }
    }

    /// The adjusted pixels of every layer have been baked in by a
    /// destructive edit: forget all originals and return every slider to
    /// neutral, so the next move captures new originals without re-applying
    /// the old stages.
    pub fn invalidate(&mut self) {
        self.originals.clear();
        self.state.reset();
    }

    /// Overwrite state and originals wholesale (history restore).
    pub fn restore(&mut self, state: AdjustmentState, originals: Vec<OriginalBuffer>) {
        self.state = state;
        self.originals = originals;
    }
}

// ============================================================================
// STAGES
// ============================================================================

/// Apply a single stage in place.
pub fn apply_adjustment(buf: &mut PixelBuffer, adj: Adjustment, value: f32) {
    match adj {
        Adjustment::Brightness => brightness(buf, value),
        Adjustment::Contrast => contrast(buf, value),
        Adjustment::Saturation => saturation(buf, value),
        Adjustment::Hue => hue_rotate(buf, value),
        Adjustment::Blur => box_blur(buf, value.round().max(0.0) as u32),
        Adjustment::Opacity => opacity(buf, value),
        Adjustment::Invert => invert(buf, value),
        Adjustment::Grayscale => grayscale(buf, value),
        Adjustment::Sepia => sepia(buf, value),
    }
}

/// Run `transform` over every pixel.  It receives (r, g, b, a) as 0..255 f32;
/// results are rounded and clamped back to u8.
pub fn apply_pixel_transform<F>(buf: &mut PixelBuffer, transform: F)
where
    F: Fn(f32, f32, f32, f32) -> (f32, f32, f32, f32) + Sync,
{
    if buf.is_empty() {
        return;
    }
    let stride = buf.width() as usize * 4;
    buf.as_raw_mut().par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            let (nr, ng, nb, na) =
                transform(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32);
            px[0] = nr.round().clamp(0.0, 255.0) as u8;
            px[1] = ng.round().clamp(0.0, 255.0) as u8;
            px[2] = nb.round().clamp(0.0, 255.0) as u8;
            px[3] = na.round().clamp(0.0, 255.0) as u8;
        }
    });
}

/// Offset every channel by `(v - 200) / 2`.
pub fn brightness(buf: &mut PixelBuffer, value: f32) {
    let offset = (value - 200.0) / 2.0;
    apply_pixel_transform(buf, |r, g, b, a| (r + offset, g + offset, b + offset, a));
}

pub fn contrast(buf: &mut PixelBuffer, value: f32) {
    let c = (value - 100.0) / 100.0;
    if c >= 1.0 {
        // factor diverges: pure threshold around mid-gray
        let step = |v: f32| {
            if v > 128.0 {
                255.0
            } else if v < 128.0 {
                0.0
            } else {
                128.0
            }
        };
        apply_pixel_transform(buf, |r, g, b, a| (step(r), step(g), step(b), a));
        return;
    }
    let factor = 259.0 * (c + 1.0) / (255.0 * (1.0 - c));
    let f = |v: f32| factor * (v - 128.0) + 128.0;
    apply_pixel_transform(buf, |r, g, b, a| (f(r), f(g), f(b), a));
}

pub fn saturation(buf: &mut PixelBuffer, value: f32) {
    let s = value / 100.0;
    apply_pixel_transform(buf, |r, g, b, a| {
        let gray = 0.2989 * r + 0.587 * g + 0.114 * b;
        (gray + s * (r - gray), gray + s * (g - gray), gray + s * (b - gray), a)
    });
}

/// Rotate hue by `degrees` around the gray axis.
pub fn hue_rotate(buf: &mut PixelBuffer, degrees: f32) {
    let m = hue_matrix(degrees.to_radians());
    apply_pixel_transform(buf, |r, g, b, a| {
        let (r, g, b) = (r / 255.0, g / 255.0, b / 255.0);
        (
            (r * m[0] + g * m[1] + b * m[2]) * 255.0,
            (r * m[3] + g * m[4] + b * m[5]) * 255.0,
            (r * m[6] + g * m[7] + b * m[8]) * 255.0,
            a,
        )
    });
}

fn hue_matrix(angle: f32) -> [f32; 9] {
    let cos_a = angle.cos();
    let sin_a = angle.sin();
    let third = 1.0 / 3.0;
    let diag = cos_a + (1.0 - cos_a) * third;
    let base = third * (1.0 - cos_a);
    let skew = third.sqrt() * sin_a;
    [
        diag, base - skew, base + skew,
        base + skew, diag, base - skew,
        base - skew, base + skew, diag,
    ]
}

/// Box blur of half-width `radius`, all four channels.  Out-of-bounds
/// neighbours are excluded from the average, so edges average fewer samples.
///
/// Uses a summed-area table, so the cost is O(w·h) regardless of radius.
pub fn box_blur(buf: &mut PixelBuffer, radius: u32) {
    if radius == 0 || buf.is_empty() {
        return;
    }
    let w = buf.width() as usize;
    let h = buf.height() as usize;
    let r = radius as usize;
    let sat = summed_area_table(buf.as_raw(), w, h);
    let sw = (w + 1) * 4;

    buf.as_raw_mut()
        .par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let y0 = y.saturating_sub(r);
            let y1 = (y + r).min(h - 1) + 1;
            for x in 0..w {
                let x0 = x.saturating_sub(r);
                let x1 = (x + r).min(w - 1) + 1;
                let count = ((x1 - x0) * (y1 - y0)) as f64;
                for c in 0..4 {
                    let sum = sat[y1 * sw + x1 * 4 + c] + sat[y0 * sw + x0 * 4 + c]
                        - sat[y0 * sw + x1 * 4 + c]
                        - sat[y1 * sw + x0 * 4 + c];
                    row[x * 4 + c] = (sum as f64 / count).round().clamp(0.0, 255.0) as u8;
                }
            }
        });
}

/// `(w+1) × (h+1)` inclusive prefix sums per channel, zero-padded on top/left.
fn summed_area_table(raw: &[u8], w: usize, h: usize) -> Vec<u64> {
    let sw = (w + 1) * 4;
    let mut sat = vec![0u64; sw * (h + 1)];
    for y in 0..h {
        let mut row_sum = [0u64; 4];
        for x in 0..w {
            let si = (y * w + x) * 4;
            for c in 0..4 {
                row_sum[c] += raw[si + c] as u64;
                sat[(y + 1) * sw + (x + 1) * 4 + c] = sat[y * sw + (x + 1) * 4 + c] + row_sum[c];
            }
        }
    }
    sat
}

pub fn opacity(buf: &mut PixelBuffer, value: f32) {
    let k = value / 100.0;
    apply_pixel_transform(buf, |r, g, b, a| (r, g, b, a * k));
}

pub fn invert(buf: &mut PixelBuffer, value: f32) {
    let t = value / 100.0;
    let f = |v: f32| (255.0 - v) * t + v * (1.0 - t);
    apply_pixel_transform(buf, |r, g, b, a| (f(r), f(g), f(b), a));
}

pub fn grayscale(buf: &mut PixelBuffer, value: f32) {
    let t = value / 100.0;
    apply_pixel_transform(buf, |r, g, b, a| {
        let avg = (r + g + b) / 3.0;
        let f = |v: f32| avg * t + v * (1.0 - t);
        (f(r), f(g), f(b), a)
    });
}

/// Sepia matrix scaled by `value / 100`; 0 leaves the pixel unchanged and
/// 100 is the full classic sepia.
pub fn sepia(buf: &mut PixelBuffer, value: f32) {
    let s = value / 100.0;
    apply_pixel_transform(buf, |r, g, b, a| {
        let nr = r * (1.0 - 0.607 * s) + g * 0.769 * s + b * 0.189 * s;
        let ng = r * 0.349 * s + g * (1.0 - 0.314 * s) + b * 0.168 * s;
        let nb = r * 0.272 * s + g * 0.534 * s + b * (1.0 - 0.869 * s);
        (nr.min(255.0), ng.min(255.0), nb.min(255.0), a)
    });
}
