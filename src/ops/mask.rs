// ============================================================================
// SHAPE MASKS: "fit image in shape", knock out every pixel outside the shape
// ============================================================================

use std::str::FromStr;

use rayon::prelude::*;

use crate::canvas::PixelBuffer;
use crate::error::EditorError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskShape {
    Heart,
    Circle,
    Triangle,
    Rhombus,
    Star,
}

impl MaskShape {
    pub fn name(self) -> &'static str {
        match self {
            MaskShape::Heart => "heart",
            MaskShape::Circle => "circle",
            MaskShape::Triangle => "triangle",
            MaskShape::Rhombus => "rhombus",
            MaskShape::Star => "star",
        }
    }

    /// Is pixel `(x, y)` inside the shape centred at `(cx, cy)` with half-size `size`?
    pub fn contains(self, x: f32, y: f32, cx: f32, cy: f32, size: f32) -> bool {
        if size <= 0.0 {
            return false;
        }
        let dx = x - cx;
        let dy = y - cy;
        match self {
            MaskShape::Circle => dx * dx + dy * dy <= size * size,
            MaskShape::Rhombus => dx.abs() / size + dy.abs() / size <= 1.0,
            MaskShape::Heart => {
                // image y grows downward; flip so the point is at the bottom
                let rx = dx / size;
                let ry = -dy / size;
                let q = rx * rx + ry * ry - 1.0;
                q * q * q - rx * rx * ry * ry * ry <= 0.0
            }
            MaskShape::Triangle => {
                let h = size * 3f32.sqrt() / 2.0;
                let (x1, y1) = (cx, cy - size);
                let (x2, y2) = (cx - h, cy + size / 2.0);
                let (x3, y3) = (cx + h, cy + size / 2.0);
                let d1 = (x - x2) * (y1 - y2) - (x1 - x2) * (y - y2);
                let d2 = (x - x3) * (y2 - y3) - (x2 - x3) * (y - y3);
                let d3 = (x - x1) * (y3 - y1) - (x3 - x1) * (y - y1);
                (d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0) || (d1 <= 0.0 && d2 <= 0.0 && d3 <= 0.0)
            }
            MaskShape::Star => {
                let angle = dy.atan2(dx).to_degrees() + 180.0;
                let dist = (dx * dx + dy * dy).sqrt();
                let p = angle % 72.0;
                let r = if p < 36.0 { size } else { size / 2.0 };
                dist <= r * (p % 36.0).to_radians().cos()
            }
        }
    }

    /// Zero the alpha of every pixel outside the shape.  The shape is centred
    /// on the buffer with half-size `min(w, h) / 2`.
    pub fn apply(self, buf: &mut PixelBuffer) {
        if buf.is_empty() {
            return;
        }
        let (w, h) = buf.dimensions();
        let cx = w as f32 / 2.0;
        let cy = h as f32 / 2.0;
        let size = w.min(h) as f32 / 2.0;
        buf.as_raw_mut()
            .par_chunks_mut(w as usize * 4)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    if !self.contains(x as f32, y as f32, cx, cy, size) {
                        px[3] = 0;
                    }
                }
            });
    }
}

impl FromStr for MaskShape {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heart" => Ok(MaskShape::Heart),
            "circle" => Ok(MaskShape::Circle),
            "triangle" => Ok(MaskShape::Triangle),
            "rhombus" | "diamond" => Ok(MaskShape::Rhombus),
            "star" => Ok(MaskShape::Star),
            _ => Err(EditorError::UnknownShape(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masked(shape: MaskShape) -> PixelBuffer {
        let mut b = PixelBuffer::new_filled(100, 100, [9, 9, 9, 255]);
        shape.apply(&mut b);
        b
    }

    #[test]
    fn centre_kept_corners_cleared() {
        for shape in [
            MaskShape::Heart,
            MaskShape::Circle,
            MaskShape::Triangle,
            MaskShape::Rhombus,
            MaskShape::Star,
        ] {
            let b = masked(shape);
            assert_eq!(b.get_pixel(50, 52)[3], 255, "{} centre", shape.name());
            assert_eq!(b.get_pixel(0, 99)[3], 0, "{} corner", shape.name());
            assert_eq!(b.get_pixel(99, 99)[3], 0, "{} corner", shape.name());
            // colour channels untouched
            assert_eq!(b.get_pixel(0, 99)[0], 9);
        }
    }

    #[test]
    fn circle_edge_inclusive() {
        assert!(MaskShape::Circle.contains(100.0, 50.0, 50.0, 50.0, 50.0));
        assert!(!MaskShape::Circle.contains(100.5, 50.0, 50.0, 50.0, 50.0));
    }

    #[test]
    fn heart_lobes_are_at_the_top() {
        assert!(MaskShape::Heart.contains(75.0, 5.0, 50.0, 50.0, 50.0));
        assert!(!MaskShape::Heart.contains(75.0, 95.0, 50.0, 50.0, 50.0));
    }

    #[test]
    fn parses_names() {
        assert_eq!("Diamond".parse::<MaskShape>().unwrap(), MaskShape::Rhombus);
        assert!("hexagon".parse::<MaskShape>().is_err());
    }
}
