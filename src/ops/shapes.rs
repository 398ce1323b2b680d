// ============================================================================
// VECTOR SHAPES: geometry, hit-testing, translation, SDF rasterisation
// ============================================================================

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;

use crate::canvas::{smoothstep, Color, PixelBuffer};
use crate::error::EditorError;

/// Hit slop for lines, in pixels either side of the segment.
pub const LINE_HIT_TOLERANCE: f32 = 3.0;
pub const DEFAULT_STROKE_WIDTH: f32 = 3.0;

/// Which shape a draw gesture produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeTool {
    Rectangle,
    Triangle,
    Circle,
    Line,
    Star,
}

impl ShapeTool {
    pub fn all() -> &'static [ShapeTool] {
        &[
            ShapeTool::Rectangle,
            ShapeTool::Triangle,
            ShapeTool::Circle,
            ShapeTool::Line,
            ShapeTool::Star,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeTool::Rectangle => "rectangle",
            ShapeTool::Triangle => "triangle",
            ShapeTool::Circle => "circle",
            ShapeTool::Line => "line",
            ShapeTool::Star => "star",
        }
    }

    /// Half-transparent primaries used by the quick-insert buttons.
    pub fn default_color(self) -> Color {
        match self {
            ShapeTool::Rectangle => [255, 0, 0, 128],
            ShapeTool::Triangle => [0, 255, 0, 128],
            ShapeTool::Circle => [0, 0, 255, 128],
            ShapeTool::Line => [0, 0, 0, 255],
            ShapeTool::Star => [255, 215, 0, 128],
        }
    }
}

impl fmt::Display for ShapeTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeTool {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rectangle" | "rect" => Ok(ShapeTool::Rectangle),
            "triangle" => Ok(ShapeTool::Triangle),
            "circle" => Ok(ShapeTool::Circle),
            "line" => Ok(ShapeTool::Line),
            "star" => Ok(ShapeTool::Star),
            _ => Err(EditorError::UnknownShape(s.to_string())),
        }
    }
}

/// How a closed shape is painted.  Lines are always stroked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ShapeFillMode {
    Outline,
    #[default]
    Filled,
}

/// Canvas-space geometry.  The first field(s) of each variant are the anchor.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// Top-left corner plus non-negative size.
    Rectangle { x: f32, y: f32, width: f32, height: f32 },
    Triangle { points: [(f32, f32); 3] },
    Circle { cx: f32, cy: f32, radius: f32 },
    Line { x1: f32, y1: f32, x2: f32, y2: f32 },
    /// Five points, inner radius half the outer.
    Star { cx: f32, cy: f32, radius: f32 },
}

impl Geometry {
    /// Geometry for a drag from `anchor` to `current`.
    pub fn from_drag(tool: ShapeTool, anchor: (f32, f32), current: (f32, f32)) -> Geometry {
        let (ax, ay) = anchor;
        let (bx, by) = current;
        let (min_x, min_y) = (ax.min(bx), ay.min(by));
        let (max_x, max_y) = (ax.max(bx), ay.max(by));
        let dist = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
        match tool {
            ShapeTool::Rectangle => Geometry::Rectangle {
                x: min_x,
                y: min_y,
                width: max_x - min_x,
                height: max_y - min_y,
            },
            ShapeTool::Triangle => Geometry::Triangle {
                points: [((min_x + max_x) / 2.0, min_y), (min_x, max_y), (max_x, max_y)],
            },
            ShapeTool::Circle => Geometry::Circle { cx: ax, cy: ay, radius: dist },
            ShapeTool::Line => Geometry::Line { x1: ax, y1: ay, x2: bx, y2: by },
            ShapeTool::Star => Geometry::Star { cx: ax, cy: ay, radius: dist },
        }
    }

    /// Quick-insert placement on a `w × h` canvas (a click without a drag).
    pub fn default_for(tool: ShapeTool, w: u32, h: u32) -> Geometry {
        let (w, h) = (w as f32, h as f32);
        match tool {
            ShapeTool::Rectangle => Geometry::Rectangle {
                x: w / 4.0,
                y: h / 4.0,
                width: w / 2.0,
                height: h / 2.0,
            },
            ShapeTool::Triangle => Geometry::Triangle {
                points: [(w / 2.0, h / 4.0), (w / 4.0, 3.0 * h / 4.0), (3.0 * w / 4.0, 3.0 * h / 4.0)],
            },
            ShapeTool::Circle => Geometry::Circle { cx: w / 2.0, cy: h / 2.0, radius: w.min(h) / 4.0 },
            ShapeTool::Line => Geometry::Line { x1: w / 4.0, y1: h / 2.0, x2: 3.0 * w / 4.0, y2: h / 2.0 },
            ShapeTool::Star => Geometry::Star { cx: w / 2.0, cy: h / 2.0, radius: w.min(h) / 4.0 },
        }
    }

    pub fn tool(&self) -> ShapeTool {
        match self {
            Geometry::Rectangle { .. } => ShapeTool::Rectangle,
            Geometry::Triangle { .. } => ShapeTool::Triangle,
            Geometry::Circle { .. } => ShapeTool::Circle,
            Geometry::Line { .. } => ShapeTool::Line,
            Geometry::Star { .. } => ShapeTool::Star,
        }
    }

    /// No area (or no length, for lines).
    pub fn is_degenerate(&self) -> bool {
        match *self {
            Geometry::Rectangle { width, height, .. } => width <= 0.0 || height <= 0.0,
            Geometry::Triangle { points: [a, b, c] } => {
                ((b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)).abs() < f32::EPSILON
            }
            Geometry::Circle { radius, .. } | Geometry::Star { radius, .. } => radius <= 0.0,
            Geometry::Line { x1, y1, x2, y2 } => x1 == x2 && y1 == y2,
        }
    }

    pub fn anchor(&self) -> (f32, f32) {
        match *self {
            Geometry::Rectangle { x, y, .. } => (x, y),
            Geometry::Triangle { points } => points[0],
            Geometry::Circle { cx, cy, .. } | Geometry::Star { cx, cy, .. } => (cx, cy),
            Geometry::Line { x1, y1, .. } => (x1, y1),
        }
    }

    /// Move every defining point by `(dx, dy)`.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            Geometry::Rectangle { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            Geometry::Triangle { points } => {
                for p in points.iter_mut() {
                    p.0 += dx;
                    p.1 += dy;
                }
            }
            Geometry::Circle { cx, cy, .. } | Geometry::Star { cx, cy, .. } => {
                *cx += dx;
                *cy += dy;
            }
            Geometry::Line { x1, y1, x2, y2 } => {
                *x1 += dx;
                *y1 += dy;
                *x2 += dx;
                *y2 += dy;
            }
        }
    }

    /// `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        match *self {
            Geometry::Rectangle { x, y, width, height } => (x, y, x + width, y + height),
            Geometry::Triangle { points } => points.iter().fold(
                (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
                |(a, b, c, d), &(px, py)| (a.min(px), b.min(py), c.max(px), d.max(py)),
            ),
            Geometry::Circle { cx, cy, radius } | Geometry::Star { cx, cy, radius } => {
                (cx - radius, cy - radius, cx + radius, cy + radius)
            }
            Geometry::Line { x1, y1, x2, y2 } => (x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)),
        }
    }

    /// Analytic hit test; boundaries are inclusive.
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        match *self {
            Geometry::Rectangle { x, y, width, height } => {
                px >= x && px <= x + width && py >= y && py <= y + height
            }
            Geometry::Circle { cx, cy, radius } => {
                let dx = px - cx;
                let dy = py - cy;
                dx * dx + dy * dy <= radius * radius
            }
            Geometry::Triangle { points: [a, b, c] } => point_in_triangle((px, py), a, b, c),
            Geometry::Line { x1, y1, x2, y2 } => {
                let (min_x, min_y, max_x, max_y) = self.bounds();
                let t = LINE_HIT_TOLERANCE;
                px >= min_x - t
                    && px <= max_x + t
                    && py >= min_y - t
                    && py <= max_y + t
                    && sdf_line_segment(px, py, x1, y1, x2, y2) <= t
            }
            Geometry::Star { cx, cy, radius } => {
                (px - cx).abs() <= radius && (py - cy).abs() <= radius
            }
        }
    }

    /// Signed distance to the outline (negative inside).  Lines return the
    /// unsigned distance to the segment.
    pub fn sdf(&self, px: f32, py: f32) -> f32 {
        match *self {
            Geometry::Rectangle { x, y, width, height } => {
                let hx = width / 2.0;
                let hy = height / 2.0;
                sdf_box(px - (x + hx), py - (y + hy), hx, hy)
            }
            Geometry::Circle { cx, cy, radius } => {
                ((px - cx).powi(2) + (py - cy).powi(2)).sqrt() - radius
            }
            Geometry::Triangle { points } => sdf_polygon(&points, px, py),
            Geometry::Line { x1, y1, x2, y2 } => sdf_line_segment(px, py, x1, y1, x2, y2),
            Geometry::Star { cx, cy, radius } => sdf_polygon(&star_vertices(cx, cy, radius), px, py),
        }
    }
}

/// Sign test: inside when the point is on the same side of all three edges.
fn point_in_triangle(p: (f32, f32), a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
    let sign = |p1: (f32, f32), p2: (f32, f32), p3: (f32, f32)| {
        (p1.0 - p3.0) * (p2.1 - p3.1) - (p2.0 - p3.0) * (p1.1 - p3.1)
    };
    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

fn star_vertices(cx: f32, cy: f32, radius: f32) -> [(f32, f32); 10] {
    let step = std::f32::consts::PI / 5.0;
    let start = -std::f32::consts::FRAC_PI_2;
    std::array::from_fn(|i| {
        let r = if i % 2 == 0 { radius } else { radius / 2.0 };
        let a = start + step * i as f32;
        (cx + r * a.cos(), cy + r * a.sin())
    })
}

// ============================================================================
// SDF functions: return signed distance (negative = inside)
// ============================================================================

/// Box centred at origin with half-extents (hx, hy).
#[inline]
fn sdf_box(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let outside = (dx.max(0.0) * dx.max(0.0) + dy.max(0.0) * dy.max(0.0)).sqrt();
    let inside = dx.max(dy).min(0.0);
    outside + inside
}

/// Any simple polygon; sign from a crossing-number test.
fn sdf_polygon(verts: &[(f32, f32)], px: f32, py: f32) -> f32 {
    let n = verts.len();
    let mut d = (px - verts[0].0).powi(2) + (py - verts[0].1).powi(2);
    let mut s: f32 = 1.0;
    let mut j = n - 1;
    for i in 0..n {
        let ex = verts[j].0 - verts[i].0;
        let ey = verts[j].1 - verts[i].1;
        let wx = px - verts[i].0;
        let wy = py - verts[i].1;
        let len2 = ex * ex + ey * ey;
        let t = if len2 > 0.0 { ((wx * ex + wy * ey) / len2).clamp(0.0, 1.0) } else { 0.0 };
        let bx = wx - ex * t;
        let by = wy - ey * t;
        d = d.min(bx * bx + by * by);
        let c1 = py >= verts[i].1;
        let c2 = py < verts[j].1;
        let c3 = ex * wy > ey * wx;
        if (c1 && c2 && c3) || (!c1 && !c2 && !c3) {
            s = -s;
        }
        j = i;
    }
    s * d.sqrt()
}

fn sdf_line_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 { (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0) } else { 0.0 };
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

// ============================================================================
// SHAPE
// ============================================================================

/// A placed overlay shape.  Only its position changes after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub geometry: Geometry,
    pub color: Color,
    pub fill_mode: ShapeFillMode,
    pub stroke_width: f32,
}

impl Shape {
    pub fn new(geometry: Geometry, color: Color) -> Self {
        Self {
            geometry,
            color,
            fill_mode: ShapeFillMode::Filled,
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }

    pub fn tool(&self) -> ShapeTool {
        self.geometry.tool()
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.geometry.contains_point(x, y)
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.geometry.translate(dx, dy);
    }

    pub fn anchor(&self) -> (f32, f32) {
        self.geometry.anchor()
    }

    /// Rasterize with anti-aliased coverage and composite over `target`.
    pub fn draw(&self, target: &mut PixelBuffer) {
        let (patch, w, h, ox, oy) = self.rasterize(target.width(), target.height());
        if w > 0 && h > 0 {
            target.blend_patch(&patch, w, h, ox, oy);
        }
    }

    /// Returns `(buf, buf_w, buf_h, offset_x, offset_y)`; offset is the
    /// top-left of the patch in canvas coordinates.
    pub fn rasterize(&self, canvas_w: u32, canvas_h: u32) -> (Vec<u8>, u32, u32, i32, i32) {
        let (min_x, min_y, max_x, max_y) = self.geometry.bounds();
        let pad = self.stroke_width + 2.0;
        let x0 = ((min_x - pad).floor() as i32).max(0);
        let y0 = ((min_y - pad).floor() as i32).max(0);
        let x1 = ((max_x + pad).ceil() as i32).min(canvas_w as i32);
        let y1 = ((max_y + pad).ceil() as i32).min(canvas_h as i32);
        let buf_w = (x1 - x0).max(0) as u32;
        let buf_h = (y1 - y0).max(0) as u32;
        if buf_w == 0 || buf_h == 0 {
            return (Vec::new(), 0, 0, 0, 0);
        }

        let row_bytes = buf_w as usize * 4;
        let mut buf = vec![0u8; row_bytes * buf_h as usize];
        let half = self.stroke_width * 0.5;
        let color = self.color;
        let stroked = self.fill_mode == ShapeFillMode::Outline
            || matches!(self.geometry, Geometry::Line { .. });
        let geometry = &self.geometry;

        buf.par_chunks_mut(row_bytes).enumerate().for_each(|(row, row_buf)| {
            let py = (y0 + row as i32) as f32 + 0.5;
            for col in 0..buf_w as usize {
                let px = (x0 + col as i32) as f32 + 0.5;
                let d = geometry.sdf(px, py);
                let edge = if stroked { d.abs() - half } else { d };
                let coverage = smoothstep(0.5, -0.5, edge);
                if coverage > 0.001 {
                    let idx = col * 4;
                    row_buf[idx] = color[0];
                    row_buf[idx + 1] = color[1];
                    row_buf[idx + 2] = color[2];
                    row_buf[idx + 3] = (color[3] as f32 * coverage).round().min(255.0) as u8;
                }
            }
        });

        (buf, buf_w, buf_h, x0, y0)
    }
}
