// ============================================================================
// COLLAGE: non-overlapping random rectangles, each fillable with an image
// ============================================================================
//
// Placement is rejection sampling: draw a random rectangle inside the target,
// accept it if it overlaps no accepted rectangle, otherwise draw again.
// Positions and sizes are drawn on a grid of the minimum cell size so that
// accepted cells never strand a sliver too thin for another cell.  Each cell
// has a bounded retry budget; when a layout dead-ends the whole layout is
// restarted, keeping the best one seen.
// ============================================================================

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::canvas::{Color, PixelBuffer};
use crate::error::{EditorError, EditorResult};

pub const DEFAULT_MIN_CELL: (u32, u32) = (100, 200);
pub const DEFAULT_RETRIES_PER_CELL: usize = 1000;
pub const DEFAULT_LAYOUT_ATTEMPTS: usize = 64;

const FRAME_COLOR: Color = [0, 0, 0, 255];
const FRAME_WIDTH: u32 = 2;

#[derive(Clone, Debug, PartialEq)]
pub struct CollageCell {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub image: Option<PixelBuffer>,
}

impl CollageCell {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height, image: None }
    }

    /// Click test, edges inclusive.
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        px >= self.x as f32
            && px <= (self.x + self.width) as f32
            && py >= self.y as f32
            && py <= (self.y + self.height) as f32
    }

    /// Interiors intersect.  Cells that only share an edge do not collide.
    pub fn collides_with(&self, other: &CollageCell) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x + self.width <= width && self.y + self.height <= height
    }
}

/// Layout state restored by undo/redo.  Assigned images are kept so that
/// undoing one fill does not drop the others.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CollageSnapshot {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<CollageCell>,
    pub layer: Option<usize>,
}

impl CollageSnapshot {
    pub fn memory_size(&self) -> usize {
        self.cells
            .iter()
            .filter_map(|c| c.image.as_ref())
            .map(|img| img.as_raw().len())
            .sum()
    }
}

pub struct CollageGenerator {
    rng: StdRng,
    min_width: u32,
    min_height: u32,
    retries_per_cell: usize,
    layout_attempts: usize,
    width: u32,
    height: u32,
    cells: Vec<CollageCell>,
    /// Layer the layout was rendered onto.
    layer: Option<usize>,
}

impl CollageGenerator {
    /// `seed = None` draws from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            min_width: DEFAULT_MIN_CELL.0,
            min_height: DEFAULT_MIN_CELL.1,
            retries_per_cell: DEFAULT_RETRIES_PER_CELL,
            layout_attempts: DEFAULT_LAYOUT_ATTEMPTS,
            width: 0,
            height: 0,
            cells: Vec::new(),
            layer: None,
        }
    }

    pub fn with_min_cell(mut self, width: u32, height: u32) -> Self {
        self.min_width = width.max(1);
        self.min_height = height.max(1);
        self
    }

    pub fn with_retry_budget(mut self, retries_per_cell: usize, layout_attempts: usize) -> Self {
        self.retries_per_cell = retries_per_cell.max(1);
        self.layout_attempts = layout_attempts.max(1);
        self
    }

    pub fn cells(&self) -> &[CollageCell] {
        &self.cells
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Place `n` pairwise non-overlapping cells inside `width × height`.
    ///
    /// On failure the best partial layout is kept (see [`cells`](Self::cells))
    /// and `PlacementInfeasible` reports how many were placed.
    pub fn generate(&mut self, n: usize, width: u32, height: u32) -> EditorResult<&[CollageCell]> {
        self.width = width;
        self.height = height;
        self.cells.clear();
        if n == 0 {
            return Ok(&self.cells);
        }

        let mut best: Vec<CollageCell> = Vec::new();
        for attempt in 0..self.layout_attempts {
            let layout = self.try_layout(n);
            let complete = layout.len() == n;
            if layout.len() > best.len() {
                best = layout;
            }
            if complete {
                crate::log_debug!("collage: {} cells placed on attempt {}", n, attempt + 1);
                break;
            }
        }

        self.cells = best;
        if self.cells.len() < n {
            crate::log_warn!(
                "collage: placed {} of {} cells in {}x{} (min cell {}x{})",
                self.cells.len(),
                n,
                width,
                height,
                self.min_width,
                self.min_height
            );
            return Err(EditorError::PlacementInfeasible { placed: self.cells.len(), requested: n });
        }
        Ok(&self.cells)
    }

    fn try_layout(&mut self, n: usize) -> Vec<CollageCell> {
        let mut placed: Vec<CollageCell> = Vec::with_capacity(n);
        for _ in 0..n {
            let found = (0..self.retries_per_cell).find_map(|_| {
                let candidate = self.random_cell()?;
                (!placed.iter().any(|c| c.collides_with(&candidate))).then_some(candidate)
            });
            match found {
                Some(cell) => placed.push(cell),
                None => break,
            }
        }
        placed
    }

    /// Random grid-aligned cell, or `None` when the target is smaller than
    /// one minimum cell.
    fn random_cell(&mut self) -> Option<CollageCell> {
        let (x, w) = random_span(&mut self.rng, self.width, self.min_width)?;
        let (y, h) = random_span(&mut self.rng, self.height, self.min_height)?;
        Some(CollageCell::new(x, y, w, h))
    }

    pub fn layer(&self) -> Option<usize> {
        self.layer
    }

    pub fn set_layer(&mut self, layer: Option<usize>) {
        self.layer = layer;
    }

    /// Forget the layout (the canvas it was generated for is gone).
    pub fn clear(&mut self) {
        self.cells.clear();
        self.layer = None;
    }

    pub fn snapshot(&self) -> CollageSnapshot {
        CollageSnapshot {
            width: self.width,
            height: self.height,
            cells: self.cells.clone(),
            layer: self.layer,
        }
    }

    /// Put a layout back.  The RNG keeps its position.
    pub fn restore(&mut self, snap: CollageSnapshot) {
        self.width = snap.width;
        self.height = snap.height;
        self.cells = snap.cells;
        self.layer = snap.layer;
    }

    /// Index of the first cell under `(x, y)`.
    pub fn cell_at(&self, x: f32, y: f32) -> Option<usize> {
        self.cells.iter().position(|c| c.contains_point(x, y))
    }

    /// Store an image for a cell; it is stretched to the cell when rendered.
    pub fn assign_image(&mut self, index: usize, image: &PixelBuffer) -> EditorResult<()> {
        if image.is_empty() {
            return Err(EditorError::EmptyBuffer);
        }
        let cell = self.cells.get_mut(index).ok_or(EditorError::InvalidCell(index))?;
        cell.image = Some(image.resized(cell.width, cell.height));
        Ok(())
    }

    /// Clear `target` and draw every cell: its image if assigned, otherwise a frame.
    pub fn render(&self, target: &mut PixelBuffer) {
        target.clear();
        for cell in &self.cells {
            match &cell.image {
                Some(img) => target.draw_stretched(img, cell.x as i32, cell.y as i32, cell.width, cell.height),
                None => draw_frame(target, cell),
            }
        }
    }
}

/// Start and length along one axis of `extent`, both multiples of `min`,
/// except that a leftover gap thinner than `min` is absorbed by extending
/// the span to the edge.
fn random_span(rng: &mut StdRng, extent: u32, min: u32) -> Option<(u32, u32)> {
    if extent < min {
        return None;
    }
    let slots = extent / min;
    let start_slot = rng.gen_range(0..slots);
    let start = start_slot * min;
    let max_len_slots = slots - start_slot;
    let mut len = rng.gen_range(1..=max_len_slots) * min;
    if extent - (start + len) < min {
        len = extent - start;
    }
    Some((start, len))
}

fn draw_frame(target: &mut PixelBuffer, cell: &CollageCell) {
    let x1 = cell.x + cell.width;
    let y1 = cell.y + cell.height;
    for y in cell.y..y1 {
        for x in cell.x..x1 {
            let on_edge = x < cell.x + FRAME_WIDTH
                || x + FRAME_WIDTH >= x1
                || y < cell.y + FRAME_WIDTH
                || y + FRAME_WIDTH >= y1;
            if on_edge {
                target.blend_pixel(x as i32, y as i32, FRAME_COLOR, 1.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(cells: &[CollageCell], w: u32, h: u32) {
        for (i, a) in cells.iter().enumerate() {
            assert!(a.fits_within(w, h), "{:?} escapes {}x{}", a, w, h);
            assert!(a.width >= 100 && a.height >= 200);
            for b in &cells[i + 1..] {
                assert!(!a.collides_with(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn touching_cells_do_not_collide() {
        let a = CollageCell::new(0, 0, 100, 200);
        let b = CollageCell::new(100, 0, 100, 200);
        let c = CollageCell::new(50, 100, 100, 200);
        assert!(!a.collides_with(&b));
        assert!(a.collides_with(&c));
        assert!(c.collides_with(&b));
    }

    #[test]
    fn click_test_is_inclusive() {
        let c = CollageCell::new(10, 10, 100, 200);
        assert!(c.contains_point(10.0, 10.0));
        assert!(c.contains_point(110.0, 210.0));
        assert!(!c.contains_point(110.5, 50.0));
    }

    #[test]
    fn five_cells_fit_in_400_square() {
        for seed in 0..20 {
            let mut g = CollageGenerator::new(Some(seed));
            let cells = g.generate(5, 400, 400).unwrap().to_vec();
            assert_eq!(cells.len(), 5);
            assert_valid(&cells, 400, 400);
        }
    }

    #[test]
    fn infeasible_request_reports_partial_count() {
        let mut g = CollageGenerator::new(Some(7)).with_retry_budget(200, 4);
        // at most 4×2 cells of 100×200 fit
        let result = g.generate(9, 400, 400).map(|c| c.len());
        match result {
            Err(EditorError::PlacementInfeasible { placed, requested }) => {
                assert_eq!(requested, 9);
                assert!((1..=8).contains(&placed));
                assert_eq!(g.cells().len(), placed);
            }
            other => panic!("expected infeasible, got {:?}", other),
        }
        assert_valid(g.cells(), 400, 400);
    }

    #[test]
    fn target_smaller_than_min_cell_places_nothing() {
        let mut g = CollageGenerator::new(Some(1));
        assert!(matches!(
            g.generate(1, 50, 50),
            Err(EditorError::PlacementInfeasible { placed: 0, requested: 1 })
        ));
        assert!(g.generate(0, 50, 50).unwrap().is_empty());
    }

    #[test]
    fn same_seed_same_layout() {
        let a = CollageGenerator::new(Some(42)).generate(3, 600, 400).map(|c| c.to_vec()).unwrap();
        let b = CollageGenerator::new(Some(42)).generate(3, 600, 400).map(|c| c.to_vec()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn snapshot_restores_layout_and_layer() {
        let mut g = CollageGenerator::new(Some(9));
        let empty = g.snapshot();
        g.generate(2, 400, 400).unwrap();
        g.set_layer(Some(0));
        g.assign_image(1, &PixelBuffer::new_filled(4, 4, [1, 2, 3, 255])).unwrap();
        let filled = g.snapshot();
        assert!(filled.memory_size() > 0);

        g.restore(empty);
        assert!(g.cells().is_empty());
        assert_eq!(g.layer(), None);
        assert!(matches!(g.assign_image(0, &PixelBuffer::new(1, 1)), Err(EditorError::InvalidCell(0))));

        g.restore(filled.clone());
        assert_eq!(g.snapshot(), filled);
        assert!(g.cells()[1].image.is_some());
    }

    #[test]
    fn assign_and_render_fill_the_cell() {
        let mut g = CollageGenerator::new(Some(3));
        g.generate(2, 400, 400).unwrap();
        let img = PixelBuffer::new_filled(10, 10, [0, 200, 0, 255]);
        g.assign_image(0, &img).unwrap();
        assert!(matches!(g.assign_image(9, &img), Err(EditorError::InvalidCell(9))));

        let cell = g.cells()[0].clone();
        let mut target = PixelBuffer::new(400, 400);
        g.render(&mut target);
        let cx = cell.x + cell.width / 2;
        let cy = cell.y + cell.height / 2;
        assert_eq!(target.get_pixel(cx, cy).0, [0, 200, 0, 255]);
        assert_eq!(g.cell_at(cx as f32, cy as f32), Some(0));
    }
}
