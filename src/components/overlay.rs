// ============================================================================
// SHAPE OVERLAY: draw/move vector shapes and text over a saved raster
// ============================================================================
//
// The overlay owns a snapshot of the raster underneath it (the "base").
// Every redraw restores the base into the target layer and paints all items
// in insertion order, so previews never accumulate and stacking is stable.
// Raster edits to the layer go through `lift` / `rebase` so the items stay
// on top of the edited pixels.
// ============================================================================

use ab_glyph::FontArc;

use crate::canvas::{Color, PixelBuffer};
use crate::ops::shapes::{Geometry, Shape, ShapeTool};
use crate::ops::text::TextItem;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayMode {
    /// Next pointer-down starts a new shape of this kind.
    Draw(ShapeTool),
    /// Pointer-down picks the topmost item under the pointer.
    Move,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OverlayItem {
    Shape(Shape),
    Text(TextItem),
}

impl OverlayItem {
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        match self {
            OverlayItem::Shape(s) => s.contains_point(x, y),
            OverlayItem::Text(t) => t.contains_point(x, y),
        }
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            OverlayItem::Shape(s) => s.translate(dx, dy),
            OverlayItem::Text(t) => t.translate(dx, dy),
        }
    }

    pub fn anchor(&self) -> (f32, f32) {
        match self {
            OverlayItem::Shape(s) => s.anchor(),
            OverlayItem::Text(t) => t.anchor(),
        }
    }

    pub fn draw(&self, target: &mut PixelBuffer, font: Option<&FontArc>) {
        match self {
            OverlayItem::Shape(s) => s.draw(target),
            OverlayItem::Text(t) => t.draw(target, font),
        }
    }
}

/// In-progress pointer gesture.
#[derive(Clone, Debug, PartialEq)]
enum Gesture {
    Drawing { tool: ShapeTool, anchor: (f32, f32), current: (f32, f32) },
    Dragging { index: usize, start: (f32, f32), last: (f32, f32) },
}

/// What a completed gesture changed; the caller records it in history.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayCommit {
    Placed { tool: ShapeTool, index: usize },
    Moved { index: usize, dx: f32, dy: f32 },
}

/// Everything needed to put the overlay back exactly as it was.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct OverlaySnapshot {
    pub layer: Option<usize>,
    pub base: Option<PixelBuffer>,
    pub items: Vec<OverlayItem>,
}

impl OverlaySnapshot {
    pub fn memory_size(&self) -> usize {
        self.base.as_ref().map_or(0, |b| b.as_raw().len())
    }
}

pub struct ShapeOverlay {
    mode: OverlayMode,
    color: Color,
    /// Layer the items are drawn on.
    layer: Option<usize>,
    base: Option<PixelBuffer>,
    items: Vec<OverlayItem>,
    gesture: Option<Gesture>,
    font: Option<FontArc>,
}

impl Default for ShapeOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeOverlay {
    pub fn new() -> Self {
        Self {
            mode: OverlayMode::Move,
            color: [0, 0, 0, 255],
            layer: None,
            base: None,
            items: Vec::new(),
            gesture: None,
            font: None,
        }
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn items(&self) -> &[OverlayItem] {
        &self.items
    }

    pub fn layer(&self) -> Option<usize> {
        self.layer
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn set_font(&mut self, font: Option<FontArc>) {
        self.font = font;
    }

    pub fn font(&self) -> Option<&FontArc> {
        self.font.as_ref()
    }

    /// Bind the overlay to `layer_idx`, capturing its current pixels as the
    /// base.  If it was bound elsewhere (or the size changed) the old items
    /// are left baked into their layer and dropped.
    pub fn attach(&mut self, layer_idx: usize, target: &PixelBuffer) {
        let stale = self.layer != Some(layer_idx)
            || self.base.as_ref().map(|b| b.dimensions()) != Some(target.dimensions());
        if stale {
            if !self.items.is_empty() {
                crate::log_debug!("overlay: flattening {} items before re-attaching", self.items.len());
            }
            self.items.clear();
            self.gesture = None;
            self.layer = Some(layer_idx);
            self.base = Some(target.clone());
        }
    }

    /// Enter Draw mode for `tool` with `color`.
    pub fn begin_shape(&mut self, tool: ShapeTool, color: Color, layer_idx: usize, target: &PixelBuffer) {
        self.attach(layer_idx, target);
        self.mode = OverlayMode::Draw(tool);
        self.color = color;
        self.gesture = None;
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        match self.mode {
            OverlayMode::Draw(tool) => {
                self.gesture = Some(Gesture::Drawing { tool, anchor: (x, y), current: (x, y) });
            }
            OverlayMode::Move => {
                self.gesture = self
                    .items
                    .iter()
                    .rposition(|item| item.contains_point(x, y))
                    .map(|index| Gesture::Dragging { index, start: (x, y), last: (x, y) });
            }
        }
    }

    /// Live preview / drag.  Returns `true` when `target` was redrawn.
    pub fn pointer_move(&mut self, x: f32, y: f32, target: &mut PixelBuffer) -> bool {
        match &mut self.gesture {
            Some(Gesture::Drawing { current, .. }) => {
                *current = (x, y);
            }
            Some(Gesture::Dragging { index, last, .. }) => {
                let (dx, dy) = (x - last.0, y - last.1);
                *last = (x, y);
                let index = *index;
                if let Some(item) = self.items.get_mut(index) {
                    item.translate(dx, dy);
                }
            }
            None => return false,
        }
        self.render(target)
    }

    /// Finish the gesture.  Placing a shape returns to Move mode.
    pub fn pointer_up(&mut self, x: f32, y: f32, target: &mut PixelBuffer) -> Option<OverlayCommit> {
        let gesture = self.gesture.take()?;
        let commit = match gesture {
            Gesture::Drawing { tool, anchor, .. } => {
                let mut geometry = Geometry::from_drag(tool, anchor, (x, y));
                if geometry.is_degenerate() {
                    geometry = Geometry::default_for(tool, target.width(), target.height());
                }
                self.items.push(OverlayItem::Shape(Shape::new(geometry, self.color)));
                self.mode = OverlayMode::Move;
                Some(OverlayCommit::Placed { tool, index: self.items.len() - 1 })
            }
            Gesture::Dragging { index, start, last } => {
                if let Some(item) = self.items.get_mut(index) {
                    item.translate(x - last.0, y - last.1);
                }
                let (dx, dy) = (x - start.0, y - start.1);
                (dx != 0.0 || dy != 0.0).then_some(OverlayCommit::Moved { index, dx, dy })
            }
        };
        self.render(target);
        commit
    }

    /// Append a text item and redraw.
    pub fn add_text(&mut self, item: TextItem, layer_idx: usize, target: &mut PixelBuffer) -> usize {
        self.attach(layer_idx, target);
        self.items.push(OverlayItem::Text(item));
        self.render(target);
        self.items.len() - 1
    }

    /// Restore the base into `target`, then paint every item (and the
    /// in-progress draft) in insertion order.
    pub fn render(&self, target: &mut PixelBuffer) -> bool {
        let Some(base) = &self.base else {
            return false;
        };
        if let Err(e) = target.copy_from(base) {
            crate::log_warn!("overlay redraw skipped: {}", e);
            return false;
        }
        let font = self.font.as_ref();
        for item in &self.items {
            item.draw(target, font);
        }
        if let Some(Gesture::Drawing { tool, anchor, current }) = &self.gesture {
            let draft = Geometry::from_drag(*tool, *anchor, *current);
            if !draft.is_degenerate() {
                Shape::new(draft, self.color).draw(target);
            }
        }
        true
    }

    /// Put the bare base back into `target` before a raster edit.
    pub fn lift(&self, target: &mut PixelBuffer) {
        if let Some(base) = &self.base
            && target.copy_from(base).is_err()
        {
            crate::log_warn!("overlay lift skipped: base no longer matches the layer");
        }
    }

    /// Adopt `target` as the new base after a raster edit and repaint items.
    pub fn rebase(&mut self, target: &mut PixelBuffer) {
        if self.base.is_none() {
            return;
        }
        self.base = Some(target.clone());
        self.render(target);
    }

    /// Leave the items baked into the layer and forget them.
    pub fn flatten(&mut self) {
        self.items.clear();
        self.base = None;
        self.layer = None;
        self.gesture = None;
        self.mode = OverlayMode::Move;
    }

    pub fn snapshot(&self) -> OverlaySnapshot {
        OverlaySnapshot { layer: self.layer, base: self.base.clone(), items: self.items.clone() }
    }

    pub fn restore(&mut self, snap: OverlaySnapshot) {
        self.layer = snap.layer;
        self.base = snap.base;
        self.items = snap.items;
        self.gesture = None;
        self.mode = OverlayMode::Move;
    }
}
