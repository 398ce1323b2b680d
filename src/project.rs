use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use uuid::Uuid;

use crate::canvas::{Color, PixelBuffer};
use crate::components::history::{ActionKind, CanvasSnapshot, HistoryEntry, HistoryManager};
use crate::components::layers::LayerManager;
use crate::components::overlay::{OverlayCommit, ShapeOverlay};
use crate::error::EditorResult;
use crate::ops::adjustments::{Adjustment, AdjustmentPipeline, AdjustmentState};
use crate::ops::collage::CollageGenerator;
use crate::ops::filters::Filter;
use crate::ops::mask::MaskShape;
use crate::ops::shapes::ShapeTool;
use crate::ops::text::{self, TextItem};
use crate::ops::transform;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One editing session: owns the layer stack and every component that
/// mutates it.  Each completed action ends with a history snapshot.
pub struct Project {
    pub id: Uuid,
    /// Display name (derived from path or "Untitled")
    pub name: String,
    /// `None` for images that did not come from disk.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    layers: LayerManager,
    pipeline: AdjustmentPipeline,
    overlay: ShapeOverlay,
    history: HistoryManager,
    collage: CollageGenerator,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT, None)
    }
}

impl Project {
    /// Empty session.  `seed` makes collage layouts reproducible.
    pub fn new(history_limit: usize, seed: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Untitled".to_string(),
            path: None,
            is_dirty: false,
            layers: LayerManager::default(),
            pipeline: AdjustmentPipeline::new(),
            overlay: ShapeOverlay::new(),
            history: HistoryManager::new(history_limit),
            collage: CollageGenerator::new(seed),
        }
    }

    /// Decode `path` and start a session from it.
    pub fn from_file(path: &Path, history_limit: usize, seed: Option<u64>) -> EditorResult<Self> {
        let image = crate::io::load_image(path)?;
        let mut project = Self::new(history_limit, seed);
        project.load_image(image);
        project.name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        project.path = Some(path.to_path_buf());
        Ok(project)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn overlay(&self) -> &ShapeOverlay {
        &self.overlay
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn collage(&self) -> &CollageGenerator {
        &self.collage
    }

    pub fn adjustments(&self) -> &AdjustmentState {
        self.pipeline.state()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.layers.dimensions()
    }

    pub fn has_image(&self) -> bool {
        let (w, h) = self.layers.dimensions();
        w > 0 && h > 0
    }

    /// Pixels of the active layer.
    pub fn active_pixels(&self) -> &PixelBuffer {
        &self.layers.active().pixels
    }

    pub fn history_labels(&self) -> Vec<String> {
        self.history.labels()
    }

    pub fn redo_labels(&self) -> Vec<String> {
        self.history.redo_labels()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Replace everything with a freshly decoded image and start a new
    /// history whose baseline is that image.
    pub fn load_image(&mut self, image: PixelBuffer) -> bool {
        if image.is_empty() {
            crate::log_warn!("load_image ignored: image has no pixels");
            return false;
        }
        let (w, h) = image.dimensions();
        self.layers = LayerManager::from_image(image);
        self.pipeline = AdjustmentPipeline::new();
        self.pipeline.capture_original(0, &self.layers.active().pixels);
        self.overlay.flatten();
        self.collage.clear();
        let baseline = HistoryEntry {
            label: "Load image".to_string(),
            kind: ActionKind::Load,
            snapshot: self.snapshot(),
        };
        self.history.reset(baseline);
        self.is_dirty = false;
        crate::log_info!("project {}: loaded {}x{} image", self.id, w, h);
        true
    }

    /// Back to the loaded image: default sliders, no overlay items, history
    /// holding only the baseline.
    pub fn reset(&mut self) -> bool {
        let Some(baseline) = self.history.baseline().cloned() else {
            crate::log_warn!("reset ignored: no image loaded");
            return false;
        };
        baseline.snapshot.restore_into(
            &mut self.layers,
            &mut self.pipeline,
            &mut self.overlay,
            &mut self.collage,
        );
        self.history.reset(baseline);
        self.is_dirty = false;
        crate::log_info!("project {}: reset to baseline", self.id);
        true
    }

    /// Composited finished image, ready for export.
    pub fn export(&mut self) -> PixelBuffer {
        self.layers.composite().clone()
    }

    pub fn save(&mut self, path: &Path, quality: u8) -> EditorResult<()> {
        let image = self.export();
        crate::io::save_image(&image, path, quality)?;
        self.mark_clean();
        Ok(())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(entry) => {
                entry.snapshot.restore_into(
                    &mut self.layers,
                    &mut self.pipeline,
                    &mut self.overlay,
                    &mut self.collage,
                );
                self.is_dirty = true;
                true
            }
            None => {
                crate::log_debug!("undo: nothing to undo");
                false
            }
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(entry) => {
                entry.snapshot.restore_into(
                    &mut self.layers,
                    &mut self.pipeline,
                    &mut self.overlay,
                    &mut self.collage,
                );
                self.is_dirty = true;
                true
            }
            None => {
                crate::log_debug!("redo: nothing to redo");
                false
            }
        }
    }

    fn snapshot(&self) -> CanvasSnapshot {
        CanvasSnapshot::capture(&self.layers, &self.pipeline, &self.overlay, &self.collage)
    }

    /// Composite, then push a snapshot of the finished action.
    fn record(&mut self, label: impl Into<String>, kind: ActionKind) {
        self.layers.composite();
        let snapshot = self.snapshot();
        self.history.save_state(label, kind, snapshot);
        self.mark_dirty();
    }

    fn require_image(&self, action: &str) -> bool {
        if !self.has_image() {
            crate::log_warn!("{} ignored: no image loaded", action);
            return false;
        }
        true
    }

    /// Run a raster edit on the active layer.  When the overlay lives on that
    /// layer its items are lifted off first and repainted afterwards.
    fn edit_active<R>(&mut self, edit: impl FnOnce(&mut AdjustmentPipeline, usize, &mut PixelBuffer) -> R) -> R {
        let idx = self.layers.active_index();
        let on_overlay = self.overlay.layer() == Some(idx);
        let target = self.layers.active_pixels_mut();
        if on_overlay {
            self.overlay.lift(target);
        }
        let out = edit(&mut self.pipeline, idx, target);
        if on_overlay {
            self.overlay.rebase(target);
        }
        out
    }

    // ------------------------------------------------------------------
    // Adjustments, filters, masks
    // ------------------------------------------------------------------

    /// Set one slider and recompute the active layer from its original.
    /// Returns the stored (clamped) value, or `None` with no image loaded.
    pub fn set_adjustment(&mut self, adj: Adjustment, value: f32) -> Option<f32> {
        if !self.require_image("set_adjustment") {
            return None;
        }
        let stored = self.edit_active(|pipeline, idx, target| pipeline.set_parameter(adj, value, idx, target));
        self.record(format!("Adjust {} to {}", adj, stored), ActionKind::Adjust(adj));
        Some(stored)
    }

    pub fn set_adjustment_by_name(&mut self, name: &str, value: f32) -> EditorResult<Option<f32>> {
        let adj: Adjustment = name.parse()?;
        Ok(self.set_adjustment(adj, value))
    }

    /// Apply a one-shot filter directly to the active layer.  The next slider
    /// move replays from the original and discards it.
    pub fn apply_filter(&mut self, filter: Filter) -> bool {
        if !self.require_image("apply_filter") {
            return false;
        }
        self.edit_active(|_, _, target| filter.apply(target));
        self.record(format!("Filter {}", filter), ActionKind::Filter(filter));
        true
    }

    pub fn apply_filter_by_name(&mut self, name: &str) -> EditorResult<bool> {
        let filter: Filter = name.parse()?;
        Ok(self.apply_filter(filter))
    }

    /// Knock out everything outside a centred `shape` on the active layer.
    pub fn apply_mask(&mut self, shape: MaskShape) -> bool {
        if !self.require_image("apply_mask") {
            return false;
        }
        self.edit_active(|_, _, target| shape.apply(target));
        self.record(format!("Fit in {}", shape.name()), ActionKind::Mask);
        true
    }

    // ------------------------------------------------------------------
    // Shapes and text
    // ------------------------------------------------------------------

    /// Enter Draw mode on the active layer.
    pub fn begin_shape(&mut self, tool: ShapeTool, color: Color) -> bool {
        if !self.require_image("begin_shape") {
            return false;
        }
        let idx = self.layers.active_index();
        self.overlay.begin_shape(tool, color, idx, &self.layers.active().pixels);
        true
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.overlay.pointer_down(x, y);
    }

    /// Live preview or drag step.  Not recorded in history.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        let Some(idx) = self.overlay.layer() else {
            return false;
        };
        let Some(target) = self.layers.layer_pixels_mut(idx) else {
            return false;
        };
        let redrawn = self.overlay.pointer_move(x, y, target);
        if redrawn {
            self.layers.composite();
        }
        redrawn
    }

    /// Finish the gesture; a placement or a non-zero move is recorded.
    pub fn pointer_up(&mut self, x: f32, y: f32) -> Option<OverlayCommit> {
        let idx = self.overlay.layer()?;
        let target = self.layers.layer_pixels_mut(idx)?;
        let commit = self.overlay.pointer_up(x, y, target);
        match &commit {
            Some(OverlayCommit::Placed { tool, .. }) => {
                self.record(format!("Draw {}", tool), ActionKind::DrawShape(*tool));
            }
            Some(OverlayCommit::Moved { .. }) => {
                self.record("Move item", ActionKind::MoveItem);
            }
            None => {
                self.layers.composite();
            }
        }
        commit
    }

    pub fn set_font(&mut self, font: Option<FontArc>) {
        self.overlay.set_font(font);
    }

    pub fn load_font(&mut self, path: &Path) -> EditorResult<()> {
        let font = text::load_font(path)?;
        crate::log_info!("font loaded from {}", path.display());
        self.overlay.set_font(Some(font));
        Ok(())
    }

    /// Place a text item on the active layer; `(x, y)` is the left end of the
    /// baseline.  Returns its index in the overlay.
    pub fn add_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Color) -> Option<usize> {
        if !self.require_image("add_text") {
            return None;
        }
        let item = TextItem::new(text, x, y, font_size, color, self.overlay.font());
        let idx = self.layers.active_index();
        let target = self.layers.active_pixels_mut();
        let index = self.overlay.add_text(item, idx, target);
        self.record(format!("Text \"{}\"", text), ActionKind::AddText);
        Some(index)
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    pub fn add_layer(&mut self) -> Option<usize> {
        if !self.require_image("add_layer") {
            return None;
        }
        let index = self.layers.add_layer();
        self.record("Add layer", ActionKind::Layer);
        Some(index)
    }

    /// Remove the active layer.  Refused for the last remaining layer.
    pub fn remove_layer(&mut self) -> bool {
        if !self.require_image("remove_layer") {
            return false;
        }
        if self.layers.len() > 1 {
            // indices shift; anything bound to a layer index is baked in
            self.overlay.flatten();
            self.pipeline.invalidate();
            self.collage.clear();
        }
        if !self.layers.remove_layer() {
            return false;
        }
        self.record("Remove layer", ActionKind::Layer);
        true
    }

    /// Switch the active layer.  Out of range is a no-op.
    pub fn select_layer(&mut self, index: usize) -> bool {
        self.layers.set_current_layer(index)
    }

    // ------------------------------------------------------------------
    // Collage
    // ------------------------------------------------------------------

    /// Lay out `n` non-overlapping cells over the canvas and draw their
    /// frames onto the active layer.  When only some cells fit, those are
    /// kept (and recorded) and the shortfall is reported as an error.
    pub fn generate_collage(&mut self, n: usize) -> EditorResult<usize> {
        if !self.require_image("generate_collage") {
            return Ok(0);
        }
        let (w, h) = self.layers.dimensions();
        let previous = self.collage.snapshot();
        let result = self.collage.generate(n, w, h).map(|cells| cells.len());
        let placed = self.collage.cells().len();
        if placed == 0 {
            // nothing drawn, so the recorded layout stays current
            self.collage.restore(previous);
            return result;
        }
        self.overlay.flatten();
        self.pipeline.invalidate();
        self.collage.set_layer(Some(self.layers.active_index()));
        self.collage.render(self.layers.active_pixels_mut());
        self.record(format!("Collage of {}", placed), ActionKind::Collage);
        result
    }

    /// Stretch `image` into cell `index` and redraw the collage.
    pub fn assign_collage_image(&mut self, index: usize, image: &PixelBuffer) -> EditorResult<()> {
        self.collage.assign_image(index, image)?;
        let Some(target) = self.collage.layer().and_then(|l| self.layers.layer_pixels_mut(l)) else {
            crate::log_warn!("collage cell {} filled but its layer is gone", index);
            return Ok(());
        };
        self.collage.render(target);
        self.record(format!("Fill collage cell {}", index + 1), ActionKind::Collage);
        Ok(())
    }

    pub fn collage_cell_at(&self, x: f32, y: f32) -> Option<usize> {
        self.collage.cell_at(x, y)
    }

    // ------------------------------------------------------------------
    // Transforms (every layer; destructive)
    // ------------------------------------------------------------------

    fn apply_transform(
        &mut self,
        label: &str,
        op: impl FnOnce(&mut LayerManager) -> EditorResult<()>,
    ) -> EditorResult<bool> {
        if !self.require_image(label) {
            return Ok(false);
        }
        op(&mut self.layers)?;
        self.overlay.flatten();
        self.pipeline.invalidate();
        self.collage.clear();
        self.record(label, ActionKind::Transform);
        Ok(true)
    }

    pub fn rotate_left(&mut self) -> bool {
        self.apply_transform("Rotate left", |l| {
            transform::rotate_left(l);
            Ok(())
        })
        .unwrap_or(false)
    }

    pub fn rotate_right(&mut self) -> bool {
        self.apply_transform("Rotate right", |l| {
            transform::rotate_right(l);
            Ok(())
        })
        .unwrap_or(false)
    }

    pub fn flip_x(&mut self) -> bool {
        self.apply_transform("Flip horizontal", |l| {
            transform::flip_x(l);
            Ok(())
        })
        .unwrap_or(false)
    }

    pub fn flip_y(&mut self) -> bool {
        self.apply_transform("Flip vertical", |l| {
            transform::flip_y(l);
            Ok(())
        })
        .unwrap_or(false)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> EditorResult<bool> {
        self.apply_transform(&format!("Resize to {}x{}", width, height), |l| {
            transform::resize(l, width, height)
        })
    }

    pub fn crop(&mut self, x: u32, y: u32, width: u32, height: u32) -> EditorResult<bool> {
        self.apply_transform("Crop", |l| transform::crop(l, x, y, width, height))
    }
}
