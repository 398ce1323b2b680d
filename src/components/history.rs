use std::collections::VecDeque;
use std::fmt;

use crate::components::layers::{Layer, LayerManager};
use crate::components::overlay::{OverlaySnapshot, ShapeOverlay};
use crate::ops::adjustments::{Adjustment, AdjustmentPipeline, AdjustmentState, OriginalBuffer};
use crate::ops::collage::{CollageGenerator, CollageSnapshot};
use crate::ops::filters::Filter;
use crate::ops::shapes::ShapeTool;

// ============================================================================
// ACTION KIND: what produced a history entry
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum ActionKind {
    Load,
    Adjust(Adjustment),
    Filter(Filter),
    DrawShape(ShapeTool),
    AddText,
    MoveItem,
    Layer,
    Collage,
    Transform,
    Mask,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Load => f.write_str("load"),
            ActionKind::Adjust(a) => write!(f, "adjust {}", a),
            ActionKind::Filter(flt) => write!(f, "filter {}", flt),
            ActionKind::DrawShape(t) => write!(f, "draw {}", t),
            ActionKind::AddText => f.write_str("text"),
            ActionKind::MoveItem => f.write_str("move"),
            ActionKind::Layer => f.write_str("layer"),
            ActionKind::Collage => f.write_str("collage"),
            ActionKind::Transform => f.write_str("transform"),
            ActionKind::Mask => f.write_str("mask"),
        }
    }
}

// ============================================================================
// CANVAS SNAPSHOT: full editor state, enough to restore without replaying
// ============================================================================

#[derive(Clone, Debug)]
pub struct CanvasSnapshot {
    pub width: u32,
    pub height: u32,
    pub layers: Vec<Layer>,
    pub active_layer_index: usize,
    pub adjustments: AdjustmentState,
    pub adjust_originals: Vec<OriginalBuffer>,
    pub overlay: OverlaySnapshot,
    pub collage: CollageSnapshot,
}

impl CanvasSnapshot {
    pub fn capture(
        layers: &LayerManager,
        pipeline: &AdjustmentPipeline,
        overlay: &ShapeOverlay,
        collage: &CollageGenerator,
    ) -> Self {
        Self {
            width: layers.width(),
            height: layers.height(),
            layers: layers.layers().to_vec(),
            active_layer_index: layers.active_index(),
            adjustments: *pipeline.state(),
            adjust_originals: pipeline.originals().to_vec(),
            overlay: overlay.snapshot(),
            collage: collage.snapshot(),
        }
    }

    pub fn restore_into(
        &self,
        layers: &mut LayerManager,
        pipeline: &mut AdjustmentPipeline,
        overlay: &mut ShapeOverlay,
        collage: &mut CollageGenerator,
    ) {
        layers.restore(self.layers.clone(), self.active_layer_index, self.width, self.height);
        pipeline.restore(self.adjustments, self.adjust_originals.clone());
        overlay.restore(self.overlay.clone());
        collage.restore(self.collage.clone());
    }

    /// Approximate bytes held (pixel data only).
    pub fn memory_size(&self) -> usize {
        self.layers.iter().map(|l| l.pixels.as_raw().len()).sum::<usize>()
            + self.adjust_originals.iter().map(|o| o.pixels.as_raw().len()).sum::<usize>()
            + self.overlay.memory_size()
            + self.collage.memory_size()
    }
}

#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub label: String,
    pub kind: ActionKind,
    pub snapshot: CanvasSnapshot,
}

// ============================================================================
// HISTORY MANAGER
// ============================================================================

/// Linear undo/redo over full snapshots.
///
/// The bottom of the undo stack is the baseline (the loaded image).  It is
/// never undone and never pruned; `undo` restores the entry *below* the
/// one it pops.
pub struct HistoryManager {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    max_history_size: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(50)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(2),
        }
    }

    /// Record a completed action.  Clears the redo stack.
    pub fn save_state(&mut self, label: impl Into<String>, kind: ActionKind, snapshot: CanvasSnapshot) {
        let label = label.into();
        if !self.redo_stack.is_empty() {
            crate::log_debug!("history: '{}' discards {} redo entries", label, self.redo_stack.len());
            self.redo_stack.clear();
        }
        self.undo_stack.push_back(HistoryEntry { label, kind, snapshot });
        self.prune();
    }

    /// Step back.  Returns the entry to restore, or `None` at the baseline.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.undo_stack.len() <= 1 {
            return None;
        }
        let popped = self.undo_stack.pop_back()?;
        crate::log_debug!("undo '{}'", popped.label);
        self.redo_stack.push_back(popped);
        self.undo_stack.back()
    }

    /// Step forward.  Returns the entry to restore, or `None` if nothing was undone.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let entry = self.redo_stack.pop_back()?;
        crate::log_debug!("redo '{}'", entry.label);
        self.undo_stack.push_back(entry);
        self.undo_stack.back()
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        if self.can_undo() {
            self.undo_stack.back().map(|e| e.label.as_str())
        } else {
            None
        }
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.label.as_str())
    }

    /// Undo-stack labels, oldest (baseline) first.
    pub fn labels(&self) -> Vec<String> {
        self.undo_stack.iter().map(|e| e.label.clone()).collect()
    }

    /// Redo-stack labels, next redo first.
    pub fn redo_labels(&self) -> Vec<String> {
        self.redo_stack.iter().rev().map(|e| e.label.clone()).collect()
    }

    pub fn baseline(&self) -> Option<&HistoryEntry> {
        self.undo_stack.front()
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.undo_stack.back()
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .map(|e| e.snapshot.memory_size())
            .sum()
    }

    /// Drop everything and start over from `baseline`.
    pub fn reset(&mut self, baseline: HistoryEntry) {
        self.clear();
        self.undo_stack.push_back(baseline);
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Keep the baseline; drop the oldest entries above it.
    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            if let Some(removed) = self.undo_stack.remove(1) {
                crate::log_debug!("history full, dropping '{}'", removed.label);
            }
        }
    }
}
