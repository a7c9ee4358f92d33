//! Current-transform tracking for a linear operator scan.

use crate::model::{Matrix, Rect};

/// Corners of the unit square, the space every image is painted into.
pub const UNIT_SQUARE: [(f32, f32); 4] = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];

/// Stack of saved transforms with the current transform on top.
///
/// Restoring past the initial identity is tolerated and does nothing,
/// since real content streams are not always balanced.
#[derive(Debug, Clone, Default)]
pub struct TransformStack {
    current: Matrix,
    saved: Vec<Matrix>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the current transform (`q`).
    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Restore the last saved transform (`Q`).
    ///
    /// Returns `false` when there was nothing to restore.
    pub fn pop(&mut self) -> bool {
        match self.saved.pop() {
            Some(m) => {
                self.current = m;
                true
            }
            None => false,
        }
    }

    /// Compose `m` with the current transform: `current = m × current`.
    pub fn concat(&mut self, m: &Matrix) {
        self.current = m.multiply(&self.current);
    }

    /// The active transform.
    pub fn current(&self) -> &Matrix {
        &self.current
    }

    /// Number of saved transforms.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Bounding box of the given corners mapped through the active transform.
    ///
    /// A bounding box rather than a transformed rectangle, so rotated and
    /// skewed placements are still covered.
    pub fn map_corners(&self, corners: &[(f32, f32)]) -> Option<Rect> {
        Rect::enclosing(
            corners
                .iter()
                .map(|&(x, y)| self.current.transform_point(x, y)),
        )
    }

    /// Page-space box of the unit square under the active transform.
    pub fn current_rect(&self) -> Rect {
        self.map_corners(&UNIT_SQUARE)
            .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0))
    }
}
