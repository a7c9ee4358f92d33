//! Single-pass scan of a page's paint operators for image placements.

use crate::model::ImageRegion;

use super::marked::MarkedContentTracker;
use super::ops::{PaintOp, ARTIFACT_TAG};
use super::transform::TransformStack;

/// Walks a paint-operator sequence once and records every non-decorative
/// image paint with its page-space box and marked-content context.
#[derive(Debug, Default)]
pub struct OperatorScanner {
    transforms: TransformStack,
    marked: MarkedContentTracker,
    regions: Vec<ImageRegion>,
    skipped_artifacts: usize,
}

impl OperatorScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a full operator sequence and return the image regions in draw order.
    pub fn scan(ops: &[PaintOp]) -> Vec<ImageRegion> {
        let mut scanner = Self::new();
        for op in ops {
            scanner.apply(op);
        }
        scanner.finish()
    }

    /// Feed one operator.
    pub fn apply(&mut self, op: &PaintOp) {
        match op {
            PaintOp::Save => self.transforms.push(),
            PaintOp::Restore => {
                if !self.transforms.pop() {
                    log::debug!("Ignoring restore without matching save");
                }
            }
            PaintOp::Concat(m) => self.transforms.concat(m),
            PaintOp::BeginMarkedContent { tag } => {
                self.marked.begin_scope(tag.as_str(), None, tag == ARTIFACT_TAG);
            }
            PaintOp::BeginMarkedContentProps { tag, props } => {
                self.marked
                    .begin_scope(tag.as_str(), props.mcid, tag == ARTIFACT_TAG);
            }
            PaintOp::EndMarkedContent => {
                if self.marked.end_scope().is_none() {
                    log::debug!("Ignoring EMC without open marked content");
                }
            }
            PaintOp::PaintImage { name } => self.record_image(name.as_deref()),
            PaintOp::Other(operator) => {
                log::trace!("Skipping operator {}", operator);
            }
        }
    }

    fn record_image(&mut self, name: Option<&str>) {
        if self.marked.is_inside_artifact() {
            self.skipped_artifacts += 1;
            log::trace!("Skipping artifact image {:?}", name);
            return;
        }

        // Zero-area boxes are kept.
        let rect = self.transforms.current_rect();
        let region = ImageRegion::new(self.regions.len(), rect)
            .with_mcid(self.marked.current_id())
            .with_marked_content(self.marked.is_inside_any_scope());

        log::trace!(
            "Image {:?} at {:?} (mcid {:?})",
            name,
            region.rect,
            region.mcid
        );
        self.regions.push(region);
    }

    /// Number of image paints dropped because they sat inside an artifact.
    pub fn skipped_artifacts(&self) -> usize {
        self.skipped_artifacts
    }

    /// Consume the scanner and return the collected regions.
    pub fn finish(self) -> Vec<ImageRegion> {
        if self.marked.depth() > 0 || self.transforms.depth() > 0 {
            log::debug!(
                "Operator stream ended with {} open marked-content scopes and {} saved states",
                self.marked.depth(),
                self.transforms.depth()
            );
        }
        self.regions
    }
}
