//! Structure-tree pass: collects figure alt texts, their marked-content ids,
//! and any figures that carry their own bounding box.

use std::collections::HashMap;

use crate::model::{ImageAltResult, MatchTier, Rect, StructChild, StructureNode};

/// Alt text reachable through a marked-content id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McidLink {
    /// Index into [`StructureWalk::slots`] of the owning figure
    pub slot: usize,
    pub alt: String,
}

/// Everything the resolver needs from the structure tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureWalk {
    /// Figures with both a usable bounding box and alt text
    pub direct: Vec<ImageAltResult>,

    /// One entry per remaining figure in document order; `None` keeps the
    /// position of a figure without alt text.
    pub slots: Vec<Option<String>>,

    /// Marked-content id to the alt text of the figure that contains it
    pub mcid_alt: HashMap<u32, McidLink>,
}

impl StructureWalk {
    /// Whether the tree produced any alt text at all.
    pub fn has_alt_text(&self) -> bool {
        !self.direct.is_empty() || self.slots.iter().any(Option::is_some)
    }
}

/// Depth-first walker over a [`StructureNode`] tree.
///
/// Uses an explicit stack, so hostile documents with very deep nesting
/// cannot overflow the call stack.
pub struct StructureTreeWalker;

impl StructureTreeWalker {
    pub fn walk(root: &StructureNode) -> StructureWalk {
        let mut walk = StructureWalk::default();
        let mut figure_index = 0usize;
        let mut stack: Vec<&StructureNode> = vec![root];

        while let Some(node) = stack.pop() {
            if node.role.is_figure() {
                Self::visit_figure(node, figure_index, &mut walk);
                figure_index += 1;
                // Anything below a figure belongs to it.
                continue;
            }

            // Reverse so children pop in document order.
            stack.extend(node.child_nodes().collect::<Vec<_>>().into_iter().rev());
        }

        log::debug!(
            "Structure walk: {} figures, {} direct, {} mcid links",
            figure_index,
            walk.direct.len(),
            walk.mcid_alt.len()
        );
        walk
    }

    fn visit_figure(node: &StructureNode, figure_index: usize, walk: &mut StructureWalk) {
        let alt = node.alt();

        if let Some(alt) = alt {
            if let Some(rect) = Self::direct_box(node) {
                walk.direct.push(ImageAltResult::new(
                    format!("figure-{}", figure_index),
                    rect,
                    alt,
                    MatchTier::Direct,
                ));
                return;
            }
        }

        let slot = walk.slots.len();
        walk.slots.push(alt.map(str::to_string));

        let Some(alt) = alt else {
            return;
        };
        for mcid in Self::subtree_mcids(node) {
            if let Some(previous) = walk.mcid_alt.get(&mcid) {
                if previous.slot != slot {
                    log::debug!(
                        "MCID {} referenced by figures {} and {}; keeping the later one",
                        mcid,
                        previous.slot,
                        slot
                    );
                }
            }
            walk.mcid_alt.insert(
                mcid,
                McidLink {
                    slot,
                    alt: alt.to_string(),
                },
            );
        }
    }

    /// The figure's own box, or failing that the first direct child's box.
    fn direct_box(node: &StructureNode) -> Option<Rect> {
        std::iter::once(node)
            .chain(node.child_nodes())
            .find_map(Self::valid_box)
    }

    fn valid_box(node: &StructureNode) -> Option<Rect> {
        let values = node.bounding_box.as_ref()?;
        let rect = Rect::from_bbox(values);
        if rect.is_none() {
            log::warn!("Ignoring malformed bounding box {:?}", values);
        }
        rect
    }

    /// All marked-content ids anywhere below `node`, in document order.
    fn subtree_mcids(node: &StructureNode) -> Vec<u32> {
        let mut mcids = Vec::new();
        let mut stack: Vec<&StructChild> = node.children.iter().rev().collect();

        while let Some(child) = stack.pop() {
            match child {
                StructChild::Node(inner) => stack.extend(inner.children.iter().rev()),
                other => {
                    if let Some(mcid) = other.mcid() {
                        mcids.push(mcid);
                    }
                }
            }
        }
        mcids
    }
}
