//! Three-tier attribution of alt texts to image regions.
//!
//! 1. Direct: figures carrying their own bounding box.
//! 2. Marked content: figure MCIDs matched against image paint scopes.
//! 3. Positional: leftover images and figures paired by order.
//!
//! Once tier 1 yields anything, only tier 1 is trusted for that page.

use crate::model::{ImageAltResult, ImageRegion, MatchTier, StructureNode};

use super::options::FallbackMode;
use super::spatial::sort_spatially;
use super::walker::{StructureTreeWalker, StructureWalk};

/// Resolution progress for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    /// Structure tree walked, operator regions not yet requested
    ScanningOperators,
    /// Tier 2 in progress
    MatchingByMcid,
    /// Tier 3 in progress
    FallbackMatching,
    /// Terminal: tier 1 results only
    DirectResolved,
    /// Terminal
    Resolved,
}

impl ResolveState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolveState::DirectResolved | ResolveState::Resolved)
    }
}

/// Orchestrates the three tiers for one page.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchResolver {
    mode: FallbackMode,
}

impl MatchResolver {
    pub fn new(mode: FallbackMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> FallbackMode {
        self.mode
    }

    /// Resolve a page.
    ///
    /// `regions` is only called when the structure tree leaves work for
    /// tiers 2 and 3, so callers can defer the operator scan.
    pub fn resolve<F>(&self, tree: Option<&StructureNode>, regions: F) -> Vec<ImageAltResult>
    where
        F: FnOnce() -> Vec<ImageRegion>,
    {
        let Some(tree) = tree else {
            log::debug!("No structure tree; no alt text to attribute");
            return Vec::new();
        };
        self.resolve_walk(StructureTreeWalker::walk(tree), regions)
    }

    /// Resolve from an already computed structure walk.
    pub fn resolve_walk<F>(&self, walk: StructureWalk, regions: F) -> Vec<ImageAltResult>
    where
        F: FnOnce() -> Vec<ImageRegion>,
    {
        let mut run = Resolution::new(self.mode, walk);
        let mut regions = Some(regions);

        while !run.state.is_terminal() {
            run.state = match run.state {
                ResolveState::ScanningOperators => {
                    let scanned = regions.take().map(|f| f()).unwrap_or_default();
                    run.begin_matching(scanned)
                }
                ResolveState::MatchingByMcid => run.match_by_mcid(),
                ResolveState::FallbackMatching => run.match_positionally(),
                terminal => terminal,
            };
        }

        log::debug!(
            "Resolved {} alt texts ({:?}, {} fallback)",
            run.results.len(),
            run.state,
            self.mode
        );
        run.results
    }
}

/// Working set for one resolution.
struct Resolution {
    mode: FallbackMode,
    state: ResolveState,
    walk: StructureWalk,
    slot_used: Vec<bool>,
    unmatched: Vec<ImageRegion>,
    results: Vec<ImageAltResult>,
}

impl Resolution {
    fn new(mode: FallbackMode, mut walk: StructureWalk) -> Self {
        let mut results = Vec::new();
        let state = if !walk.direct.is_empty() {
            results = std::mem::take(&mut walk.direct);
            ResolveState::DirectResolved
        } else if !walk.has_alt_text() {
            ResolveState::Resolved
        } else {
            ResolveState::ScanningOperators
        };

        Self {
            mode,
            state,
            slot_used: vec![false; walk.slots.len()],
            walk,
            unmatched: Vec::new(),
            results,
        }
    }

    fn begin_matching(&mut self, regions: Vec<ImageRegion>) -> ResolveState {
        if regions.is_empty() {
            log::debug!("No image paints on page");
            return ResolveState::Resolved;
        }
        self.unmatched = regions;
        ResolveState::MatchingByMcid
    }

    /// Tier 2. Each id is consumed on first use so two images never share it.
    fn match_by_mcid(&mut self) -> ResolveState {
        let regions = std::mem::take(&mut self.unmatched);

        for region in regions {
            let link = region.mcid.and_then(|id| self.walk.mcid_alt.remove(&id));
            match link {
                Some(link) => {
                    self.slot_used[link.slot] = true;
                    self.results.push(ImageAltResult::new(
                        region.id,
                        region.rect,
                        link.alt,
                        MatchTier::MarkedContent,
                    ));
                }
                None => self.unmatched.push(region),
            }
        }

        if self.unmatched.is_empty() {
            ResolveState::Resolved
        } else {
            ResolveState::FallbackMatching
        }
    }

    /// Tier 3.
    fn match_positionally(&mut self) -> ResolveState {
        let unmatched = std::mem::take(&mut self.unmatched);
        let (tagged, untagged): (Vec<_>, Vec<_>) = unmatched
            .into_iter()
            .partition(|region| region.inside_marked_content);
        let candidates = if tagged.is_empty() { untagged } else { tagged };

        let images = match self.mode {
            FallbackMode::Spatial => sort_spatially(candidates, |region| region.rect),
            FallbackMode::Draw => {
                let mut candidates = candidates;
                candidates.sort_by_key(|region| region.draw_order);
                candidates
            }
        };

        let slots: Vec<Option<String>> = self
            .walk
            .slots
            .iter()
            .zip(&self.slot_used)
            .filter(|(_, used)| !**used)
            .map(|(slot, _)| slot.clone())
            .collect();

        if images.len() == slots.len() {
            for (region, alt) in images.into_iter().zip(slots) {
                if let Some(alt) = alt {
                    self.results.push(ImageAltResult::new(
                        region.id,
                        region.rect,
                        alt,
                        MatchTier::Positional,
                    ));
                }
            }
            return ResolveState::Resolved;
        }

        let present: Vec<String> = slots.into_iter().flatten().collect();
        log::debug!(
            "Positional count mismatch: {} images, {} alt texts",
            images.len(),
            present.len()
        );

        if let [alt] = present.as_slice() {
            if let Some(region) = largest_region(&images) {
                self.results.push(ImageAltResult::new(
                    region.id.clone(),
                    region.rect,
                    alt.clone(),
                    MatchTier::Positional,
                ));
            }
        }

        ResolveState::Resolved
    }
}

/// Largest image by area; ties go to the earliest painted.
fn largest_region(regions: &[ImageRegion]) -> Option<&ImageRegion> {
    regions.iter().min_by(|a, b| {
        b.rect
            .area()
            .total_cmp(&a.rect.area())
            .then(a.draw_order.cmp(&b.draw_order))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rect, StructRole};

    fn region(order: usize, rect: Rect, mcid: Option<u32>) -> ImageRegion {
        ImageRegion::new(order, rect)
            .with_mcid(mcid)
            .with_marked_content(mcid.is_some())
    }

    fn root(figures: Vec<StructureNode>) -> StructureNode {
        figures
            .into_iter()
            .fold(StructureNode::new(StructRole::Document), |root, f| {
                root.with_child(f)
            })
    }

    #[test]
    fn test_no_tree_yields_nothing() {
        let resolver = MatchResolver::default();
        let results = resolver.resolve(None, || panic!("operators must not be scanned"));
        assert!(results.is_empty());
    }

    #[test]
    fn test_no_alt_skips_scan() {
        let tree = root(vec![StructureNode::figure().with_mcid(1)]);
        let results =
            MatchResolver::default().resolve(Some(&tree), || panic!("operators must not be scanned"));
        assert!(results.is_empty());
    }

    #[test]
    fn test_direct_tier_wins_and_skips_scan() {
        let tree = root(vec![
            StructureNode::figure()
                .with_alt("Boxed")
                .with_bbox(vec![0.0, 0.0, 10.0, 10.0]),
            StructureNode::figure().with_alt("Tagged").with_mcid(1),
        ]);
        let results =
            MatchResolver::default().resolve(Some(&tree), || panic!("operators must not be scanned"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].alt, "Boxed");
        assert_eq!(results[0].tier, MatchTier::Direct);
    }

    #[test]
    fn test_mcid_tier_consumes_ids() {
        let tree = root(vec![StructureNode::figure().with_alt("Once").with_mcid(5)]);
        let regions = vec![
            region(0, Rect::new(0.0, 0.0, 10.0, 10.0), Some(5)),
            region(1, Rect::new(0.0, 20.0, 10.0, 30.0), Some(5)),
        ];
        let results = MatchResolver::new(FallbackMode::Draw).resolve(Some(&tree), || regions);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "image-0");
        assert_eq!(results[0].tier, MatchTier::MarkedContent);
    }

    #[test]
    fn test_consumed_slot_is_not_reused() {
        let tree = root(vec![
            StructureNode::figure().with_alt("Linked").with_mcid(1),
            StructureNode::figure().with_alt("Loose"),
        ]);
        let regions = vec![
            region(0, Rect::new(0.0, 0.0, 10.0, 10.0), Some(1)),
            region(1, Rect::new(0.0, 20.0, 10.0, 30.0), None),
        ];
        let results = MatchResolver::new(FallbackMode::Draw).resolve(Some(&tree), || regions);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].alt, "Linked");
        assert_eq!(results[1].alt, "Loose");
        assert_eq!(results[1].id, "image-1");
        assert_eq!(results[1].tier, MatchTier::Positional);
    }

    #[test]
    fn test_absent_slots_hold_their_position() {
        let tree = root(vec![
            StructureNode::figure(),
            StructureNode::figure().with_alt("Second"),
        ]);
        let regions = vec![
            region(0, Rect::new(0.0, 0.0, 10.0, 10.0), None),
            region(1, Rect::new(0.0, 20.0, 10.0, 30.0), None),
        ];
        let results = MatchResolver::new(FallbackMode::Draw).resolve(Some(&tree), || regions);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "image-1");
        assert_eq!(results[0].alt, "Second");
    }

    #[test]
    fn test_spatial_fallback_uses_reading_order() {
        let tree = root(vec![
            StructureNode::figure().with_alt("Top"),
            StructureNode::figure().with_alt("Bottom"),
        ]);
        // Painted bottom first
        let regions = vec![
            region(0, Rect::new(0.0, 0.0, 10.0, 10.0), None),
            region(1, Rect::new(0.0, 500.0, 10.0, 510.0), None),
        ];
        let results = MatchResolver::new(FallbackMode::Spatial).resolve(Some(&tree), || regions);
        assert_eq!(results[0].id, "image-1");
        assert_eq!(results[0].alt, "Top");
        assert_eq!(results[1].id, "image-0");
        assert_eq!(results[1].alt, "Bottom");
    }

    #[test]
    fn test_fallback_prefers_marked_content_images() {
        let tree = root(vec![StructureNode::figure().with_alt("Figure")]);
        let regions = vec![
            region(0, Rect::new(0.0, 0.0, 10.0, 10.0), None),
            ImageRegion::new(1, Rect::new(0.0, 20.0, 5.0, 25.0)).with_marked_content(true),
        ];
        let results = MatchResolver::new(FallbackMode::Draw).resolve(Some(&tree), || regions);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "image-1");
    }

    #[test]
    fn test_mismatch_picks_largest() {
        let tree = root(vec![StructureNode::figure().with_alt("Hero")]);
        let regions = vec![
            region(0, Rect::new(0.0, 0.0, 10.0, 1.0), None),
            region(1, Rect::new(0.0, 0.0, 10.0, 5.0), None),
            region(2, Rect::new(0.0, 0.0, 10.0, 2.0), None),
        ];
        let results = MatchResolver::new(FallbackMode::Spatial).resolve(Some(&tree), || regions);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "image-1");
        assert_eq!(results[0].alt, "Hero");
    }

    #[test]
    fn test_mismatch_tie_goes_to_first_painted() {
        let tree = root(vec![StructureNode::figure().with_alt("Either")]);
        let regions = vec![
            region(0, Rect::new(0.0, 300.0, 10.0, 310.0), None),
            region(1, Rect::new(0.0, 0.0, 10.0, 10.0), None),
        ];
        let results = MatchResolver::new(FallbackMode::Spatial).resolve(Some(&tree), || regions);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "image-0");
    }

    #[test]
    fn test_mismatch_with_several_alts_drops_everything() {
        let tree = root(vec![
            StructureNode::figure().with_alt("A"),
            StructureNode::figure().with_alt("B"),
        ]);
        let regions = vec![region(0, Rect::new(0.0, 0.0, 10.0, 10.0), None)];
        let results = MatchResolver::new(FallbackMode::Draw).resolve(Some(&tree), || regions);
        assert!(results.is_empty());
    }

    #[test]
    fn test_no_images_resolves_empty() {
        let tree = root(vec![StructureNode::figure().with_alt("Orphan")]);
        let results = MatchResolver::default().resolve(Some(&tree), Vec::new);
        assert!(results.is_empty());
    }
}
