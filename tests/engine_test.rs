//! Integration tests for the attribution engine over custom page sources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pdfalt::error::{Error, Result};
use pdfalt::{
    AltTextEngine, FallbackMode, MatchTier, Matrix, PageHandle, PaintOp, ResolveOptions,
    StructRole, StructureNode,
};

/// In-memory page that counts how often each input is requested.
struct MockPage {
    id: (u32, u16),
    tree: Option<StructureNode>,
    ops: Vec<PaintOp>,
    fail_ops: bool,
    tree_calls: AtomicUsize,
    ops_calls: AtomicUsize,
}

impl MockPage {
    fn new(tree: Option<StructureNode>, ops: Vec<PaintOp>) -> Self {
        Self {
            id: (7, 0),
            tree,
            ops,
            fail_ops: false,
            tree_calls: AtomicUsize::new(0),
            ops_calls: AtomicUsize::new(0),
        }
    }

    fn failing_ops(mut self) -> Self {
        self.fail_ops = true;
        self
    }

    fn tree_calls(&self) -> usize {
        self.tree_calls.load(Ordering::SeqCst)
    }

    fn ops_calls(&self) -> usize {
        self.ops_calls.load(Ordering::SeqCst)
    }
}

impl PageHandle for MockPage {
    fn page_id(&self) -> (u32, u16) {
        self.id
    }

    fn structure_tree(&self) -> Result<Option<StructureNode>> {
        self.tree_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tree.clone())
    }

    fn operator_sequence(&self) -> Result<Vec<PaintOp>> {
        self.ops_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ops {
            return Err(Error::Corrupted("content stream truncated".to_string()));
        }
        Ok(self.ops.clone())
    }
}

/// Paint an image into the box `(x, y, w, h)`.
fn placed(x: f32, y: f32, w: f32, h: f32, name: &str) -> Vec<PaintOp> {
    vec![
        PaintOp::Save,
        PaintOp::Concat(Matrix::new(w, 0.0, 0.0, h, x, y)),
        PaintOp::image(name),
        PaintOp::Restore,
    ]
}

fn document(figures: Vec<StructureNode>) -> StructureNode {
    figures
        .into_iter()
        .fold(StructureNode::new(StructRole::Document), |root, figure| {
            root.with_child(figure)
        })
}

/// Three untagged images: one low on the page painted first, then the right
/// and left images of the top row.
fn three_image_page() -> MockPage {
    let tree = document(vec![
        StructureNode::figure().with_alt("Top left"),
        StructureNode::figure().with_alt("Top right"),
        StructureNode::figure().with_alt("Bottom"),
    ]);
    let ops = [
        placed(50.0, 100.0, 200.0, 100.0, "Low"),
        placed(300.0, 600.0, 100.0, 100.0, "Right"),
        placed(50.0, 610.0, 100.0, 100.0, "Left"),
    ]
    .concat();
    MockPage::new(Some(tree), ops)
}

#[test]
fn test_repeated_resolution_shares_results() {
    let engine = AltTextEngine::new();
    let page = three_image_page();

    let first = engine.resolve(&page);
    let second = engine.resolve(&page);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(page.tree_calls(), 1);
    assert_eq!(page.ops_calls(), 1);
}

#[test]
fn test_direct_bounding_box_is_reported_verbatim() {
    let tree = document(vec![StructureNode::figure()
        .with_alt("Company logo")
        .with_bbox(vec![10.0, 20.0, 110.0, 70.0])]);
    let page = MockPage::new(Some(tree), placed(0.0, 0.0, 500.0, 500.0, "Im0"));

    let results = AltTextEngine::new().resolve(&page);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].alt, "Company logo");
    assert_eq!(results[0].rect.to_array(), [10.0, 20.0, 110.0, 70.0]);
    assert_eq!(results[0].tier, MatchTier::Direct);
    // Direct hits make the paint stream irrelevant.
    assert_eq!(page.ops_calls(), 0);
}

#[test]
fn test_artifact_images_are_ignored() {
    let tree = document(vec![StructureNode::figure().with_alt("Chart").with_mcid(0)]);
    let ops = [
        vec![PaintOp::begin_artifact()],
        placed(0.0, 700.0, 600.0, 50.0, "Header"),
        vec![PaintOp::EndMarkedContent, PaintOp::begin_tagged("Figure", 0)],
        placed(100.0, 100.0, 200.0, 150.0, "Chart"),
        vec![PaintOp::EndMarkedContent],
    ]
    .concat();
    let page = MockPage::new(Some(tree), ops);

    let results = AltTextEngine::new().resolve(&page);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].alt, "Chart");
    assert_eq!(results[0].id, "image-0");
    assert_eq!(results[0].rect.to_array(), [100.0, 100.0, 300.0, 250.0]);
    assert_eq!(results[0].tier, MatchTier::MarkedContent);
}

#[test]
fn test_scaled_image_without_tags_in_draw_order() {
    let tree = document(vec![StructureNode::figure().with_alt("Diagram")]);
    let ops = vec![
        PaintOp::Save,
        PaintOp::Concat(Matrix::scaling(2.0, 2.0)),
        PaintOp::image("Im0"),
        PaintOp::Restore,
    ];
    let page = MockPage::new(Some(tree), ops);

    let results = AltTextEngine::new().resolve_with_mode(&page, FallbackMode::Draw);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].alt, "Diagram");
    assert_eq!(results[0].rect.to_array(), [0.0, 0.0, 2.0, 2.0]);
    assert_eq!(results[0].tier, MatchTier::Positional);
}

#[test]
fn test_spatial_and_draw_fallbacks_differ() {
    let engine = AltTextEngine::new();
    let page = three_image_page();

    let spatial = engine.resolve_with_mode(&page, FallbackMode::Spatial);
    let spatial: Vec<_> = spatial
        .iter()
        .map(|r| (r.id.as_str(), r.alt.as_str()))
        .collect();
    assert_eq!(
        spatial,
        vec![
            ("image-2", "Top left"),
            ("image-1", "Top right"),
            ("image-0", "Bottom"),
        ]
    );

    let draw = engine.resolve_with_mode(&page, FallbackMode::Draw);
    let draw: Vec<_> = draw.iter().map(|r| (r.id.as_str(), r.alt.as_str())).collect();
    assert_eq!(
        draw,
        vec![
            ("image-0", "Top left"),
            ("image-1", "Top right"),
            ("image-2", "Bottom"),
        ]
    );

    // One fetch per mode.
    assert_eq!(page.tree_calls(), 2);
}

#[test]
fn test_engine_default_mode_comes_from_options() {
    let engine = AltTextEngine::with_options(ResolveOptions::new().draw_order());
    let page = three_image_page();

    let results = engine.resolve(&page);

    assert_eq!(results[0].id, "image-0");
    assert!(engine.cached(page.page_id(), FallbackMode::Draw).is_some());
    assert!(engine.cached(page.page_id(), FallbackMode::Spatial).is_none());
}

#[test]
fn test_untagged_page_never_reads_operators() {
    let page = MockPage::new(None, placed(0.0, 0.0, 10.0, 10.0, "Im0"));

    let results = AltTextEngine::new().resolve(&page);

    assert!(results.is_empty());
    assert_eq!(page.ops_calls(), 0);
}

#[test]
fn test_operator_failure_yields_empty_result() {
    let tree = document(vec![StructureNode::figure().with_alt("Lost")]);
    let page = MockPage::new(Some(tree), Vec::new()).failing_ops();

    let results = AltTextEngine::new().resolve(&page);

    assert!(results.is_empty());
    assert_eq!(page.ops_calls(), 1);
}

#[test]
fn test_release_page_recomputes() {
    let engine = AltTextEngine::new();
    let page = three_image_page();

    let before = engine.resolve(&page);
    engine.release_page(page.page_id());
    let after = engine.resolve(&page);

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(before, after);
    assert_eq!(page.tree_calls(), 2);
}

#[test]
fn test_concurrent_callers_share_one_resolution() {
    let engine = AltTextEngine::new();
    let page = three_image_page();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| engine.resolve(&page)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(page.tree_calls(), 1);
}

#[cfg(feature = "async")]
mod async_pages {
    use super::*;
    use pdfalt::AsyncPageHandle;
    use std::future::Future;
    use std::time::Duration;

    /// Async page source whose fetches take a little while.
    struct SlowPage {
        inner: MockPage,
    }

    impl AsyncPageHandle for SlowPage {
        fn page_id(&self) -> (u32, u16) {
            self.inner.id
        }

        fn structure_tree(&self) -> impl Future<Output = Result<Option<StructureNode>>> + Send {
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                PageHandle::structure_tree(&self.inner)
            }
        }

        fn operator_sequence(&self) -> impl Future<Output = Result<Vec<PaintOp>>> + Send {
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                PageHandle::operator_sequence(&self.inner)
            }
        }
    }

    #[tokio::test]
    async fn test_async_resolve_matches_sync() {
        let engine = AltTextEngine::new();
        let page = SlowPage {
            inner: three_image_page(),
        };

        let results = engine.resolve_async(&page).await;
        let sync = AltTextEngine::new().resolve(&three_image_page());

        assert_eq!(&*results, &*sync);
    }

    #[tokio::test]
    async fn test_async_callers_coalesce() {
        let engine = AltTextEngine::new();
        let page = SlowPage {
            inner: three_image_page(),
        };

        let (a, b) = tokio::join!(
            engine.resolve_async_with_mode(&page, FallbackMode::Spatial),
            engine.resolve_async_with_mode(&page, FallbackMode::Spatial)
        );

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(page.inner.tree_calls(), 1);
        assert_eq!(page.inner.ops_calls(), 1);
    }

    #[tokio::test]
    async fn test_async_result_visible_to_sync_callers() {
        let engine = AltTextEngine::new();
        let page = SlowPage {
            inner: three_image_page(),
        };

        let from_async = engine.resolve_async(&page).await;
        let from_sync = engine.resolve(&page.inner);

        assert!(Arc::ptr_eq(&from_async, &from_sync));
        assert_eq!(page.inner.tree_calls(), 1);
    }
}
