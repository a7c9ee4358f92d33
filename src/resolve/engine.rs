//! Page-level entry point: fetches a page's structure tree and paint stream,
//! resolves, and memoizes the result.

use crate::content::{OperatorScanner, PaintOp};
use crate::error::Result;
use crate::model::StructureNode;

use super::cache::{CachedResults, PageId, ResultCache};
use super::matcher::MatchResolver;
use super::options::{FallbackMode, ResolveOptions};

/// Source of the two inputs the resolver needs for one page.
///
/// Failures are not fatal to resolution: a missing tree gives no results, a
/// failed operator fetch is treated as an empty paint stream.
pub trait PageHandle {
    /// Stable identity of the page within its document.
    fn page_id(&self) -> PageId;

    fn structure_tree(&self) -> Result<Option<StructureNode>>;

    fn operator_sequence(&self) -> Result<Vec<PaintOp>>;
}

/// Asynchronous page source. Both inputs are fetched concurrently.
#[cfg(feature = "async")]
pub trait AsyncPageHandle: Sync {
    fn page_id(&self) -> PageId;

    fn structure_tree(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<StructureNode>>> + Send;

    fn operator_sequence(&self) -> impl std::future::Future<Output = Result<Vec<PaintOp>>> + Send;
}

/// Resolves alt text for pages and caches results per page and mode.
///
/// The engine never fails: fetch errors are logged and degrade to fewer
/// results.
///
/// # Example
///
/// ```no_run
/// use pdfalt::{AltTextEngine, AltTextDocument, FallbackMode};
///
/// let doc = AltTextDocument::open("paper.pdf")?;
/// let engine = AltTextEngine::new();
/// let page = doc.page(1)?;
/// for hit in engine.resolve_with_mode(&page, FallbackMode::Draw).iter() {
///     println!("{} {:?}: {}", hit.id, hit.rect, hit.alt);
/// }
/// # Ok::<(), pdfalt::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct AltTextEngine {
    options: ResolveOptions,
    cache: ResultCache,
}

impl AltTextEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ResolveOptions) -> Self {
        Self {
            options,
            cache: ResultCache::new(),
        }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Resolve with the engine's default fallback mode.
    pub fn resolve<P: PageHandle + ?Sized>(&self, page: &P) -> CachedResults {
        self.resolve_with_mode(page, self.options.fallback_mode)
    }

    /// Resolve a page, using the cache when possible.
    ///
    /// The operator stream is only fetched when the structure tree leaves
    /// work for the marked-content or positional tiers.
    pub fn resolve_with_mode<P: PageHandle + ?Sized>(
        &self,
        page: &P,
        mode: FallbackMode,
    ) -> CachedResults {
        let id = page.page_id();
        self.cache.get_or_compute((id, mode), || {
            let tree = fetch_tree(id, page.structure_tree());
            MatchResolver::new(mode).resolve(tree.as_ref(), || {
                let ops = fetch_ops(id, page.operator_sequence());
                OperatorScanner::scan(&ops)
            })
        })
    }

    /// Resolve from inputs the caller already holds.
    pub fn resolve_prefetched(
        &self,
        id: PageId,
        mode: FallbackMode,
        tree: Option<&StructureNode>,
        ops: &[PaintOp],
    ) -> CachedResults {
        self.cache.get_or_compute((id, mode), || {
            MatchResolver::new(mode).resolve(tree, || OperatorScanner::scan(ops))
        })
    }

    /// Completed results for a page, without resolving.
    pub fn cached(&self, id: PageId, mode: FallbackMode) -> Option<CachedResults> {
        self.cache.get(&(id, mode))
    }

    /// Async resolve with the engine's default fallback mode.
    #[cfg(feature = "async")]
    pub async fn resolve_async<P: AsyncPageHandle + ?Sized>(&self, page: &P) -> CachedResults {
        self.resolve_async_with_mode(page, self.options.fallback_mode)
            .await
    }

    /// Async resolve. Tree and operators are fetched concurrently; concurrent
    /// callers for the same page and mode share one resolution.
    #[cfg(feature = "async")]
    pub async fn resolve_async_with_mode<P: AsyncPageHandle + ?Sized>(
        &self,
        page: &P,
        mode: FallbackMode,
    ) -> CachedResults {
        let id = page.page_id();
        self.cache
            .get_or_compute_async((id, mode), || async move {
                let (tree, ops) = tokio::join!(page.structure_tree(), page.operator_sequence());
                let tree = fetch_tree(id, tree);
                let ops = fetch_ops(id, ops);
                MatchResolver::new(mode).resolve(tree.as_ref(), || OperatorScanner::scan(&ops))
            })
            .await
    }

    /// Forget cached results for a page in every mode.
    pub fn release_page(&self, id: PageId) {
        let dropped = self.cache.release(id);
        log::debug!("Released {} cached entries for page {:?}", dropped, id);
    }
}

fn fetch_tree(id: PageId, fetched: Result<Option<StructureNode>>) -> Option<StructureNode> {
    match fetched {
        Ok(Some(tree)) => Some(tree),
        Ok(None) => {
            log::info!("Page {:?} has no structure tree", id);
            None
        }
        Err(e) => {
            log::warn!("Failed to load structure tree for page {:?}: {}", id, e);
            None
        }
    }
}

fn fetch_ops(id: PageId, fetched: Result<Vec<PaintOp>>) -> Vec<PaintOp> {
    fetched.unwrap_or_else(|e| {
        log::warn!("Failed to load operators for page {:?}: {}", id, e);
        Vec::new()
    })
}
