//! Per-page result cache.
//!
//! Entries are immutable once stored. Concurrent requests for the same key
//! share one computation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::model::ImageAltResult;

use super::options::FallbackMode;

/// Page identity: object number and generation of the page dictionary.
pub type PageId = (u32, u16);

/// Cache key. Results differ by fallback mode, so it is part of the key.
pub type CacheKey = (PageId, FallbackMode);

/// Shared, immutable resolution output.
pub type CachedResults = Arc<[ImageAltResult]>;

#[derive(Default)]
struct CacheSlot {
    value: OnceLock<CachedResults>,
    #[cfg(feature = "async")]
    gate: tokio::sync::Mutex<()>,
}

/// Thread-safe memo of resolved pages.
#[derive(Default)]
pub struct ResultCache {
    slots: Mutex<HashMap<CacheKey, Arc<CacheSlot>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<CacheSlot>>> {
        // A panic inside compute never leaves the map half-written.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self, key: CacheKey) -> Arc<CacheSlot> {
        Arc::clone(self.lock().entry(key).or_default())
    }

    /// Stored results for `key`, if resolution has completed.
    pub fn get(&self, key: &CacheKey) -> Option<CachedResults> {
        let slot = self.lock().get(key).cloned()?;
        slot.value.get().cloned()
    }

    /// Store results unless the key already holds some. Returns whatever is
    /// stored afterwards.
    pub fn put(&self, key: CacheKey, results: Vec<ImageAltResult>) -> CachedResults {
        let slot = self.slot(key);
        Arc::clone(slot.value.get_or_init(|| results.into()))
    }

    /// Cached results, computing them at most once per key.
    ///
    /// Threads asking for the same key while the computation runs block until
    /// it finishes and receive the same allocation.
    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> CachedResults
    where
        F: FnOnce() -> Vec<ImageAltResult>,
    {
        let slot = self.slot(key);
        Arc::clone(slot.value.get_or_init(|| compute().into()))
    }

    /// Async form of [`get_or_compute`](Self::get_or_compute).
    ///
    /// Tasks waiting on the same key yield instead of blocking a worker.
    #[cfg(feature = "async")]
    pub async fn get_or_compute_async<F, Fut>(&self, key: CacheKey, compute: F) -> CachedResults
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Vec<ImageAltResult>>,
    {
        let slot = self.slot(key);
        if let Some(done) = slot.value.get() {
            return Arc::clone(done);
        }

        let _gate = slot.gate.lock().await;
        if let Some(done) = slot.value.get() {
            return Arc::clone(done);
        }

        let results: CachedResults = compute().await.into();
        Arc::clone(slot.value.get_or_init(|| results))
    }

    /// Drop every entry for `page`, whatever its mode. Returns how many
    /// entries were removed.
    pub fn release(&self, page: PageId) -> usize {
        let mut slots = self.lock();
        let before = slots.len();
        slots.retain(|(id, _), _| *id != page);
        before - slots.len()
    }

    /// Number of keys with a slot (completed or in flight).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.len())
            .finish()
    }
}
