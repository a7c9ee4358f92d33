//! Alt-text attribution: structure walk, tiered matching, reading-order
//! fallback, and the caching engine on top.

mod cache;
mod engine;
mod matcher;
mod options;
mod spatial;
mod walker;

pub use cache::{CacheKey, CachedResults, PageId, ResultCache};
#[cfg(feature = "async")]
pub use engine::AsyncPageHandle;
pub use engine::{AltTextEngine, PageHandle};
pub use matcher::{MatchResolver, ResolveState};
pub use options::{FallbackMode, ResolveOptions};
pub use spatial::{sort_spatially, spatial_order};
pub use walker::{McidLink, StructureTreeWalker, StructureWalk};
