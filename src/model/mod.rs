//! Data model shared by the scanner, the structure walker and the resolver.
//!
//! Everything here is transient per query: built from a page snapshot,
//! consumed by the resolver, and dropped once the results are produced.

mod geometry;
mod image;
mod structure;

pub use geometry::{Matrix, Rect};
pub use image::{ImageAltResult, ImageRegion, MatchTier, PageAltText};
pub use structure::{StructChild, StructRole, StructureNode};
