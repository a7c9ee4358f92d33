//! # pdfalt
//!
//! Attributes accessibility alt text to the images painted on a PDF page,
//! even when the document is only partially tagged.
//!
//! Each page is resolved in three tiers, from most to least trusted:
//!
//! 1. **Direct**: `Figure` elements that carry their own bounding box.
//! 2. **Marked content**: `Figure` MCIDs matched against the marked-content
//!    scopes around image paints.
//! 3. **Positional**: leftover images paired with leftover figures in reading
//!    order (or paint order).
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfalt::{scan_file, render};
//!
//! fn main() -> pdfalt::Result<()> {
//!     let pages = scan_file("report.pdf")?;
//!     println!("{}", render::to_text(&pages)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Bring your own page source
//!
//! The engine only needs a [`PageHandle`]: a structure tree and a list of
//! [`PaintOp`]s. [`AltTextEngine`] caches results per page and fallback mode.

pub mod content;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;
pub mod resolve;

// Re-export commonly used types
pub use content::{OperatorScanner, PaintOp};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use error::{Error, Result};
pub use model::{
    ImageAltResult, ImageRegion, MatchTier, Matrix, PageAltText, Rect, StructChild, StructRole,
    StructureNode,
};
pub use parser::{AltTextDocument, ErrorMode, LopdfPage, PageSelection, ParseOptions};
pub use render::JsonFormat;
#[cfg(feature = "async")]
pub use resolve::AsyncPageHandle;
pub use resolve::{AltTextEngine, FallbackMode, PageHandle, ResolveOptions};

use std::io::Read;
use std::path::Path;

/// Resolve alt text for every page of a PDF file.
///
/// # Example
///
/// ```no_run
/// let pages = pdfalt::scan_file("report.pdf").unwrap();
/// for page in &pages {
///     println!("page {}: {} images with alt text", page.page, page.results.len());
/// }
/// ```
pub fn scan_file<P: AsRef<Path>>(path: P) -> Result<Vec<PageAltText>> {
    AltTextDocument::open(path)?.resolve_all()
}

/// Resolve alt text for a PDF file with custom options.
///
/// # Example
///
/// ```no_run
/// use pdfalt::{scan_file_with_options, FallbackMode, PageSelection, ParseOptions};
///
/// let options = ParseOptions::new()
///     .with_pages(PageSelection::parse("1-3").unwrap())
///     .with_fallback_mode(FallbackMode::Draw)
///     .strict();
/// let pages = scan_file_with_options("report.pdf", options).unwrap();
/// ```
pub fn scan_file_with_options<P: AsRef<Path>>(
    path: P,
    options: ParseOptions,
) -> Result<Vec<PageAltText>> {
    AltTextDocument::open_with_options(path, options)?.resolve_all()
}

/// Resolve alt text for every page of an in-memory PDF.
pub fn scan_bytes(data: &[u8]) -> Result<Vec<PageAltText>> {
    AltTextDocument::from_bytes(data)?.resolve_all()
}

/// Resolve alt text for an in-memory PDF with custom options.
pub fn scan_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Vec<PageAltText>> {
    AltTextDocument::from_bytes_with_options(data, options)?.resolve_all()
}

/// Resolve alt text for a PDF read from `reader`.
pub fn scan_reader<R: Read>(reader: R) -> Result<Vec<PageAltText>> {
    AltTextDocument::from_reader(reader)?.resolve_all()
}

/// Resolve one page from inputs already in memory, without caching.
///
/// # Example
///
/// ```
/// use pdfalt::{resolve_alt_text, FallbackMode, Matrix, PaintOp, StructureNode, StructRole};
///
/// let tree = StructureNode::new(StructRole::Document)
///     .with_child(StructureNode::figure().with_alt("Diagram"));
/// let ops = vec![
///     PaintOp::Save,
///     PaintOp::Concat(Matrix::scaling(2.0, 2.0)),
///     PaintOp::image("Im0"),
///     PaintOp::Restore,
/// ];
///
/// let results = resolve_alt_text(Some(&tree), &ops, FallbackMode::Draw);
/// assert_eq!(results.len(), 1);
/// assert_eq!(results[0].alt, "Diagram");
/// assert_eq!(results[0].rect.to_array(), [0.0, 0.0, 2.0, 2.0]);
/// ```
pub fn resolve_alt_text(
    tree: Option<&StructureNode>,
    ops: &[PaintOp],
    mode: FallbackMode,
) -> Vec<ImageAltResult> {
    resolve::MatchResolver::new(mode).resolve(tree, || OperatorScanner::scan(ops))
}
