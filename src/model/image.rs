//! Image regions found in the paint stream and the attribution results.

use serde::{Deserialize, Serialize};

use super::Rect;

/// An image paint operation located on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRegion {
    /// Identifier, stable within one scan (`"image-<draw_order>"`)
    pub id: String,

    /// Page-space bounding box of the transformed unit square
    pub rect: Rect,

    /// Innermost enclosing marked-content id
    pub mcid: Option<u32>,

    /// Whether any marked-content scope was open at paint time
    pub inside_marked_content: bool,

    /// Index of encounter in the paint stream
    pub draw_order: usize,
}

impl ImageRegion {
    pub fn new(draw_order: usize, rect: Rect) -> Self {
        Self {
            id: format!("image-{}", draw_order),
            rect,
            mcid: None,
            inside_marked_content: false,
            draw_order,
        }
    }

    pub fn with_mcid(mut self, mcid: Option<u32>) -> Self {
        self.mcid = mcid;
        self
    }

    pub fn with_marked_content(mut self, inside: bool) -> Self {
        self.inside_marked_content = inside;
        self
    }
}

/// How an alt text was tied to an image region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// The structure node carried its own bounding box
    Direct,
    /// Linked through a marked-content id
    MarkedContent,
    /// Positional guess (spatial or draw order)
    Positional,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Direct => "direct",
            MatchTier::MarkedContent => "marked_content",
            MatchTier::Positional => "positional",
        }
    }
}

/// One image region with the alt text attributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAltResult {
    /// Region or figure identifier
    pub id: String,

    /// Page-space rectangle to overlay
    pub rect: Rect,

    /// Alternate description (never empty)
    pub alt: String,

    /// Which resolution tier produced this result
    pub tier: MatchTier,
}

impl ImageAltResult {
    pub fn new(id: impl Into<String>, rect: Rect, alt: impl Into<String>, tier: MatchTier) -> Self {
        Self {
            id: id.into(),
            rect,
            alt: alt.into(),
            tier,
        }
    }
}

/// All attributions for one page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAltText {
    /// Page number (1-indexed)
    pub page: u32,

    /// Attributions in resolution order
    pub results: Vec<ImageAltResult>,
}

impl PageAltText {
    pub fn new(page: u32, results: Vec<ImageAltResult>) -> Self {
        Self { page, results }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
