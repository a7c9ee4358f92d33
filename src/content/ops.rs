//! Paint operators as seen by the scanner.
//!
//! This is the reduced vocabulary the attribution engine cares about. The
//! lopdf backend lowers raw content-stream operations into it; other page
//! handles can produce it directly.

use crate::model::Matrix;

/// Tag name that flags a marked-content scope as decorative.
pub const ARTIFACT_TAG: &str = "Artifact";

/// Properties attached to a `BDC` marked-content scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkedContentProps {
    /// `/MCID` entry, if any
    pub mcid: Option<u32>,
}

impl MarkedContentProps {
    pub fn with_mcid(mcid: u32) -> Self {
        Self { mcid: Some(mcid) }
    }
}

/// A single operator in page paint order.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintOp {
    /// `q`: push the graphics state
    Save,
    /// `Q`: pop the graphics state
    Restore,
    /// `cm`: concatenate a matrix onto the current transform
    Concat(Matrix),
    /// `BMC`: open a marked-content scope without properties
    BeginMarkedContent { tag: String },
    /// `BDC`: open a marked-content scope with a property list
    BeginMarkedContentProps {
        tag: String,
        props: MarkedContentProps,
    },
    /// `EMC`: close the innermost marked-content scope
    EndMarkedContent,
    /// Image XObject `Do` or inline image
    PaintImage { name: Option<String> },
    /// Anything the scanner does not interpret
    Other(String),
}

impl PaintOp {
    /// Shorthand for an image paint with a resource name.
    pub fn image(name: impl Into<String>) -> Self {
        PaintOp::PaintImage {
            name: Some(name.into()),
        }
    }

    /// Shorthand for `BDC` with an `/MCID`.
    pub fn begin_tagged(tag: impl Into<String>, mcid: u32) -> Self {
        PaintOp::BeginMarkedContentProps {
            tag: tag.into(),
            props: MarkedContentProps::with_mcid(mcid),
        }
    }

    /// Shorthand for `/Artifact BMC`.
    pub fn begin_artifact() -> Self {
        PaintOp::BeginMarkedContent {
            tag: ARTIFACT_TAG.to_string(),
        }
    }
}
