//! Logical structure tree snapshot for a single page.
//!
//! This is a plain owned tree, decoupled from any PDF object model. The
//! lopdf backend builds it from `/StructTreeRoot`, and tests or other
//! page-handle implementations can build it by hand.

use std::sync::OnceLock;

use regex::Regex;

/// Structure type of a node, after role-map resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructRole {
    Document,
    Part,
    Art,
    Sect,
    Div,
    P,
    /// Heading; `0` for the generic `H`, `1..=6` for `H1`..`H6`.
    H(u8),
    L,
    LI,
    Table,
    Span,
    Link,
    Caption,
    /// Illustration: the only role the attribution engine looks at.
    Figure,
    Formula,
    Form,
    /// Anything else, kept verbatim.
    Other(String),
}

impl StructRole {
    /// Map a structure type name to a role.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Document" => StructRole::Document,
            "Part" => StructRole::Part,
            "Art" => StructRole::Art,
            "Sect" => StructRole::Sect,
            "Div" => StructRole::Div,
            "P" => StructRole::P,
            "H" => StructRole::H(0),
            "H1" => StructRole::H(1),
            "H2" => StructRole::H(2),
            "H3" => StructRole::H(3),
            "H4" => StructRole::H(4),
            "H5" => StructRole::H(5),
            "H6" => StructRole::H(6),
            "L" => StructRole::L,
            "LI" => StructRole::LI,
            "Table" => StructRole::Table,
            "Span" => StructRole::Span,
            "Link" => StructRole::Link,
            "Caption" => StructRole::Caption,
            "Figure" => StructRole::Figure,
            "Formula" => StructRole::Formula,
            "Form" => StructRole::Form,
            other => StructRole::Other(other.to_string()),
        }
    }

    pub fn is_figure(&self) -> bool {
        matches!(self, StructRole::Figure)
    }
}

/// A node of the logical structure tree.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureNode {
    /// Structure type
    pub role: StructRole,

    /// Raw `[left bottom right top]` box as found in the document.
    ///
    /// Kept unvalidated: entries that were not numbers are stored as NaN
    /// and the arity is whatever the document had. Consumers validate with
    /// [`Rect::from_bbox`](crate::model::Rect::from_bbox).
    pub bounding_box: Option<Vec<f32>>,

    /// Alternate description (`/Alt`)
    pub alt_text: Option<String>,

    /// Children in document order
    pub children: Vec<StructChild>,
}

impl StructureNode {
    /// Create an empty node with the given role.
    pub fn new(role: StructRole) -> Self {
        Self {
            role,
            bounding_box: None,
            alt_text: None,
            children: Vec::new(),
        }
    }

    /// Create an empty `Figure` node.
    pub fn figure() -> Self {
        Self::new(StructRole::Figure)
    }

    /// Set the alternate description.
    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt_text = Some(alt.into());
        self
    }

    /// Set the raw bounding box.
    pub fn with_bbox(mut self, values: impl Into<Vec<f32>>) -> Self {
        self.bounding_box = Some(values.into());
        self
    }

    /// Append a marked-content reference by id.
    pub fn with_mcid(mut self, mcid: u32) -> Self {
        self.children.push(StructChild::Mcid(mcid));
        self
    }

    /// Append a child node.
    pub fn with_child(mut self, child: StructureNode) -> Self {
        self.children.push(StructChild::Node(child));
        self
    }

    /// Append any child.
    pub fn push(&mut self, child: StructChild) {
        self.children.push(child);
    }

    /// The alt text if it is present and not blank.
    pub fn alt(&self) -> Option<&str> {
        self.alt_text
            .as_deref()
            .filter(|alt| !alt.trim().is_empty())
    }

    /// Iterate over the direct child nodes (skipping content references).
    pub fn child_nodes(&self) -> impl Iterator<Item = &StructureNode> {
        self.children.iter().filter_map(|child| match child {
            StructChild::Node(node) => Some(node),
            _ => None,
        })
    }
}

/// A child entry of a [`StructureNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum StructChild {
    /// Nested structure element
    Node(StructureNode),
    /// Marked-content reference by numeric id
    Mcid(u32),
    /// Marked-content reference encoded as a string, e.g. `"p12R_mc5"` or `"5"`
    ContentRef(String),
}

impl StructChild {
    /// The marked-content id this child refers to, if it is a reference.
    pub fn mcid(&self) -> Option<u32> {
        match self {
            StructChild::Mcid(id) => Some(*id),
            StructChild::ContentRef(s) => parse_content_ref(s),
            StructChild::Node(_) => None,
        }
    }
}

fn content_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:.*?mc)?(\d+)$").unwrap())
}

/// Decode a string-encoded marked-content reference.
fn parse_content_ref(s: &str) -> Option<u32> {
    content_ref_regex()
        .captures(s.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
