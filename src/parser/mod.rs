//! Document loading: lopdf backend, content lowering and structure-tree
//! reading, plus the [`AltTextDocument`] facade.

pub mod backend;
mod document;
mod lowering;
mod options;
mod struct_tree;

pub use backend::{ContentOp, LopdfBackend, PageId, PdfBackend, PdfValue};
pub use document::{AltTextDocument, LopdfPage};
pub use lowering::{lower_simple, OperatorLowering};
pub use options::{ErrorMode, PageSelection, ParseOptions, DEFAULT_MAX_FORM_DEPTH};
pub use struct_tree::StructTreeReader;
