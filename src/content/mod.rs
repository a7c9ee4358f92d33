//! Paint-stream side of the engine: operators, transform and marked-content
//! tracking, and the image scanner built on them.

mod marked;
mod ops;
mod scanner;
mod transform;

pub use marked::{MarkedContentScope, MarkedContentTracker};
pub use ops::{MarkedContentProps, PaintOp, ARTIFACT_TAG};
pub use scanner::OperatorScanner;
pub use transform::{TransformStack, UNIT_SQUARE};
