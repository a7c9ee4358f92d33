//! Page-space geometry: affine matrices and axis-aligned rectangles.
//!
//! Coordinates follow PDF user space (origin bottom-left, y grows upward).

use serde::{Deserialize, Serialize};

/// A 2D affine transformation matrix.
///
/// PDF writes matrices as six numbers `[a b c d e f]`, standing for
/// ```text
/// [ a  b  0 ]
/// [ c  d  0 ]
/// [ e  f  1 ]
/// ```
/// Points are row vectors, so `[x y 1] × M` maps a point through `M`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    /// Create a matrix from its six components.
    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// The identity transform.
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// A pure translation.
    pub const fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// A pure scale.
    pub const fn scaling(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Build a matrix from a `[a b c d e f]` operand list.
    ///
    /// Returns `None` unless exactly six finite numbers are given.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f] if values.iter().all(|v| v.is_finite()) => {
                Some(Self::new(*a, *b, *c, *d, *e, *f))
            }
            _ => None,
        }
    }

    /// Matrix product `self × other`.
    ///
    /// Mapping a point through the product is the same as mapping it
    /// through `self` first and then through `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Map a point through this matrix.
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Whether this is (exactly) the identity transform.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

/// An axis-aligned rectangle in page space.
///
/// Always normalized: `left <= right` and `bottom <= top`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl Rect {
    /// Create a rectangle from two opposite corners, normalizing the edges.
    pub fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left: left.min(right),
            bottom: bottom.min(top),
            right: left.max(right),
            top: bottom.max(top),
        }
    }

    /// Build a rectangle from a `[left bottom right top]` bounding box.
    ///
    /// Returns `None` for anything other than four finite numbers, so a
    /// malformed `/BBox` never produces a rectangle.
    pub fn from_bbox(values: &[f32]) -> Option<Self> {
        match values {
            [l, b, r, t] if values.iter().all(|v| v.is_finite()) => Some(Self::new(*l, *b, *r, *t)),
            _ => None,
        }
    }

    /// Smallest rectangle enclosing all given points.
    ///
    /// Returns `None` for an empty point set.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut rect = Self {
            left: x0,
            bottom: y0,
            right: x0,
            top: y0,
        };
        for (x, y) in iter {
            rect.left = rect.left.min(x);
            rect.right = rect.right.max(x);
            rect.bottom = rect.bottom.min(y);
            rect.top = rect.top.max(y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Length of the overlap between the vertical spans of two rectangles
    /// (zero when they do not overlap).
    pub fn vertical_overlap(&self, other: &Rect) -> f32 {
        (self.top.min(other.top) - self.bottom.max(other.bottom)).max(0.0)
    }

    /// The rectangle as `[left, bottom, right, top]`.
    pub fn to_array(&self) -> [f32; 4] {
        [self.left, self.bottom, self.right, self.top]
    }
}
