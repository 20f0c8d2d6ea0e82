//! The closed set of element types a variable can hold.
//!
//! Every type-erased array in scivar stores exactly one of these element
//! types. The set is closed: [`Element`] is sealed, and [`DType`] is the
//! runtime tag used when dispatching over type-erased storage.
//!
//! | `DType`      | Rust type      | variances |
//! |--------------|----------------|-----------|
//! | `F64`        | `f64`          | yes       |
//! | `F32`        | `f32`          | yes       |
//! | `I64`        | `i64`          | no        |
//! | `I32`        | `i32`          | no        |
//! | `Bool`       | `bool`         | no        |
//! | `Vector3d`   | [`Vector3d`]   | no        |
//! | `SparseF64`  | [`EventList`]  | yes       |
//! | `BinRange`   | [`BinRange`]   | no        |

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Runtime tag identifying the concrete element type of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F64,
    F32,
    I64,
    I32,
    Bool,
    Vector3d,
    /// Ragged per-cell list of `f64` (the "sparse" element-list mode).
    SparseF64,
    /// Half-open index range into a bin buffer.
    BinRange,
}

impl DType {
    /// Human-readable type name for error messages.
    pub fn name(self) -> &'static str {
        match self {
            DType::F64 => "float64",
            DType::F32 => "float32",
            DType::I64 => "int64",
            DType::I32 => "int32",
            DType::Bool => "bool",
            DType::Vector3d => "vector3",
            DType::SparseF64 => "sparse<float64>",
            DType::BinRange => "bin_range",
        }
    }

    /// Returns `true` for `F64` and `F32`.
    pub fn is_float(self) -> bool {
        matches!(self, DType::F64 | DType::F32)
    }

    /// Returns `true` for `I64` and `I32`.
    pub fn is_integer(self) -> bool {
        matches!(self, DType::I64 | DType::I32)
    }

    /// Whether a variance array may accompany values of this type.
    pub fn supports_variances(self) -> bool {
        matches!(self, DType::F64 | DType::F32 | DType::SparseF64)
    }

    /// Whether this is the ragged element-list type.
    pub fn is_sparse(self) -> bool {
        matches!(self, DType::SparseF64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for f32 {}
    impl Sealed for i64 {}
    impl Sealed for i32 {}
    impl Sealed for bool {}
    impl Sealed for super::Vector3d {}
    impl Sealed for super::EventList {}
    impl Sealed for super::BinRange {}
}

/// Element types storable in a scivar array.
///
/// Sealed trait: implemented exactly for the types listed in [`DType`].
pub trait Element:
    private::Sealed + Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Runtime tag of this element type.
    const DTYPE: DType;
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;
}
impl Element for f32 {
    const DTYPE: DType = DType::F32;
}
impl Element for i64 {
    const DTYPE: DType = DType::I64;
}
impl Element for i32 {
    const DTYPE: DType = DType::I32;
}
impl Element for bool {
    const DTYPE: DType = DType::Bool;
}
impl Element for Vector3d {
    const DTYPE: DType = DType::Vector3d;
}
impl Element for EventList {
    const DTYPE: DType = DType::SparseF64;
}
impl Element for BinRange {
    const DTYPE: DType = DType::BinRange;
}

// ---------------------------------------------------------------------------
// Vector3d
// ---------------------------------------------------------------------------

/// A 3-component `f64` vector, e.g. a detector position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3d(pub [f64; 3]);

impl Vector3d {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.0[0]
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.0[1]
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.0[2]
    }

    pub fn dot(&self, other: &Vector3d) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Add for Vector3d {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self([self.0[0] + rhs.0[0], self.0[1] + rhs.0[1], self.0[2] + rhs.0[2]])
    }
}

impl Sub for Vector3d {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self([self.0[0] - rhs.0[0], self.0[1] - rhs.0[1], self.0[2] - rhs.0[2]])
    }
}

impl Neg for Vector3d {
    type Output = Self;
    fn neg(self) -> Self {
        Self([-self.0[0], -self.0[1], -self.0[2]])
    }
}

impl Mul<f64> for Vector3d {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self([self.0[0] * rhs, self.0[1] * rhs, self.0[2] * rhs])
    }
}

impl Div<f64> for Vector3d {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self([self.0[0] / rhs, self.0[1] / rhs, self.0[2] / rhs])
    }
}

// ---------------------------------------------------------------------------
// EventList / BinRange
// ---------------------------------------------------------------------------

/// Ragged per-cell list of values.
pub type EventList = Vec<f64>;

/// Half-open range `[begin, end)` into a bin buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BinRange {
    pub begin: usize,
    pub end: usize,
}

impl BinRange {
    pub const fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    /// Number of entries in the range (0 for an inverted range).
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// Same length, shifted by `offset`.
    #[inline]
    pub fn shifted(&self, offset: usize) -> Self {
        Self::new(self.begin + offset, self.end + offset)
    }
}

impl From<(usize, usize)> for BinRange {
    fn from((begin, end): (usize, usize)) -> Self {
        Self::new(begin, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_tags() {
        assert_eq!(<f64 as Element>::DTYPE, DType::F64);
        assert_eq!(<EventList as Element>::DTYPE, DType::SparseF64);
        assert_eq!(<BinRange as Element>::DTYPE, DType::BinRange);
        assert!(DType::F32.supports_variances());
        assert!(!DType::I64.supports_variances());
        assert!(DType::SparseF64.is_sparse());
    }

    #[test]
    fn test_vector_arithmetic() {
        let a = Vector3d::new(1.0, 2.0, 3.0);
        let b = Vector3d::new(0.5, 0.5, 0.5);
        assert_eq!(a + b, Vector3d::new(1.5, 2.5, 3.5));
        assert_eq!(a - b, Vector3d::new(0.5, 1.5, 2.5));
        assert_eq!(a * 2.0, Vector3d::new(2.0, 4.0, 6.0));
        assert_eq!(-a, Vector3d::new(-1.0, -2.0, -3.0));
        assert_eq!(Vector3d::new(3.0, 4.0, 0.0).norm(), 5.0);
    }

    #[test]
    fn test_bin_range() {
        let r = BinRange::new(2, 5);
        assert_eq!(r.len(), 3);
        assert!(!r.is_empty());
        assert_eq!(r.shifted(10), BinRange::new(12, 15));
        assert!(BinRange::new(4, 4).is_empty());
        assert_eq!(BinRange::from((1, 2)), BinRange::new(1, 2));
    }
}
