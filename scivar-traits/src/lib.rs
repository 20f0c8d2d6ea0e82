//! Shared element types for the scivar crates.
//!
//! This crate defines the closed element-type set and the arithmetic bounds
//! used by `scivar-view`, `scivar-kernel` and `scivar`:
//!
//! - [`DType`] / [`Element`]: runtime tag and sealed trait for storable types
//! - [`Vector3d`], [`EventList`], [`BinRange`]: the non-scalar element types
//! - [`ValueAndVariance`]: value with first-order uncertainty propagation
//! - [`Arithmetic`] / [`FloatArithmetic`]: bounds elementwise ops are written against

pub mod arithmetic;
pub mod element;
pub mod value_variance;

pub use arithmetic::{Arithmetic, FloatArithmetic};
pub use element::{BinRange, DType, Element, EventList, Vector3d};
pub use value_variance::ValueAndVariance;
