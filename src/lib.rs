//! Dimension-labeled, type-erased arrays with variances, strided views and
//! binned event data.
//!
//! # Core Types
//!
//! - [`Variable`]: a labeled n-dimensional array with a [`Unit`], optional
//!   variances and one of several element types ([`DType`])
//! - [`DataArray`]: a [`Variable`] with coordinates and boolean masks
//! - [`Bins`]: the shared buffer behind a binned variable whose elements are
//!   [`BinRange`]s into it
//!
//! # Operations
//!
//! - Arithmetic: [`plus`], [`minus`], [`times`], [`divide`] and their
//!   `_equals` forms, plus [`negative`], [`sqrt`] and [`abs`]. Operands are
//!   broadcast by label, variances propagate and units combine.
//! - Reductions: [`sum`] and [`mean`] over one dimension
//! - Binned data: [`make_bins`], [`bins_sum`], [`bins_size`],
//!   [`bins_concatenate`], [`bins_append`], [`bins_flatten`],
//!   [`histogram`], [`map`] and [`scale`]
//! - Algorithms: [`rebin`], [`concatenate`], [`groupby`],
//!   [`counts_to_density`] and [`density_to_counts`]
//!
//! Views produced by [`Variable::slice`], [`Variable::transpose`] and
//! [`Variable::broadcast`] share the buffer of their source. Writing through
//! a view writes into the source.
//!
//! # Example
//!
//! ```rust
//! use scivar::{plus_equals, Dim, Dimensions, Slice, Unit, Variable};
//!
//! let dims = Dimensions::single(Dim::X, 4).unwrap();
//! let var = Variable::new(dims, Unit::m(), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
//!
//! // Add one to the first two elements through a view.
//! let mut head = var.slice(Slice::range(Dim::X, 0, 2)).unwrap();
//! plus_equals(&mut head, &Variable::scalar(1.0, Unit::m())).unwrap();
//! assert_eq!(var.values::<f64>().unwrap(), vec![2.0, 3.0, 3.0, 4.0]);
//! ```

pub mod algorithms;
pub mod bins;
pub mod concept;
pub mod data_array;
pub mod error;
pub mod operations;
pub mod reduction;
pub mod transform;
pub mod units;
pub mod variable;

pub use algorithms::{
    concatenate, counts_to_density, density_to_counts, groupby, rebin, GroupBy,
};
pub use bins::{
    bin_ranges, bins_append, bins_concatenate, bins_flatten, bins_size, bins_sum, histogram,
    make_bins, map, scale, values_as_bins, Bins,
};
pub use concept::{VariableConcept, VariableElement};
pub use data_array::DataArray;
pub use error::{Error, Result};
pub use operations::{
    abs, abs_in_place, divide, divide_equals, minus, minus_equals, negative, plus, plus_equals,
    sqrt, sqrt_in_place, times, times_equals,
};
pub use reduction::{mean, sum};
pub use transform::{
    transform, transform_in_place, transform_unary, transform_unary_in_place, Abs, BinaryOp,
    Divide, Minus, Negative, Plus, Sqrt, Times, UnaryOp,
};
pub use units::Unit;
pub use variable::Variable;

pub use scivar_traits::{BinRange, DType, EventList, ValueAndVariance, Vector3d};
pub use scivar_view::{Dim, DimensionError, Dimensions, Slice, NDIM_MAX};
