//! Dimension-labeled layouts and shared, type-erased-ready storage.
//!
//! # Core Types
//!
//! - [`Dim`] / [`Dimensions`]: axis labels and ordered label → extent maps
//! - [`ViewLayout`] / [`ViewIndex`]: offset, per-axis strides and an odometer
//!   over the buffer offsets a view visits
//! - [`Storage`]: an owned dense array or a view into one, both holding a
//!   shared [`Buffer`]
//! - [`StridedView`] / [`StridedViewMut`]: borrowed element access through a layout
//!
//! # Metadata Transformations
//!
//! These operate only on offset/dims/strides and never touch element data:
//! - `slice`: point or range selection along one label
//! - `broadcast_to`: add axes with stride 0
//! - `transpose`: reorder labels

pub mod dims;
pub mod layout;
pub mod storage;
pub mod view;

pub use dims::{Dim, Dimensions, NDIM_MAX};
pub use layout::{Slice, ViewIndex, ViewLayout};
pub use storage::{ArrayView, Buffer, DenseArray, ReadGuard, Storage, WriteGuard};
pub use view::{StridedView, StridedViewMut};

// ============================================================================
// Error types
// ============================================================================

/// Errors from dimension bookkeeping, slicing and broadcasting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DimensionError {
    /// More labels than [`NDIM_MAX`].
    #[error("too many dimensions: {0} (max {NDIM_MAX})")]
    TooManyDimensions(usize),

    /// The same label appears twice.
    #[error("duplicate dimension label {0}")]
    Duplicate(Dim),

    #[error("negative extent {extent} for dimension {dim}")]
    NegativeExtent { dim: Dim, extent: i64 },

    #[error("invalid dimension label")]
    InvalidLabel,

    /// A label was looked up in dimensions that do not contain it.
    #[error("dimension {dim} not found in {dims}")]
    NotFound { dim: Dim, dims: Dimensions },

    #[error("extent mismatch for dimension {dim}: expected {expected}, got {actual}")]
    ExtentMismatch {
        dim: Dim,
        expected: usize,
        actual: usize,
    },

    /// Two layouts were required to have identical dimensions.
    #[error("dimensions mismatch: expected {expected}, got {actual}")]
    Mismatch {
        expected: Dimensions,
        actual: Dimensions,
    },

    #[error("{order:?} is not a permutation of {dims}")]
    InvalidOrder { dims: Dimensions, order: Vec<Dim> },

    /// `from` has a label missing from `to`.
    #[error("cannot broadcast {from} to {to}")]
    Broadcast { from: Dimensions, to: Dimensions },

    #[error("cannot reshape {from} to {to}: volumes differ")]
    VolumeMismatch { from: Dimensions, to: Dimensions },

    #[error("slice [{begin}, {end}) out of range for dimension {dim} with extent {extent}")]
    SliceOutOfRange {
        dim: Dim,
        begin: usize,
        end: usize,
        extent: usize,
    },

    /// Number of supplied values differs from the volume.
    #[error("expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Writes through a layout with stride-0 axes would alias.
    #[error("cannot write through broadcast view {0}")]
    BroadcastWrite(Dimensions),

    /// A layout reaches past the end of its buffer.
    #[error("view spans {span} elements but buffer holds {len}")]
    OutOfBounds { span: usize, len: usize },
}

/// Result type for dimension and layout operations.
pub type Result<T> = std::result::Result<T, DimensionError>;
