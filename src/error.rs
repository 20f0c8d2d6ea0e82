use scivar_view::DimensionError;

/// Errors that can occur in variable, binned-data and algorithm operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Axis not found, duplicate axis, shape/volume mismatch, broadcast conflict.
    #[error(transparent)]
    Dimension(#[from] DimensionError),

    /// No matching element-type combination, or an operation unsupported for a dtype.
    #[error("type error: {0}")]
    Type(String),

    /// Incompatible or forbidden unit combination.
    #[error("unit error: {0}")]
    Unit(String),

    /// Missing or mismatched variances.
    #[error("variances error: {0}")]
    Variances(String),

    /// Mismatched event-list lengths.
    #[error("size error: {0}")]
    Size(String),

    /// Incompatible bin buffers or bin contents.
    #[error("binned data error: {0}")]
    BinnedData(String),

    /// A coordinate was required to be bin-edge shaped.
    #[error("bin-edge error: {0}")]
    BinEdge(String),

    #[error("unaligned error: {0}")]
    Unaligned(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Edges that must be sorted are not.
    #[error("ordering error: {0}")]
    Ordering(String),

    /// Missing coordinate or mask.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type for scivar operations.
pub type Result<T> = std::result::Result<T, Error>;
