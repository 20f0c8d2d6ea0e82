//! Elementwise kernels over strided scivar views.
//!
//! # Map Operations
//!
//! - [`map_in_place`], [`map2_in_place`]: unary update of values (and variances)
//! - [`zip2_in_place`], [`zip3_in_place`], [`zip4_in_place`]: binary update
//!   of values (and variances) from a source view (and its variances)
//!
//! # Group Loops
//!
//! - [`for_each_group_mut`]: run a closure per fixed-length output group,
//!   splitting across threads when the `parallel` feature is enabled
//!
//! Kernels are written in safe Rust: element access goes through bounds-checked
//! indexing of the slices behind [`StridedView`](scivar_view::StridedView) and
//! [`StridedViewMut`](scivar_view::StridedViewMut).

pub mod map_view;
pub mod maybe_sync;
pub mod threading;

pub use map_view::{map2_in_place, map_in_place, zip2_in_place, zip3_in_place, zip4_in_place};
pub use maybe_sync::{MaybeSend, MaybeSendSync, MaybeSync};
pub use threading::{for_each_group_mut, MINTHREADLENGTH};

/// Kernels only fail on shape disagreements.
pub type Result<T> = std::result::Result<T, scivar_view::DimensionError>;
