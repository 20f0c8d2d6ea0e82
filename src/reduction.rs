//! Reductions along one dimension.

use scivar_view::{Dim, Slice};
use tracing::trace;

use crate::bins::bins_flatten;
use crate::operations::times_equals;
use crate::transform::{apply_binary, Plus};
use crate::units::Unit;
use crate::variable::Variable;
use crate::Result;

/// Sum over `dim`. Variances add up.
///
/// For binned data the cells along `dim` are concatenated instead.
pub fn sum(var: &Variable, dim: Dim) -> Result<Variable> {
    if var.is_binned() {
        return bins_flatten(var, dim);
    }
    let dims = var.dims();
    let extent = dims.extent(dim)?;
    let mut out = var.zeros_like(dims.without(dim)?);
    trace!(%dim, extent, "sum");
    for i in 0..extent {
        apply_binary::<Plus>(&mut out, &var.slice(Slice::point(dim, i))?)?;
    }
    Ok(out)
}

/// Mean over `dim`. Integer variables are rejected.
pub fn mean(var: &Variable, dim: Dim) -> Result<Variable> {
    let extent = var.dims().extent(dim)?;
    let mut out = sum(var, dim)?;
    times_equals(
        &mut out,
        &Variable::scalar(1.0 / extent as f64, Unit::dimensionless()),
    )?;
    Ok(out)
}
