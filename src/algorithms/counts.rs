//! Conversion between counts and counts per unit of a binned coordinate.

use scivar_view::{Dim, Dimensions};
use tracing::trace;

use super::edges_along;
use crate::operations::{divide, times};
use crate::variable::Variable;
use crate::{Error, Result};

/// Widths `edges[i + 1] - edges[i]` along `dim`, in the unit of the edges.
fn bin_widths(var: &Variable, dim: Dim, edges: &Variable) -> Result<Variable> {
    let values = edges_along(edges, dim)?;
    let extent = var.dims().extent(dim)?;
    if values.len() != extent + 1 {
        return Err(Error::BinEdge(format!(
            "{} edges along {dim} for {extent} bins",
            values.len()
        )));
    }
    let widths: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    Variable::new(Dimensions::single(dim, extent)?, edges.unit(), widths)
}

/// Divide counts by the bin widths along `dim`.
pub fn counts_to_density(var: &Variable, dim: Dim, edges: &Variable) -> Result<Variable> {
    if !var.unit().is_counts() {
        return Err(Error::Unit(format!(
            "expected counts, got {}",
            var.unit()
        )));
    }
    let widths = bin_widths(var, dim, edges)?;
    trace!(%dim, "counts to density");
    divide(var, &widths)
}

/// Multiply a count density by the bin widths along `dim`.
pub fn density_to_counts(var: &Variable, dim: Dim, edges: &Variable) -> Result<Variable> {
    if !var.unit().is_count_density() || !(var.unit() * edges.unit()).is_counts() {
        return Err(Error::Unit(format!(
            "expected counts per {}, got {}",
            edges.unit(),
            var.unit()
        )));
    }
    let widths = bin_widths(var, dim, edges)?;
    trace!(%dim, "density to counts");
    times(var, &widths)
}
