//! Redistribution of counts from one set of bin edges to another.
//!
//! Every old bin contributes to each overlapping new bin in proportion to
//! the overlap, so the total is conserved wherever the new edges cover the
//! old ones. The sweep runs on rows with `dim` innermost; rows are
//! independent and are spread over threads by [`for_each_group_mut`].

use num_traits::Float;
use scivar_kernel::for_each_group_mut;
use scivar_traits::DType;
use scivar_view::{Dim, Dimensions};
use smallvec::SmallVec;
use tracing::debug;

use super::{counts_to_density, density_to_counts, edges_along};
use crate::concept::VariableElement;
use crate::variable::Variable;
use crate::{Error, Result};

/// Rebin `var` along `dim` from `old_edges` to `new_edges`.
///
/// `var` must hold counts or a count density. A density is converted to
/// counts with the old bin widths first and back with the new widths after.
pub fn rebin(var: &Variable, dim: Dim, old_edges: &Variable, new_edges: &Variable) -> Result<Variable> {
    if !matches!(var.dtype(), DType::F64 | DType::F32) {
        return Err(Error::Type(format!("rebin requires float data, got {}", var.dtype())));
    }
    if var.is_binned() {
        return Err(Error::BinnedData("rebin requires dense data".into()));
    }
    let old = edges_along(old_edges, dim)?;
    let new = edges_along(new_edges, dim)?;
    if old.len() != var.dims().extent(dim)? + 1 {
        return Err(Error::BinEdge(format!(
            "{} old edges along {dim} for {} bins",
            old.len(),
            var.dims().extent(dim)?
        )));
    }
    if old_edges.unit() != new_edges.unit() {
        return Err(Error::Unit(format!(
            "old edges in {} but new edges in {}",
            old_edges.unit(),
            new_edges.unit()
        )));
    }
    let unit = var.unit();
    if unit.is_counts() {
        rebin_counts(var, dim, &old, &new)
    } else if unit.is_count_density() {
        debug!(%unit, "rebin: converting density to counts and back");
        let counts = density_to_counts(var, dim, old_edges)?;
        let rebinned = rebin_counts(&counts, dim, &old, &new)?;
        counts_to_density(&rebinned, dim, new_edges)
    } else {
        Err(Error::Unit(format!(
            "rebin requires counts or a count density, got {unit}"
        )))
    }
}

fn rebin_counts(var: &Variable, dim: Dim, old: &[f64], new: &[f64]) -> Result<Variable> {
    let dims = var.dims();
    let mut order: SmallVec<[Dim; 6]> = dims.labels().iter().copied().filter(|d| *d != dim).collect();
    order.push(dim);
    let inner = var.transpose(&order)?;
    let mut out_dims: Dimensions = inner.dims();
    out_dims.resize(dim, new.len() - 1)?;

    let out = match var.dtype() {
        DType::F64 => {
            let values = sweep_rows(&inner.values::<f64>()?, old, new);
            let variances = inner
                .has_variances()
                .then(|| inner.variances::<f64>().map(|v| sweep_rows(&v, old, new)))
                .transpose()?;
            build(out_dims, var, values, variances)?
        }
        DType::F32 => {
            let values = sweep_rows(&inner.values::<f32>()?, old, new);
            let variances = inner
                .has_variances()
                .then(|| inner.variances::<f32>().map(|v| sweep_rows(&v, old, new)))
                .transpose()?;
            build(out_dims, var, values, variances)?
        }
        other => return Err(Error::Type(format!("rebin requires float data, got {other}"))),
    };
    out.transpose(dims.labels())?.copy()
}

fn build<T: VariableElement>(
    dims: Dimensions,
    like: &Variable,
    values: Vec<T>,
    variances: Option<Vec<T>>,
) -> Result<Variable> {
    match variances {
        Some(v) => Variable::with_variances(dims, like.unit(), values, v),
        None => Variable::new(dims, like.unit(), values),
    }
}

/// Rebin every row of `src` (rows of `old.len() - 1` bins).
fn sweep_rows<T: Float + Send + Sync>(src: &[T], old: &[f64], new: &[f64]) -> Vec<T> {
    let (nold, nnew) = (old.len() - 1, new.len() - 1);
    let nrows = if nold == 0 { 0 } else { src.len() / nold };
    let mut out = vec![T::zero(); nrows * nnew];
    for_each_group_mut(&mut out, nnew, &|row, dst: &mut [T]| {
        sweep(&src[row * nold..(row + 1) * nold], old, new, dst);
    });
    out
}

/// Two-pointer merge of the old and new edges, adding
/// `src[i] * overlap / width_i` to every overlapping new bin.
fn sweep<T: Float>(src: &[T], old: &[f64], new: &[f64], dst: &mut [T]) {
    let (nold, nnew) = (old.len() - 1, new.len() - 1);
    let (mut io, mut inw) = (0, 0);
    while io < nold && inw < nnew {
        let (olo, ohi) = (old[io], old[io + 1]);
        let (nlo, nhi) = (new[inw], new[inw + 1]);
        if nhi <= olo {
            inw += 1;
            continue;
        }
        if ohi <= nlo {
            io += 1;
            continue;
        }
        let width = ohi - olo;
        if width > 0.0 {
            let overlap = ohi.min(nhi) - olo.max(nlo);
            let fraction = T::from(overlap / width).unwrap_or_else(T::zero);
            dst[inw] = dst[inw] + src[io] * fraction;
        }
        if ohi <= nhi {
            io += 1;
        } else {
            inw += 1;
        }
    }
}
