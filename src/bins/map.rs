use std::collections::BTreeMap;

use scivar_view::{Dim, Dimensions};

use super::{bin_ranges, Bins};
use crate::algorithms::{edges_along, find_bin, values_f64, variances_f64};
use crate::data_array::DataArray;
use crate::operations::times_equals;
use crate::variable::Variable;
use crate::{Error, Result};

/// Per-event lookup of `hist` along `dim`.
///
/// Every event of `binned` receives the value of the histogram bin its `dim`
/// coordinate falls into, using the same half-open rule as
/// [`histogram`](super::histogram). Events outside the edges and events in
/// masked histogram bins receive zero. The result is binned like `binned`:
/// it shares the ranges and the buffer coordinates, with the looked-up
/// factors as buffer data.
pub fn map(hist: &DataArray, binned: &Variable, dim: Dim) -> Result<Variable> {
    let bins = binned
        .bins()
        .ok_or_else(|| Error::BinnedData("map requires binned data".into()))?;
    if !hist.is_edges(dim) {
        return Err(Error::BinEdge(format!(
            "histogram coordinate for {dim} must be bin edges"
        )));
    }
    let edges = edges_along(hist.coord(dim)?, dim)?;
    let nbin = edges.len() - 1;
    let buffer = bins.buffer();
    let x = values_f64(buffer.coord(dim)?)?;

    let mut target = binned.dims();
    target.add_inner(dim, nbin)?;
    let data = hist.data().broadcast(&target)?;
    let values = values_f64(&data)?;
    let variances = data
        .has_variances()
        .then(|| variances_f64(&data))
        .transpose()?;
    let mut masked = vec![false; target.volume()];
    for mask in hist.masks().values() {
        for (m, v) in masked
            .iter_mut()
            .zip(mask.broadcast(&target)?.values::<bool>()?)
        {
            *m |= v;
        }
    }

    let mut factors = vec![0.0; x.len()];
    let mut factor_variances = variances.as_ref().map(|_| vec![0.0; x.len()]);
    for (cell, range) in bin_ranges(binned)?.iter().enumerate() {
        for k in range.begin..range.end {
            let Some(b) = find_bin(&edges, x[k]) else {
                continue;
            };
            let i = cell * nbin + b;
            if masked[i] {
                continue;
            }
            factors[k] = values[i];
            if let (Some(out), Some(v)) = (factor_variances.as_mut(), variances.as_ref()) {
                out[k] = v[i];
            }
        }
    }

    let event_dims = Dimensions::single(bins.dim(), x.len())?;
    let factor = match factor_variances {
        Some(v) => Variable::with_variances(event_dims, hist.data().unit(), factors, v)?,
        None => Variable::new(event_dims, hist.data().unit(), factors)?,
    };
    let coords: BTreeMap<_, _> = buffer
        .coords()
        .iter()
        .map(|(d, c)| (*d, c.share()))
        .collect();
    let buffer = DataArray::from_parts(factor, coords, BTreeMap::new());
    Ok(Variable::from_bins(
        binned.values_concept().clone(),
        Bins::new(bins.dim(), buffer),
    ))
}

/// Multiply every event of `binned` by the bin of `hist` it falls into.
///
/// `hist` must have exactly one dimension that `binned` lacks, and its
/// coordinate along that dimension must be bin edges.
pub fn scale(binned: &mut Variable, hist: &DataArray) -> Result<()> {
    let outer = binned.dims();
    let candidates: Vec<Dim> = hist
        .dims()
        .labels()
        .iter()
        .copied()
        .filter(|d| !outer.contains(*d))
        .collect();
    let dim = match candidates.as_slice() {
        [dim] => *dim,
        [] => {
            return Err(Error::BinEdge(
                "histogram has no dimension to map events onto".into(),
            ))
        }
        _ => {
            return Err(Error::NotImplemented(format!(
                "scaling by a histogram over several dimensions {}",
                hist.dims()
            )))
        }
    };
    if !hist.is_edges(dim) {
        return Err(Error::BinEdge(format!(
            "histogram coordinate for {dim} must be bin edges"
        )));
    }
    let factors = map(hist, binned, dim)?;
    times_equals(binned, &factors)
}
