use scivar_kernel::for_each_group_mut;
use scivar_traits::ValueAndVariance;
use scivar_view::DimensionError;
use tracing::debug;

use super::bin_ranges;
use crate::algorithms::{edges_along, find_bin, values_f64, variances_f64};
use crate::data_array::DataArray;
use crate::variable::Variable;
use crate::{Error, Result};

/// Histogram the events of every cell of `binned` over `edges`.
///
/// The edges label the buffer coordinate that is histogrammed. Bins are
/// half-open `[edges[i], edges[i + 1])`; events outside `[first, last)` and
/// masked events are skipped. The result has the dimensions of `binned`
/// followed by the edge dimension, the unit of the buffer data, and summed
/// variances when the buffer carries them.
pub fn histogram(binned: &Variable, edges: &Variable) -> Result<DataArray> {
    let bins = binned
        .bins()
        .ok_or_else(|| Error::BinnedData("histogram requires binned data".into()))?;
    let dim = edges
        .dims()
        .inner()
        .ok_or_else(|| Error::BinEdge("edges must be one-dimensional".into()))?;
    let edge_values = edges_along(edges, dim)?;
    let buffer = bins.buffer();
    if buffer.dims().ndim() != 1 {
        return Err(Error::BinnedData(format!(
            "histogram requires a one-dimensional buffer, got {}",
            buffer.dims()
        )));
    }
    let coord = buffer.coord(dim)?;
    if coord.unit() != edges.unit() {
        return Err(Error::Unit(format!(
            "edges in {} for a coordinate in {}",
            edges.unit(),
            coord.unit()
        )));
    }
    let mut out_dims = binned.dims();
    out_dims.add_inner(dim, edge_values.len() - 1)?;

    let x = values_f64(coord)?;
    let data = buffer.data();
    let weights = values_f64(data)?;
    let variances = data.has_variances().then(|| variances_f64(data)).transpose()?;
    let masked = buffer.combined_mask()?;
    let ranges = bin_ranges(binned)?;
    let extent = weights.len();
    if let Some(r) = ranges.iter().find(|r| r.end > extent) {
        return Err(DimensionError::SliceOutOfRange {
            dim: bins.dim(),
            begin: r.begin,
            end: r.end,
            extent,
        }
        .into());
    }

    let nbin = edge_values.len() - 1;
    let mut out = vec![ValueAndVariance::<f64>::default(); out_dims.volume()];
    for_each_group_mut(&mut out, nbin, &|cell, row: &mut [ValueAndVariance<f64>]| {
        let range = ranges[cell];
        for k in range.begin..range.end {
            if masked.as_ref().is_some_and(|m| m[k]) {
                continue;
            }
            if let Some(b) = find_bin(&edge_values, x[k]) {
                let var = variances.as_ref().map_or(0.0, |v| v[k]);
                row[b] = row[b] + ValueAndVariance::new(weights[k], var);
            }
        }
    });
    if tracing::enabled!(tracing::Level::DEBUG) {
        let dropped = ranges
            .iter()
            .flat_map(|r| r.begin..r.end)
            .filter(|&k| find_bin(&edge_values, x[k]).is_none())
            .count();
        debug!(dropped, bins = nbin, cells = ranges.len(), "histogram");
    }

    let values: Vec<f64> = out.iter().map(|v| v.value).collect();
    let hist = match variances {
        Some(_) => {
            let vars: Vec<f64> = out.iter().map(|v| v.variance).collect();
            Variable::with_variances(out_dims, data.unit(), values, vars)?
        }
        None => Variable::new(out_dims, data.unit(), values)?,
    };
    DataArray::new(hist).with_coord(dim, edges.copy()?)
}
