//! Aggregation algorithms over dense and binned variables.

mod concatenate;
mod counts;
mod groupby;
mod rebin;

pub use concatenate::concatenate;
pub use counts::{counts_to_density, density_to_counts};
pub use groupby::{groupby, GroupBy};
pub use rebin::rebin;

use scivar_traits::DType;
use scivar_view::Dim;

use crate::variable::Variable;
use crate::{Error, Result};

/// Values of a float variable, widened to `f64`.
pub(crate) fn values_f64(var: &Variable) -> Result<Vec<f64>> {
    match var.dtype() {
        DType::F64 => var.values::<f64>(),
        DType::F32 => Ok(var.values::<f32>()?.into_iter().map(f64::from).collect()),
        other => Err(Error::Type(format!("expected a float variable, got {other}"))),
    }
}

/// Variances of a float variable, widened to `f64`.
pub(crate) fn variances_f64(var: &Variable) -> Result<Vec<f64>> {
    match var.dtype() {
        DType::F64 => var.variances::<f64>(),
        DType::F32 => Ok(var.variances::<f32>()?.into_iter().map(f64::from).collect()),
        other => Err(Error::Type(format!("expected a float variable, got {other}"))),
    }
}

/// Bin edges along `dim`: one-dimensional, at least two, non-decreasing.
pub(crate) fn edges_along(edges: &Variable, dim: Dim) -> Result<Vec<f64>> {
    let dims = edges.dims();
    if dims.ndim() != 1 || !dims.contains(dim) {
        return Err(Error::BinEdge(format!(
            "edges must be one-dimensional along {dim}, got {dims}"
        )));
    }
    let values = values_f64(edges)?;
    if values.len() < 2 {
        return Err(Error::BinEdge(format!(
            "need at least two edges along {dim}, got {}",
            values.len()
        )));
    }
    if values.windows(2).any(|w| !(w[0] <= w[1])) {
        return Err(Error::Ordering(format!("edges along {dim} are not sorted")));
    }
    Ok(values)
}

/// Index of the bin `[edges[i], edges[i + 1])` holding `x`, if any.
///
/// Bins are half-open, so `x` equal to the last edge is outside.
pub(crate) fn find_bin(edges: &[f64], x: f64) -> Option<usize> {
    let (first, last) = (edges[0], edges[edges.len() - 1]);
    if !(x >= first && x < last) {
        return None;
    }
    Some(edges.partition_point(|e| *e <= x) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Unit;
    use scivar_view::Dimensions;

    fn tof(values: Vec<f64>) -> Variable {
        let dims = Dimensions::single(Dim::Tof, values.len()).unwrap();
        Variable::new(dims, Unit::us(), values).unwrap()
    }

    #[test]
    fn test_edges_validation() {
        assert!(matches!(edges_along(&tof(vec![1.0]), Dim::Tof), Err(Error::BinEdge(_))));
        assert!(matches!(
            edges_along(&tof(vec![0.0, 2.0, 1.0]), Dim::Tof),
            Err(Error::Ordering(_))
        ));
        assert!(matches!(edges_along(&tof(vec![0.0, 1.0]), Dim::X), Err(Error::BinEdge(_))));
        assert_eq!(edges_along(&tof(vec![0.0, 1.0, 1.0]), Dim::Tof).unwrap().len(), 3);
    }

    #[test]
    fn test_find_bin_is_half_open() {
        let edges = [0.0, 1.0, 2.0, 4.0];
        assert_eq!(find_bin(&edges, 0.0), Some(0));
        assert_eq!(find_bin(&edges, 1.0), Some(1));
        assert_eq!(find_bin(&edges, 3.9), Some(2));
        assert_eq!(find_bin(&edges, 4.0), None);
        assert_eq!(find_bin(&edges, -0.5), None);
        assert_eq!(find_bin(&edges, f64::NAN), None);
        assert_eq!(find_bin(&[0.0, 1.0, 1.0, 2.0], 1.0), Some(2));
    }
}
