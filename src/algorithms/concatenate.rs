use scivar_traits::BinRange;
use scivar_view::{Dim, DimensionError, Dimensions, Slice};
use tracing::trace;

use crate::bins::{bin_ranges, bins_concatenate, compact, gather, Bins};
use crate::units::Unit;
use crate::variable::Variable;
use crate::{Error, Result};

/// Join `a` and `b` along `dim`.
///
/// An operand without `dim` contributes a single slice; if neither has it,
/// `dim` becomes the new outermost dimension with extent 2. All other
/// dimensions must agree. Binned operands are joined along their outer
/// dimensions into a fresh buffer; along the bin dimension itself the cells
/// are concatenated pairwise.
pub fn concatenate(a: &Variable, b: &Variable, dim: Dim) -> Result<Variable> {
    match (a.bins(), b.bins()) {
        (None, None) => concatenate_dense(a, b, dim),
        (Some(ba), Some(_)) if ba.dim() == dim => bins_concatenate(a, b),
        (Some(_), Some(_)) => concatenate_binned(a, b, dim),
        _ => Err(Error::BinnedData(
            "cannot concatenate binned and dense data".into(),
        )),
    }
}

fn extent_or_one(dims: &Dimensions, dim: Dim) -> usize {
    dims.extent(dim).unwrap_or(1)
}

fn output_dims(a: &Dimensions, b: &Dimensions, dim: Dim) -> Result<Dimensions> {
    let (ra, rb) = (without(a, dim)?, without(b, dim)?);
    if !ra.contains_all(&rb) || !rb.contains_all(&ra) {
        return Err(Error::Dimension(DimensionError::Mismatch {
            expected: ra,
            actual: rb,
        }));
    }
    for (d, extent) in rb.iter() {
        let expected = ra.extent(d)?;
        if expected != extent {
            return Err(Error::Dimension(DimensionError::ExtentMismatch {
                dim: d,
                expected,
                actual: extent,
            }));
        }
    }
    let total = extent_or_one(a, dim) + extent_or_one(b, dim);
    let mut out = if a.contains(dim) {
        *a
    } else if b.contains(dim) {
        *b
    } else {
        let mut out = *a;
        out.add(dim, 1)?;
        out
    };
    out.resize(dim, total)?;
    Ok(out)
}

fn without(dims: &Dimensions, dim: Dim) -> Result<Dimensions> {
    if dims.contains(dim) {
        Ok(dims.without(dim)?)
    } else {
        Ok(*dims)
    }
}

fn concatenate_dense(a: &Variable, b: &Variable, dim: Dim) -> Result<Variable> {
    if a.dtype() != b.dtype() {
        return Err(Error::Type(format!(
            "cannot concatenate {} and {}",
            a.dtype(),
            b.dtype()
        )));
    }
    if a.unit() != b.unit() {
        return Err(Error::Unit(format!(
            "cannot concatenate {} and {}",
            a.unit(),
            b.unit()
        )));
    }
    if a.has_variances() != b.has_variances() {
        return Err(Error::Variances(
            "concatenate requires variances on both operands or neither".into(),
        ));
    }
    let (da, db) = (a.dims(), b.dims());
    let dims = output_dims(&da, &db, dim)?;
    trace!(%dim, %dims, "concatenate");
    let mut out = a.zeros_like(dims);
    let split = extent_or_one(&da, dim);
    {
        let mut head = out.slice(Slice::range(dim, 0, split))?;
        head.assign(a)?;
    }
    {
        let mut tail = out.slice(Slice::range(dim, split, dims.extent(dim)?))?;
        tail.assign(b)?;
    }
    Ok(out)
}

fn concatenate_binned(a: &Variable, b: &Variable, dim: Dim) -> Result<Variable> {
    let (Some(ba), Some(bb)) = (a.bins(), b.bins()) else {
        return Err(Error::BinnedData("concatenate requires binned data".into()));
    };
    if ba.dim() != bb.dim() {
        return Err(Error::BinnedData(format!(
            "cannot concatenate bins along {} and {}",
            ba.dim(),
            bb.dim()
        )));
    }
    ba.buffer().ensure_compatible_columns(bb.buffer())?;

    let (ra, rb) = (bin_ranges(a)?, bin_ranges(b)?);
    let segments: Vec<_> = ra
        .iter()
        .map(|r| (ba.buffer(), *r))
        .chain(rb.iter().map(|r| (bb.buffer(), *r)))
        .collect();
    let buffer = gather(ba.buffer(), ba.dim(), &segments)?;

    let head = compact(&ra);
    let shift = head.last().map_or(0, |r| r.end);
    let tail: Vec<BinRange> = compact(&rb).into_iter().map(|r| r.shifted(shift)).collect();
    let ia = Variable::new(a.dims(), Unit::dimensionless(), head)?;
    let ib = Variable::new(b.dims(), Unit::dimensionless(), tail)?;
    let indices = concatenate_dense(&ia, &ib, dim)?;
    Ok(Variable::from_bins(
        indices.values_concept().clone(),
        Bins::new(ba.dim(), buffer),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bins::{bins_size, bins_sum, make_bins};
    use crate::data_array::DataArray;
    use crate::operations::plus;

    #[test]
    fn test_scalars_then_outer() {
        let a = Variable::scalar(1.0, Unit::m());
        let b = Variable::scalar(2.0, Unit::m());
        let ab = concatenate(&a, &b, Dim::Tof).unwrap();
        assert_eq!(ab.dims(), Dimensions::single(Dim::Tof, 2).unwrap());
        assert_eq!(ab.values::<f64>().unwrap(), vec![1.0, 2.0]);
        let twice = concatenate(&ab, &ab, Dim::X).unwrap();
        assert_eq!(
            twice.dims(),
            Dimensions::new(&[(Dim::X, 2), (Dim::Tof, 2)]).unwrap()
        );
        assert_eq!(twice.values::<f64>().unwrap(), vec![1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_along_existing_and_transposed() {
        let a = Variable::with_variances(
            Dimensions::new(&[(Dim::X, 1), (Dim::Y, 2)]).unwrap(),
            Unit::counts(),
            vec![1.0, 2.0],
            vec![0.1, 0.2],
        )
        .unwrap();
        let b = Variable::with_variances(
            Dimensions::new(&[(Dim::Y, 2), (Dim::X, 2)]).unwrap(),
            Unit::counts(),
            vec![3.0, 5.0, 4.0, 6.0],
            vec![0.3, 0.5, 0.4, 0.6],
        )
        .unwrap();
        let c = concatenate(&a, &b, Dim::X).unwrap();
        assert_eq!(c.dims(), Dimensions::new(&[(Dim::X, 3), (Dim::Y, 2)]).unwrap());
        assert_eq!(c.values::<f64>().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(c.variances::<f64>().unwrap(), vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn test_mismatches() {
        let a = Variable::new(Dimensions::single(Dim::Y, 2).unwrap(), Unit::m(), vec![1.0, 2.0]).unwrap();
        let b = Variable::new(Dimensions::single(Dim::Y, 3).unwrap(), Unit::m(), vec![1.0; 3]).unwrap();
        assert!(matches!(concatenate(&a, &b, Dim::X), Err(Error::Dimension(_))));
        let s = Variable::new(Dimensions::single(Dim::Y, 2).unwrap(), Unit::s(), vec![1.0, 2.0]).unwrap();
        assert!(matches!(concatenate(&a, &s, Dim::X), Err(Error::Unit(_))));
        let i = Variable::new(Dimensions::single(Dim::Y, 2).unwrap(), Unit::m(), vec![1i64, 2]).unwrap();
        assert!(matches!(concatenate(&a, &i, Dim::X), Err(Error::Type(_))));
    }

    fn binned(weights: Vec<f64>, ranges: Vec<(usize, usize)>) -> Variable {
        let events = Dimensions::single(Dim::Event, weights.len()).unwrap();
        let buffer = DataArray::new(Variable::new(events, Unit::counts(), weights).unwrap());
        let indices = Variable::new(
            Dimensions::single(Dim::X, ranges.len()).unwrap(),
            Unit::dimensionless(),
            ranges.into_iter().map(BinRange::from).collect::<Vec<_>>(),
        )
        .unwrap();
        make_bins(&indices, Dim::Event, buffer).unwrap()
    }

    #[test]
    fn test_binned_outer_and_cellwise() {
        let a = binned(vec![1.0, 2.0, 3.0], vec![(1, 3), (0, 1)]);
        let b = binned(vec![4.0], vec![(0, 1)]);
        let c = concatenate(&a, &b, Dim::X).unwrap();
        assert_eq!(bins_size(&c).unwrap().values::<i64>().unwrap(), vec![2, 1, 1]);
        assert_eq!(
            bins_sum(&c).unwrap().values::<f64>().unwrap(),
            vec![5.0, 1.0, 4.0]
        );
        let d = concatenate(&a, &a, Dim::Event).unwrap();
        assert_eq!(
            bins_sum(&d).unwrap(),
            plus(&bins_sum(&a).unwrap(), &bins_sum(&a).unwrap()).unwrap()
        );
        let dense = Variable::new(Dimensions::single(Dim::X, 1).unwrap(), Unit::counts(), vec![1.0]).unwrap();
        assert!(matches!(concatenate(&a, &dense, Dim::X), Err(Error::BinnedData(_))));
    }
}
