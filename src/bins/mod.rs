//! Binned (ragged) data: an index array of [`BinRange`] into a shared
//! buffer [`DataArray`].
//!
//! A binned [`Variable`] stores the ranges as its values and carries the
//! buffer in [`Bins`]. Every cell is the slice `begin..end` of the buffer
//! along the bin dimension. Slicing, transposing or broadcasting a binned
//! variable only touches the ranges; the buffer is shared.
//!
//! Operations that produce new binned data gather the referenced rows into a
//! fresh, compact buffer.

mod histogram;
mod map;
mod ops;

pub use histogram::histogram;
pub use map::{map, scale};
pub use ops::{bins_append, bins_concatenate, bins_flatten};
pub(crate) use ops::{merge_cells, transform_in_place, transform_unary_in_place};

use scivar_traits::{BinRange, DType};
use scivar_view::{Dim, DimensionError, Slice};

use crate::data_array::DataArray;
use crate::operations::plus_equals;
use crate::reduction::sum;
use crate::units::Unit;
use crate::variable::Variable;
use crate::{Error, Result};

/// The buffer behind a binned variable and the dimension it is binned along.
#[derive(Debug)]
pub struct Bins {
    dim: Dim,
    buffer: DataArray,
}

impl Bins {
    pub(crate) fn new(dim: Dim, buffer: DataArray) -> Self {
        Self { dim, buffer }
    }

    /// Dimension of the buffer the ranges index into.
    pub fn dim(&self) -> Dim {
        self.dim
    }

    pub fn buffer(&self) -> &DataArray {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut DataArray {
        &mut self.buffer
    }

    /// Second handle to the same buffer.
    pub fn share(&self) -> Self {
        Self {
            dim: self.dim,
            buffer: self.buffer.share(),
        }
    }

    /// View of the buffer rows of one cell.
    pub fn cell(&self, range: BinRange) -> Result<DataArray> {
        self.buffer
            .slice(Slice::range(self.dim, range.begin, range.end))
    }
}

fn not_binned(op: &str) -> Error {
    Error::BinnedData(format!("{op} requires binned data"))
}

/// Binned variable over `buffer` along `dim`, one cell per element of
/// `indices`. Neither the ranges nor the buffer are copied.
pub fn make_bins(indices: &Variable, dim: Dim, buffer: DataArray) -> Result<Variable> {
    if indices.dtype() != DType::BinRange || indices.is_binned() {
        return Err(Error::Type(format!(
            "bin indices must be {}, got {}",
            DType::BinRange,
            indices.dtype()
        )));
    }
    if indices.dims().contains(dim) {
        return Err(DimensionError::Duplicate(dim).into());
    }
    let extent = buffer.dims().extent(dim)?;
    for range in indices.values::<BinRange>()? {
        if range.begin > range.end || range.end > extent {
            return Err(DimensionError::SliceOutOfRange {
                dim,
                begin: range.begin,
                end: range.end,
                extent,
            }
            .into());
        }
    }
    Ok(Variable::from_bins(
        indices.values_concept().clone(),
        Bins::new(dim, buffer),
    ))
}

/// Ranges of every cell in row-major order.
pub fn bin_ranges(var: &Variable) -> Result<Vec<BinRange>> {
    if !var.is_binned() {
        return Err(not_binned("bin_ranges"));
    }
    var.values::<BinRange>()
}

/// Per-cell views into the buffer, in row-major order of the cells.
pub fn values_as_bins(var: &Variable) -> Result<Vec<DataArray>> {
    let bins = var.bins().ok_or_else(|| not_binned("values_as_bins"))?;
    bin_ranges(var)?
        .into_iter()
        .map(|r| bins.cell(r))
        .collect()
}

/// Number of events per cell.
pub fn bins_size(var: &Variable) -> Result<Variable> {
    let sizes = bin_ranges(var)?
        .iter()
        .map(|r| r.len() as i64)
        .collect::<Vec<_>>();
    Variable::new(var.dims(), Unit::dimensionless(), sizes)
}

/// Sum of the buffer data of every cell along the bin dimension.
pub fn bins_sum(var: &Variable) -> Result<Variable> {
    let bins = var.bins().ok_or_else(|| not_binned("bins_sum"))?;
    let dim = bins.dim();
    let data = bins.buffer().data();
    let outer = var.dims();
    let mut out_dims = data.dims().without(dim)?;
    for k in (0..outer.ndim()).rev() {
        out_dims.add(outer.label(k), outer.size(k))?;
    }
    let out = data.zeros_like(out_dims);
    let cells = values_as_bins(var)?;
    for (i, cell) in cells.iter().enumerate() {
        let mut target = out.view();
        let mut rem = i;
        for k in (0..outer.ndim()).rev() {
            let coord = rem % outer.size(k);
            rem /= outer.size(k);
            target = target.slice(Slice::point(outer.label(k), coord))?;
        }
        plus_equals(&mut target, &sum(cell.data(), dim)?)?;
    }
    Ok(out)
}

/// Deep equality of the cell contents; ranges may differ.
pub(crate) fn bins_equal(a: &Variable, b: &Variable) -> bool {
    let (Some(ba), Some(bb)) = (a.bins(), b.bins()) else {
        return false;
    };
    if ba.dim() != bb.dim() {
        return false;
    }
    match (values_as_bins(a), values_as_bins(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Copy with a compact buffer holding exactly the referenced rows in cell
/// order.
pub(crate) fn copy_binned(var: &Variable) -> Result<Variable> {
    let bins = var.bins().ok_or_else(|| not_binned("copy"))?;
    let ranges = bin_ranges(var)?;
    let segments: Vec<_> = ranges.iter().map(|r| (bins.buffer(), *r)).collect();
    let buffer = gather(bins.buffer(), bins.dim(), &segments)?;
    let indices = Variable::new(var.dims(), Unit::dimensionless(), compact(&ranges))?;
    Ok(Variable::from_bins(
        indices.values_concept().clone(),
        Bins::new(bins.dim(), buffer),
    ))
}

/// Back-to-back ranges with the lengths of `ranges`.
pub(crate) fn compact(ranges: &[BinRange]) -> Vec<BinRange> {
    let mut offset = 0;
    ranges
        .iter()
        .map(|r| {
            let out = BinRange::new(offset, offset + r.len());
            offset += r.len();
            out
        })
        .collect()
}

/// Concatenate rows of several buffers along `dim` into a fresh buffer with
/// the columns of `template`.
pub(crate) fn gather(
    template: &DataArray,
    dim: Dim,
    segments: &[(&DataArray, BinRange)],
) -> Result<DataArray> {
    let total = segments.iter().map(|(_, r)| r.len()).sum();
    let mut out = template.resized(dim, total)?;
    let mut offset = 0;
    for (source, range) in segments {
        if range.is_empty() {
            continue;
        }
        out.copy_range(source, dim, offset, range.begin, range.end)?;
        offset += range.len();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scivar_view::Dimensions;

    fn events(weights: Vec<f64>, tof: Vec<f64>) -> DataArray {
        let dims = Dimensions::single(Dim::Event, weights.len()).unwrap();
        DataArray::new(Variable::new(dims, Unit::counts(), weights).unwrap())
            .with_coord(Dim::Tof, Variable::new(dims, Unit::us(), tof).unwrap())
            .unwrap()
    }

    fn indices(ranges: Vec<(usize, usize)>) -> Variable {
        let dims = Dimensions::single(Dim::X, ranges.len()).unwrap();
        Variable::new(
            dims,
            Unit::dimensionless(),
            ranges.into_iter().map(BinRange::from).collect::<Vec<_>>(),
        )
        .unwrap()
    }

    #[test]
    fn test_make_bins_validates_ranges() {
        let buffer = events(vec![1.0, 2.0, 3.0], vec![0.0; 3]);
        assert!(make_bins(&indices(vec![(0, 2), (2, 4)]), Dim::Event, buffer.share()).is_err());
        assert!(make_bins(&indices(vec![(2, 1)]), Dim::Event, buffer.share()).is_err());
        let not_ranges = Variable::new(
            Dimensions::single(Dim::X, 1).unwrap(),
            Unit::dimensionless(),
            vec![0i64],
        )
        .unwrap();
        assert!(matches!(
            make_bins(&not_ranges, Dim::Event, buffer.share()),
            Err(Error::Type(_))
        ));
        let binned = make_bins(&indices(vec![(0, 1), (1, 3)]), Dim::Event, buffer).unwrap();
        assert!(binned.is_binned());
        assert_eq!(binned.unit(), Unit::counts());
    }

    #[test]
    fn test_cells_are_views_into_the_buffer() {
        let buffer = events(vec![1.0, 2.0, 3.0], vec![0.0; 3]);
        let binned = make_bins(&indices(vec![(0, 1), (1, 3)]), Dim::Event, buffer).unwrap();
        let cells = values_as_bins(&binned).unwrap();
        assert_eq!(cells[1].data().values::<f64>().unwrap(), vec![2.0, 3.0]);
        let mut data = cells[1].data().share();
        data.set_values(vec![20.0, 30.0]).unwrap();
        let all = binned.bins().unwrap().buffer().data().values::<f64>().unwrap();
        assert_eq!(all, vec![1.0, 20.0, 30.0]);
    }

    #[test]
    fn test_size_and_sum() {
        let buffer = events(vec![1.0, 2.0, 3.0, 4.0], vec![0.0; 4]);
        let binned = make_bins(&indices(vec![(0, 1), (1, 1), (1, 4)]), Dim::Event, buffer).unwrap();
        assert_eq!(bins_size(&binned).unwrap().values::<i64>().unwrap(), vec![1, 0, 3]);
        let s = bins_sum(&binned).unwrap();
        assert_eq!(s.dims(), Dimensions::single(Dim::X, 3).unwrap());
        assert_eq!(s.unit(), Unit::counts());
        assert_eq!(s.values::<f64>().unwrap(), vec![1.0, 0.0, 9.0]);
    }

    #[test]
    fn test_copy_compacts() {
        let buffer = events(vec![1.0, 2.0, 3.0, 4.0], vec![0.0; 4]);
        let binned = make_bins(&indices(vec![(2, 4), (0, 1)]), Dim::Event, buffer).unwrap();
        let copy = binned.copy().unwrap();
        assert_eq!(
            bin_ranges(&copy).unwrap(),
            vec![BinRange::new(0, 2), BinRange::new(2, 3)]
        );
        assert_eq!(
            copy.bins().unwrap().buffer().data().values::<f64>().unwrap(),
            vec![3.0, 4.0, 1.0]
        );
        assert_eq!(copy, binned);
        assert!(bins_size(&Variable::scalar(1.0, Unit::m())).is_err());
    }
}
