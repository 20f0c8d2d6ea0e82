//! Operations combining cells: concatenation, append, flattening and
//! elementwise arithmetic on binned variables.

use smallvec::SmallVec;
use scivar_traits::BinRange;
use scivar_view::{Dim, DimensionError, Dimensions, NDIM_MAX};
use tracing::debug;

use super::{bin_ranges, gather, Bins};
use crate::transform::{apply_binary, apply_unary, BinaryOp, UnaryOp};
use crate::units::Unit;
use crate::variable::Variable;
use crate::{Error, Result};

fn bins_of<'a>(var: &'a Variable, op: &str) -> Result<&'a Bins> {
    var.bins()
        .ok_or_else(|| Error::BinnedData(format!("{op} requires binned data")))
}

fn binned(out_dims: Dimensions, ranges: Vec<BinRange>, bins: Bins) -> Result<Variable> {
    let indices = Variable::new(out_dims, Unit::dimensionless(), ranges)?;
    Ok(Variable::from_bins(indices.values_concept().clone(), bins))
}

/// Cell-wise concatenation: every output cell holds the events of the
/// matching cell of `a` followed by those of `b`. Both are broadcast to the
/// union of their dimensions.
pub fn bins_concatenate(a: &Variable, b: &Variable) -> Result<Variable> {
    let (ba, bb) = (bins_of(a, "bins_concatenate")?, bins_of(b, "bins_concatenate")?);
    if ba.dim() != bb.dim() {
        return Err(Error::BinnedData(format!(
            "cannot concatenate bins along {} and {}",
            ba.dim(),
            bb.dim()
        )));
    }
    ba.buffer().ensure_compatible_columns(bb.buffer())?;
    let dims = Dimensions::merge(&a.dims(), &b.dims())?;
    let ra = bin_ranges(&a.broadcast(&dims)?)?;
    let rb = bin_ranges(&b.broadcast(&dims)?)?;

    let mut segments = Vec::with_capacity(2 * ra.len());
    let mut ranges = Vec::with_capacity(ra.len());
    let mut offset = 0;
    for (x, y) in ra.iter().zip(&rb) {
        segments.push((ba.buffer(), *x));
        segments.push((bb.buffer(), *y));
        ranges.push(BinRange::new(offset, offset + x.len() + y.len()));
        offset += x.len() + y.len();
    }
    let buffer = gather(ba.buffer(), ba.dim(), &segments)?;
    binned(dims, ranges, Bins::new(ba.dim(), buffer))
}

/// Append the events of `b` to the matching cells of `a`.
///
/// `a` is given a freshly allocated buffer; other handles sharing its old
/// buffer are not affected.
pub fn bins_append(a: &mut Variable, b: &Variable) -> Result<()> {
    if a.is_view() {
        return Err(Error::BinnedData("cannot append to a view of binned data".into()));
    }
    let b = b.broadcast(&a.dims())?;
    let merged = bins_concatenate(a, &b)?;
    debug!(dims = %merged.dims(), "bins_append: reallocated buffer");
    *a = merged;
    Ok(())
}

/// Concatenate the cells of `var` along the outer dimension `dim`, removing
/// it.
pub fn bins_flatten(var: &Variable, dim: Dim) -> Result<Variable> {
    let extent = var.dims().extent(dim)?;
    let rows: SmallVec<[SmallVec<[usize; 8]>; 1]> = SmallVec::from_elem((0..extent).collect(), 1);
    merge_cells(var, dim, &rows, None)
}

/// Merge cells of `var` along `dim`. Output cell `(g, j)` holds, in order,
/// the events of the input cells `(r, j)` for every `r` in `groups[g]`,
/// where `j` runs over the remaining dimensions. With `group_dim` the groups
/// form a new outermost dimension, otherwise there must be one group.
pub(crate) fn merge_cells<G: AsRef<[usize]>>(
    var: &Variable,
    dim: Dim,
    groups: &[G],
    group_dim: Option<Dim>,
) -> Result<Variable> {
    let bins = bins_of(var, "merge_cells")?;
    let dims = var.dims();
    let extent = dims.extent(dim)?;
    let others = dims.without(dim)?;
    let mut order: SmallVec<[Dim; NDIM_MAX]> = SmallVec::new();
    order.push(dim);
    order.extend_from_slice(others.labels());
    let ranges = bin_ranges(&var.transpose(&order)?)?;
    let m = others.volume();

    let mut segments = Vec::new();
    let mut out_ranges = Vec::with_capacity(groups.len() * m);
    let mut offset = 0;
    for group in groups {
        for j in 0..m {
            let begin = offset;
            for &r in group.as_ref() {
                if r >= extent {
                    return Err(Error::Dimension(
                        DimensionError::SliceOutOfRange {
                            dim,
                            begin: r,
                            end: r + 1,
                            extent,
                        },
                    ));
                }
                let range = ranges[r * m + j];
                segments.push((bins.buffer(), range));
                offset += range.len();
            }
            out_ranges.push(BinRange::new(begin, offset));
        }
    }
    let buffer = gather(bins.buffer(), bins.dim(), &segments)?;
    let mut out_dims = others;
    match group_dim {
        Some(g) => out_dims.add(g, groups.len())?,
        None if groups.len() == 1 => {}
        None => {
            return Err(Error::BinnedData(format!(
                "{} groups without a group dimension",
                groups.len()
            )))
        }
    }
    binned(out_dims, out_ranges, Bins::new(bins.dim(), buffer))
}

/// Cells of a broadcast binned view share events; writing through it would
/// apply the operation once per repeat.
fn ensure_writable(var: &Variable) -> Result<()> {
    if var.values_concept().has_broadcast() {
        return Err(Error::Dimension(DimensionError::BroadcastWrite(var.dims())));
    }
    Ok(())
}

/// `out op= rhs` where at least one side is binned.
///
/// With two binned operands the cells must have equal lengths. A dense
/// right-hand side is broadcast to the cells and applies to every event of a
/// cell.
pub(crate) fn transform_in_place<Op: BinaryOp>(out: &mut Variable, rhs: &Variable) -> Result<()> {
    if !out.is_binned() {
        return Err(Error::BinnedData(format!(
            "{}: cannot write binned data into a dense variable",
            Op::NAME
        )));
    }
    ensure_writable(out)?;
    let unit = Op::unit(out.unit(), rhs.unit())?;
    if out.is_view() && unit != out.unit() {
        return Err(Error::Unit(format!(
            "cannot change the unit of a view from {} to {unit}",
            out.unit()
        )));
    }
    if rhs.has_variances() && !out.has_variances() {
        return Err(Error::Variances(format!(
            "{}: right-hand side has variances but left-hand side does not",
            Op::NAME
        )));
    }
    let rhs = rhs.broadcast(&out.dims())?;
    let cells = super::values_as_bins(out)?;

    if rhs.is_binned() {
        let rhs_cells = super::values_as_bins(&rhs)?;
        if cells
            .iter()
            .zip(&rhs_cells)
            .any(|(a, b)| a.dims() != b.dims())
        {
            return Err(Error::BinnedData(format!(
                "{}: bin sizes of the operands differ",
                Op::NAME
            )));
        }
        for (cell, rhs_cell) in cells.iter().zip(&rhs_cells) {
            apply_binary::<Op>(&mut cell.data().share(), rhs_cell.data())?;
        }
    } else {
        for (i, cell) in cells.iter().enumerate() {
            apply_binary::<Op>(&mut cell.data().share(), &rhs.element(i)?)?;
        }
    }
    out.set_unit_unchecked(unit);
    Ok(())
}

/// `var = op(var)` on every event of every cell.
pub(crate) fn transform_unary_in_place<Op: UnaryOp>(var: &mut Variable) -> Result<()> {
    ensure_writable(var)?;
    let unit = Op::unit(var.unit())?;
    if var.is_view() && unit != var.unit() {
        return Err(Error::Unit(format!(
            "cannot change the unit of a view from {} to {unit}",
            var.unit()
        )));
    }
    for cell in super::values_as_bins(var)? {
        apply_unary::<Op>(&mut cell.data().share())?;
    }
    var.set_unit_unchecked(unit);
    Ok(())
}
