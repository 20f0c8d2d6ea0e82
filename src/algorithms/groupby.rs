//! Partition the rows of a [`DataArray`] by the value of a key coordinate and
//! reduce every partition.
//!
//! Groups are ordered by ascending key; rows keep their original order inside
//! a group. The reduced array has the key label as its outermost dimension
//! with the distinct keys as coordinate.

use std::collections::BTreeMap;

use scivar_traits::DType;
use scivar_view::{Dim, DimensionError, Dimensions, Slice};
use smallvec::SmallVec;
use tracing::debug;

use crate::bins::merge_cells;
use crate::data_array::DataArray;
use crate::operations::plus_equals;
use crate::variable::Variable;
use crate::{Error, Result};

type Group = SmallVec<[usize; 8]>;

/// Rows of a [`DataArray`] partitioned by a key coordinate.
#[derive(Debug)]
pub struct GroupBy {
    data: DataArray,
    key: Dim,
    row: Dim,
    groups: Vec<Group>,
    keys: Variable,
}

/// Group the rows of `data` by the one-dimensional coordinate `key`.
///
/// The key may be `i32`, `i64`, `f32` or `f64`.
pub fn groupby(data: &DataArray, key: Dim) -> Result<GroupBy> {
    let coord = data.coord(key)?;
    let dims = coord.dims();
    let Some(row) = dims.inner().filter(|_| dims.ndim() == 1) else {
        return Err(Error::Dimension(DimensionError::Mismatch {
            expected: Dimensions::single(key, dims.volume())?,
            actual: dims,
        }));
    };
    if data.is_edges(key) {
        return Err(Error::BinEdge(format!(
            "cannot group by the bin edges {key}"
        )));
    }
    let values = key_values(coord)?;
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));

    let mut groups: Vec<Group> = Vec::new();
    let mut last: Option<f64> = None;
    for i in order {
        match (last, groups.last_mut()) {
            (Some(k), Some(group)) if k.total_cmp(&values[i]).is_eq() => group.push(i),
            _ => {
                groups.push(SmallVec::from_elem(i, 1));
                last = Some(values[i]);
            }
        }
    }

    let mut keys = coord.zeros_like(Dimensions::single(key, groups.len())?);
    for (g, group) in groups.iter().enumerate() {
        let mut slot = keys.slice(Slice::point(key, g))?;
        slot.assign(&coord.slice(Slice::point(row, group[0]))?)?;
    }
    debug!(%key, %row, groups = groups.len(), "groupby");
    Ok(GroupBy {
        data: data.share(),
        key,
        row,
        groups,
        keys,
    })
}

fn key_values(coord: &Variable) -> Result<Vec<f64>> {
    Ok(match coord.dtype() {
        DType::F64 => coord.values::<f64>()?,
        DType::F32 => coord.values::<f32>()?.into_iter().map(f64::from).collect(),
        DType::I64 => coord.values::<i64>()?.into_iter().map(|v| v as f64).collect(),
        DType::I32 => coord.values::<i32>()?.into_iter().map(f64::from).collect(),
        other => {
            return Err(Error::Type(format!(
                "cannot group by a key of type {other}"
            )))
        }
    })
}

impl GroupBy {
    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Distinct keys in ascending order, along the key dimension.
    pub fn keys(&self) -> &Variable {
        &self.keys
    }

    /// Row indices of every group.
    pub fn groups(&self) -> &[SmallVec<[usize; 8]>] {
        &self.groups
    }

    fn check_dim(&self, dim: Dim) -> Result<()> {
        if dim != self.row {
            return Err(Error::Dimension(DimensionError::NotFound {
                dim,
                dims: Dimensions::single(self.row, self.data.dims().extent(self.row)?)?,
            }));
        }
        Ok(())
    }

    /// Rows masked by a mask along the grouped dimension only. Masks that
    /// depend on the grouped dimension and others cannot be applied per row.
    fn masked_rows(&self) -> Result<Vec<bool>> {
        let extent = self.data.dims().extent(self.row)?;
        let mut masked = vec![false; extent];
        for (name, mask) in self.data.masks() {
            let dims = mask.dims();
            if !dims.contains(self.row) {
                continue;
            }
            if dims.ndim() != 1 {
                return Err(Error::NotImplemented(format!(
                    "groupby with mask '{name}' over {dims}"
                )));
            }
            for (m, v) in masked.iter_mut().zip(mask.values::<bool>()?) {
                *m |= v;
            }
        }
        Ok(masked)
    }

    fn unmasked_groups(&self) -> Result<Vec<Group>> {
        let masked = self.masked_rows()?;
        Ok(self
            .groups
            .iter()
            .map(|g| g.iter().copied().filter(|&r| !masked[r]).collect())
            .collect())
    }

    /// Coordinates and masks that do not depend on the grouped dimension,
    /// plus the distinct keys.
    fn columns(&self) -> Result<(BTreeMap<Dim, Variable>, BTreeMap<String, Variable>)> {
        let mut coords: BTreeMap<Dim, Variable> = self
            .data
            .coords()
            .iter()
            .filter(|(_, c)| !c.dims().contains(self.row))
            .map(|(d, c)| Ok((*d, c.copy()?)))
            .collect::<Result<_>>()?;
        coords.insert(self.key, self.keys.copy()?);
        let masks = self
            .data
            .masks()
            .iter()
            .filter(|(_, m)| !m.dims().contains(self.row))
            .map(|(n, m)| Ok((n.clone(), m.copy()?)))
            .collect::<Result<_>>()?;
        Ok((coords, masks))
    }

    /// Sum every group over `dim`, the dimension of the key coordinate.
    ///
    /// Masked rows are skipped. Binned data is flattened instead.
    pub fn sum(&self, dim: Dim) -> Result<DataArray> {
        if self.data.data().is_binned() {
            return self.flatten(dim);
        }
        self.check_dim(dim)?;
        let groups = self.unmasked_groups()?;
        let data = self.data.data();
        let mut dims = data.dims().without(self.row)?;
        dims.add(self.key, groups.len())?;
        let out = data.zeros_like(dims);
        for (g, group) in groups.iter().enumerate() {
            let mut target = out.slice(Slice::point(self.key, g))?;
            for &r in group {
                plus_equals(&mut target, &data.slice(Slice::point(self.row, r))?)?;
            }
        }
        let (coords, masks) = self.columns()?;
        Ok(DataArray::from_parts(out, coords, masks))
    }

    /// Concatenate the cells of every group over `dim`. Requires binned data.
    pub fn flatten(&self, dim: Dim) -> Result<DataArray> {
        if !self.data.data().is_binned() {
            return Err(Error::BinnedData("flatten requires binned data".into()));
        }
        self.check_dim(dim)?;
        let groups = self.unmasked_groups()?;
        let out = merge_cells(self.data.data(), self.row, &groups, Some(self.key))?;
        let (coords, masks) = self.columns()?;
        Ok(DataArray::from_parts(out, coords, masks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bins::{bins_size, bins_sum, make_bins};
    use crate::Unit;
    use scivar_traits::BinRange;

    fn table() -> DataArray {
        let rows = Dimensions::new(&[(Dim::Row, 5), (Dim::X, 2)]).unwrap();
        DataArray::new(
            Variable::with_variances(
                rows,
                Unit::counts(),
                vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
                vec![1.0; 10],
            )
            .unwrap(),
        )
        .with_coord(
            Dim::Temperature,
            Variable::new(
                Dimensions::single(Dim::Row, 5).unwrap(),
                Unit::kelvin(),
                vec![300i64, 10, 300, 20, 10],
            )
            .unwrap(),
        )
        .unwrap()
        .with_coord(
            Dim::X,
            Variable::new(Dimensions::single(Dim::X, 2).unwrap(), Unit::m(), vec![0.0, 1.0]).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_groups_in_ascending_key_order() {
        let g = groupby(&table(), Dim::Temperature).unwrap();
        assert_eq!(g.len(), 3);
        assert_eq!(g.keys().values::<i64>().unwrap(), vec![10, 20, 300]);
        assert_eq!(g.keys().unit(), Unit::kelvin());
        let groups: Vec<Vec<usize>> = g.groups().iter().map(|g| g.to_vec()).collect();
        assert_eq!(groups, vec![vec![1, 4], vec![3], vec![0, 2]]);
    }

    #[test]
    fn test_sum() {
        let g = groupby(&table(), Dim::Temperature).unwrap();
        let s = g.sum(Dim::Row).unwrap();
        assert_eq!(
            s.dims(),
            Dimensions::new(&[(Dim::Temperature, 3), (Dim::X, 2)]).unwrap()
        );
        assert_eq!(
            s.data().values::<f64>().unwrap(),
            vec![12.0, 14.0, 7.0, 8.0, 6.0, 8.0]
        );
        assert_eq!(s.data().variances::<f64>().unwrap(), vec![2.0, 2.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(s.coord(Dim::X).unwrap(), table().coord(Dim::X).unwrap());
        assert!(matches!(g.sum(Dim::X), Err(Error::Dimension(_))));
        assert!(matches!(g.flatten(Dim::Row), Err(Error::BinnedData(_))));
    }

    #[test]
    fn test_sum_skips_masked_rows() {
        let masked = table()
            .with_mask(
                "bad",
                Variable::new(
                    Dimensions::single(Dim::Row, 5).unwrap(),
                    Unit::dimensionless(),
                    vec![false, false, true, false, false],
                )
                .unwrap(),
            )
            .unwrap();
        let s = groupby(&masked, Dim::Temperature).unwrap().sum(Dim::Row).unwrap();
        assert_eq!(
            s.data().values::<f64>().unwrap(),
            vec![12.0, 14.0, 7.0, 8.0, 1.0, 2.0]
        );
        assert!(s.masks().is_empty());
    }

    #[test]
    fn test_flatten_binned() {
        let events = Dimensions::single(Dim::Event, 4).unwrap();
        let buffer = DataArray::new(Variable::new(events, Unit::counts(), vec![1.0, 2.0, 3.0, 4.0]).unwrap());
        let indices = Variable::new(
            Dimensions::single(Dim::Row, 3).unwrap(),
            Unit::dimensionless(),
            vec![BinRange::new(0, 1), BinRange::new(1, 3), BinRange::new(3, 4)],
        )
        .unwrap();
        let binned = make_bins(&indices, Dim::Event, buffer).unwrap();
        let data = DataArray::new(binned)
            .with_coord(
                Dim::Y,
                Variable::new(Dimensions::single(Dim::Row, 3).unwrap(), Unit::m(), vec![2.0f32, 1.0, 2.0])
                    .unwrap(),
            )
            .unwrap();
        let f = groupby(&data, Dim::Y).unwrap().sum(Dim::Row).unwrap();
        assert_eq!(f.dims(), Dimensions::single(Dim::Y, 2).unwrap());
        assert_eq!(bins_size(f.data()).unwrap().values::<i64>().unwrap(), vec![2, 2]);
        assert_eq!(bins_sum(f.data()).unwrap().values::<f64>().unwrap(), vec![5.0, 5.0]);
        assert_eq!(f.coord(Dim::Y).unwrap().values::<f32>().unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_unsupported_key() {
        let data = DataArray::new(
            Variable::new(Dimensions::single(Dim::Row, 2).unwrap(), Unit::counts(), vec![1.0, 2.0]).unwrap(),
        )
        .with_coord(
            Dim::Group,
            Variable::new(
                Dimensions::single(Dim::Row, 2).unwrap(),
                Unit::dimensionless(),
                vec![true, false],
            )
            .unwrap(),
        )
        .unwrap();
        assert!(matches!(groupby(&data, Dim::Group), Err(Error::Type(_))));
        assert!(matches!(groupby(&data, Dim::X), Err(Error::NotFound(_))));
    }
}
