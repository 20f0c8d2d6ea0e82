//! A data variable with named coordinates and masks.
//!
//! This is the column container used as bin buffer, histogram input and
//! groupby input. It keeps only what those algorithms need: coordinates are
//! keyed by the dimension they label, and a coordinate may be bin-edge shaped
//! (one longer than the data along its dimension).

use std::collections::BTreeMap;
use std::fmt;

use scivar_traits::DType;
use scivar_view::{Dim, Dimensions, DimensionError, Slice};

use crate::variable::Variable;
use crate::{Error, Result};

#[derive(Debug, PartialEq)]
pub struct DataArray {
    data: Variable,
    coords: BTreeMap<Dim, Variable>,
    masks: BTreeMap<String, Variable>,
}

impl DataArray {
    pub fn new(data: Variable) -> Self {
        Self {
            data,
            coords: BTreeMap::new(),
            masks: BTreeMap::new(),
        }
    }

    /// Attach the coordinate for `dim`. Its extent along `dim` must match the
    /// data, or exceed it by one for bin edges.
    pub fn with_coord(mut self, dim: Dim, coord: Variable) -> Result<Self> {
        self.set_coord(dim, coord)?;
        Ok(self)
    }

    pub fn set_coord(&mut self, dim: Dim, coord: Variable) -> Result<()> {
        let dims = self.dims();
        for (d, extent) in coord.dims().iter() {
            let Ok(expected) = dims.extent(d) else {
                return Err(DimensionError::NotFound { dim: d, dims }.into());
            };
            if extent != expected && !(d == dim && extent == expected + 1) {
                return Err(DimensionError::ExtentMismatch {
                    dim: d,
                    expected,
                    actual: extent,
                }
                .into());
            }
        }
        self.coords.insert(dim, coord);
        Ok(())
    }

    /// Attach a boolean mask whose dimensions are a subset of the data's.
    pub fn with_mask(mut self, name: impl Into<String>, mask: Variable) -> Result<Self> {
        self.set_mask(name, mask)?;
        Ok(self)
    }

    pub fn set_mask(&mut self, name: impl Into<String>, mask: Variable) -> Result<()> {
        if mask.dtype() != DType::Bool {
            return Err(Error::Type(format!("mask must be bool, got {}", mask.dtype())));
        }
        let dims = self.dims();
        for (d, extent) in mask.dims().iter() {
            let expected = dims.extent(d)?;
            if extent != expected {
                return Err(DimensionError::ExtentMismatch {
                    dim: d,
                    expected,
                    actual: extent,
                }
                .into());
            }
        }
        self.masks.insert(name.into(), mask);
        Ok(())
    }

    pub fn data(&self) -> &Variable {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Variable {
        &mut self.data
    }

    pub fn into_data(self) -> Variable {
        self.data
    }

    pub fn dims(&self) -> Dimensions {
        self.data.dims()
    }

    pub fn coords(&self) -> &BTreeMap<Dim, Variable> {
        &self.coords
    }

    pub fn coord(&self, dim: Dim) -> Result<&Variable> {
        self.coords
            .get(&dim)
            .ok_or_else(|| Error::NotFound(format!("no coordinate for dimension {dim}")))
    }

    pub fn masks(&self) -> &BTreeMap<String, Variable> {
        &self.masks
    }

    pub fn mask(&self, name: &str) -> Result<&Variable> {
        self.masks
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("no mask named {name}")))
    }

    /// Whether the coordinate for `dim` holds bin edges.
    pub fn is_edges(&self, dim: Dim) -> bool {
        let (Some(coord), Ok(extent)) = (self.coords.get(&dim), self.dims().extent(dim)) else {
            return false;
        };
        coord.dims().extent(dim).is_ok_and(|e| e == extent + 1)
    }

    /// Second handle to the same data, coordinate and mask buffers.
    pub fn share(&self) -> Self {
        Self {
            data: self.data.share(),
            coords: self.coords.iter().map(|(d, c)| (*d, c.share())).collect(),
            masks: self.masks.iter().map(|(n, m)| (n.clone(), m.share())).collect(),
        }
    }

    /// Deep copy of every column.
    pub fn copy(&self) -> Result<Self> {
        Ok(Self {
            data: self.data.copy()?,
            coords: self
                .coords
                .iter()
                .map(|(d, c)| Ok((*d, c.copy()?)))
                .collect::<Result<_>>()?,
            masks: self
                .masks
                .iter()
                .map(|(n, m)| Ok((n.clone(), m.copy()?)))
                .collect::<Result<_>>()?,
        })
    }

    /// View of every column along `slice`. Edge coordinates keep one extra
    /// element for range slices and are dropped by point slices.
    pub fn slice(&self, slice: Slice) -> Result<Self> {
        let dim = slice.dim();
        let mut coords = BTreeMap::new();
        for (d, coord) in &self.coords {
            if !coord.dims().contains(dim) {
                coords.insert(*d, coord.share());
                continue;
            }
            let sliced = if self.is_edges(*d) && *d == dim {
                match slice.end() {
                    Some(end) => coord.slice(Slice::range(dim, slice.begin(), end + 1))?,
                    None => continue,
                }
            } else {
                coord.slice(slice)?
            };
            coords.insert(*d, sliced);
        }
        let masks = self
            .masks
            .iter()
            .map(|(n, m)| {
                let m = if m.dims().contains(dim) {
                    m.slice(slice)?
                } else {
                    m.share()
                };
                Ok((n.clone(), m))
            })
            .collect::<Result<_>>()?;
        Ok(Self {
            data: self.data.slice(slice)?,
            coords,
            masks,
        })
    }

    /// Fail unless `other` carries the same coordinate and mask columns with
    /// matching type, unit and variance presence.
    pub fn ensure_compatible_columns(&self, other: &DataArray) -> Result<()> {
        let incompatible = |what: &str| {
            Error::BinnedData(format!("{what} of the two buffers are incompatible"))
        };
        let same = |a: &Variable, b: &Variable| {
            a.dtype() == b.dtype() && a.unit() == b.unit() && a.has_variances() == b.has_variances()
        };
        if !same(&self.data, &other.data) {
            return Err(incompatible("data columns"));
        }
        if self.coords.len() != other.coords.len()
            || self
                .coords
                .iter()
                .any(|(d, c)| other.coords.get(d).map_or(true, |o| !same(c, o)))
        {
            return Err(incompatible("coordinates"));
        }
        if self.masks.len() != other.masks.len()
            || self
                .masks
                .iter()
                .any(|(n, m)| other.masks.get(n).map_or(true, |o| !same(m, o)))
        {
            return Err(incompatible("masks"));
        }
        Ok(())
    }

    pub(crate) fn from_parts(
        data: Variable,
        coords: BTreeMap<Dim, Variable>,
        masks: BTreeMap<String, Variable>,
    ) -> Self {
        Self {
            data,
            coords,
            masks,
        }
    }

    /// Fresh default-initialized columns with `dim` resized to `extent`.
    /// Columns that do not depend on `dim` are copied.
    pub(crate) fn resized(&self, dim: Dim, extent: usize) -> Result<Self> {
        let resize = |v: &Variable| -> Result<Variable> {
            let mut dims = v.dims();
            if !dims.contains(dim) {
                return v.copy();
            }
            dims.resize(dim, extent)?;
            Ok(v.zeros_like(dims))
        };
        Ok(Self {
            data: resize(&self.data)?,
            coords: self
                .coords
                .iter()
                .map(|(d, c)| Ok((*d, resize(c)?)))
                .collect::<Result<_>>()?,
            masks: self
                .masks
                .iter()
                .map(|(n, m)| Ok((n.clone(), resize(m)?)))
                .collect::<Result<_>>()?,
        })
    }

    /// Copy rows `src_begin..src_end` of every column of `other` along `dim`
    /// into `self` at `dst_offset`.
    pub(crate) fn copy_range(
        &mut self,
        other: &DataArray,
        dim: Dim,
        dst_offset: usize,
        src_begin: usize,
        src_end: usize,
    ) -> Result<()> {
        self.data
            .copy_range(&other.data, dim, dst_offset, src_begin, src_end)?;
        for (d, coord) in self.coords.iter_mut() {
            if coord.dims().contains(dim) {
                coord.copy_range(other.coord(*d)?, dim, dst_offset, src_begin, src_end)?;
            }
        }
        for (name, mask) in self.masks.iter_mut() {
            if mask.dims().contains(dim) {
                mask.copy_range(other.mask(name)?, dim, dst_offset, src_begin, src_end)?;
            }
        }
        Ok(())
    }

    /// Logical OR of every mask, broadcast to the data dimensions. `None`
    /// when there are no masks.
    pub(crate) fn combined_mask(&self) -> Result<Option<Vec<bool>>> {
        if self.masks.is_empty() {
            return Ok(None);
        }
        let dims = self.dims();
        let mut out = vec![false; dims.volume()];
        for mask in self.masks.values() {
            let values = mask.broadcast(&dims)?.values::<bool>()?;
            for (o, m) in out.iter_mut().zip(values) {
                *o |= m;
            }
        }
        Ok(Some(out))
    }
}

impl fmt::Display for DataArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<DataArray {}>", self.dims())?;
        for (dim, coord) in &self.coords {
            writeln!(f, "  coord {dim}: {coord}")?;
        }
        for (name, mask) in &self.masks {
            writeln!(f, "  mask {name}: {mask}")?;
        }
        write!(f, "  data: {}", self.data)
    }
}
