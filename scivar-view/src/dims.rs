//! Dimension labels and ordered label → extent maps.
//!
//! The first entry of a [`Dimensions`] is the outermost axis, the last entry
//! the innermost (fastest varying in memory).

use std::fmt;

use crate::{DimensionError, Result};

/// Maximum number of axes of a [`Dimensions`].
pub const NDIM_MAX: usize = 6;

/// Axis label from a closed set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dim {
    #[default]
    Invalid,
    Detector,
    DSpacing,
    Energy,
    Event,
    Group,
    Position,
    Q,
    Row,
    Spectrum,
    Temperature,
    Time,
    Tof,
    Wavelength,
    X,
    Y,
    Z,
}

impl Dim {
    pub fn name(self) -> &'static str {
        match self {
            Dim::Invalid => "<invalid>",
            Dim::Detector => "detector",
            Dim::DSpacing => "d-spacing",
            Dim::Energy => "energy",
            Dim::Event => "event",
            Dim::Group => "group",
            Dim::Position => "position",
            Dim::Q => "Q",
            Dim::Row => "row",
            Dim::Spectrum => "spectrum",
            Dim::Temperature => "temperature",
            Dim::Time => "time",
            Dim::Tof => "tof",
            Dim::Wavelength => "wavelength",
            Dim::X => "x",
            Dim::Y => "y",
            Dim::Z => "z",
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered sequence of `(label, extent)` pairs, at most [`NDIM_MAX`] long.
///
/// Equality is order sensitive: `{x: 2, y: 3}` and `{y: 3, x: 2}` differ.
/// Slots past `ndim` are kept at `(Dim::Invalid, 0)` so the derived
/// comparison only sees live entries.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Dimensions {
    labels: [Dim; NDIM_MAX],
    shape: [usize; NDIM_MAX],
    ndim: usize,
}

impl Dimensions {
    /// Scalar (zero-dimensional) dimensions with volume 1.
    pub const fn scalar() -> Self {
        Self {
            labels: [Dim::Invalid; NDIM_MAX],
            shape: [0; NDIM_MAX],
            ndim: 0,
        }
    }

    /// Build from `(label, extent)` pairs, outermost first.
    pub fn new(pairs: &[(Dim, usize)]) -> Result<Self> {
        let mut dims = Self::scalar();
        if pairs.len() > NDIM_MAX {
            return Err(DimensionError::TooManyDimensions(pairs.len()));
        }
        for &(dim, extent) in pairs {
            dims.add_inner(dim, extent)?;
        }
        Ok(dims)
    }

    /// Build from pairs with signed extents, rejecting negative ones.
    pub fn try_from_signed(pairs: &[(Dim, i64)]) -> Result<Self> {
        if pairs.len() > NDIM_MAX {
            return Err(DimensionError::TooManyDimensions(pairs.len()));
        }
        let mut dims = Self::scalar();
        for &(dim, extent) in pairs {
            let extent = usize::try_from(extent)
                .map_err(|_| DimensionError::NegativeExtent { dim, extent })?;
            dims.add_inner(dim, extent)?;
        }
        Ok(dims)
    }

    /// One-dimensional dimensions.
    pub fn single(dim: Dim, extent: usize) -> Result<Self> {
        Self::new(&[(dim, extent)])
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.ndim == 0
    }

    #[inline]
    pub fn labels(&self) -> &[Dim] {
        &self.labels[..self.ndim]
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape[..self.ndim]
    }

    /// Product of extents; 1 for a scalar.
    #[inline]
    pub fn volume(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dim, usize)> + '_ {
        self.labels().iter().copied().zip(self.shape().iter().copied())
    }

    #[inline]
    pub fn contains(&self, dim: Dim) -> bool {
        self.labels().contains(&dim)
    }

    /// Whether every label of `other` is present here with the same extent.
    pub fn contains_all(&self, other: &Dimensions) -> bool {
        other
            .iter()
            .all(|(dim, extent)| self.extent(dim).map_or(false, |e| e == extent))
    }

    /// Position of `dim`, outermost first.
    pub fn index_of(&self, dim: Dim) -> Result<usize> {
        self.labels()
            .iter()
            .position(|&d| d == dim)
            .ok_or(DimensionError::NotFound { dim, dims: *self })
    }

    /// Extent of `dim`.
    pub fn extent(&self, dim: Dim) -> Result<usize> {
        Ok(self.shape[self.index_of(dim)?])
    }

    #[inline]
    pub fn label(&self, i: usize) -> Dim {
        self.labels()[i]
    }

    #[inline]
    pub fn size(&self, i: usize) -> usize {
        self.shape()[i]
    }

    /// Innermost label, if any.
    pub fn inner(&self) -> Option<Dim> {
        self.labels().last().copied()
    }

    /// Row-major strides (in elements) of a contiguous buffer with these dims.
    pub fn strides(&self) -> [usize; NDIM_MAX] {
        let mut strides = [0usize; NDIM_MAX];
        let mut step = 1usize;
        for i in (0..self.ndim).rev() {
            strides[i] = step;
            step *= self.shape[i];
        }
        strides
    }

    /// Row-major stride of `dim`.
    pub fn offset(&self, dim: Dim) -> Result<usize> {
        let i = self.index_of(dim)?;
        Ok(self.strides()[i])
    }

    fn check_new_label(&self, dim: Dim) -> Result<()> {
        if dim == Dim::Invalid {
            return Err(DimensionError::InvalidLabel);
        }
        if self.contains(dim) {
            return Err(DimensionError::Duplicate(dim));
        }
        if self.ndim == NDIM_MAX {
            return Err(DimensionError::TooManyDimensions(NDIM_MAX + 1));
        }
        Ok(())
    }

    /// Add `dim` as the new outermost axis.
    pub fn add(&mut self, dim: Dim, extent: usize) -> Result<()> {
        self.check_new_label(dim)?;
        for i in (0..self.ndim).rev() {
            self.labels[i + 1] = self.labels[i];
            self.shape[i + 1] = self.shape[i];
        }
        self.labels[0] = dim;
        self.shape[0] = extent;
        self.ndim += 1;
        Ok(())
    }

    /// Add `dim` as the new innermost axis.
    pub fn add_inner(&mut self, dim: Dim, extent: usize) -> Result<()> {
        self.check_new_label(dim)?;
        self.labels[self.ndim] = dim;
        self.shape[self.ndim] = extent;
        self.ndim += 1;
        Ok(())
    }

    /// Change the extent of an existing axis, keeping its position.
    pub fn resize(&mut self, dim: Dim, extent: usize) -> Result<()> {
        let i = self.index_of(dim)?;
        self.shape[i] = extent;
        Ok(())
    }

    /// Remove an axis, keeping the order of the others.
    pub fn erase(&mut self, dim: Dim) -> Result<()> {
        let i = self.index_of(dim)?;
        for j in i..self.ndim - 1 {
            self.labels[j] = self.labels[j + 1];
            self.shape[j] = self.shape[j + 1];
        }
        self.ndim -= 1;
        self.labels[self.ndim] = Dim::Invalid;
        self.shape[self.ndim] = 0;
        Ok(())
    }

    /// Copy with `dim` removed.
    pub fn without(&self, dim: Dim) -> Result<Self> {
        let mut out = *self;
        out.erase(dim)?;
        Ok(out)
    }

    /// Replace the label `from` by `to` at the same position.
    pub fn relabel(&mut self, from: Dim, to: Dim, extent: usize) -> Result<()> {
        let i = self.index_of(from)?;
        if from != to && self.contains(to) {
            return Err(DimensionError::Duplicate(to));
        }
        self.labels[i] = to;
        self.shape[i] = extent;
        Ok(())
    }

    /// Same labels in the given order.
    pub fn transpose(&self, order: &[Dim]) -> Result<Self> {
        if order.len() != self.ndim {
            return Err(DimensionError::InvalidOrder {
                dims: *self,
                order: order.to_vec(),
            });
        }
        let mut out = Self::scalar();
        for &dim in order {
            out.add_inner(dim, self.extent(dim)?)?;
        }
        Ok(out)
    }

    /// Union of `a` and `b`: the labels of `a` in order, followed by the
    /// labels of `b` missing from `a`.
    ///
    /// Fails when a label appears in both with different extents.
    pub fn merge(a: &Dimensions, b: &Dimensions) -> Result<Self> {
        let mut out = *a;
        for (dim, extent) in b.iter() {
            match a.extent(dim) {
                Ok(e) if e == extent => {}
                Ok(e) => {
                    return Err(DimensionError::ExtentMismatch {
                        dim,
                        expected: e,
                        actual: extent,
                    })
                }
                Err(_) => out.add_inner(dim, extent)?,
            }
        }
        Ok(out)
    }
}

impl fmt::Debug for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (dim, extent)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{dim}: {extent}")?;
        }
        f.write_str("}")
    }
}
