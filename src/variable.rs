//! The user-facing array handle: values, optional variances and a unit.

use std::fmt;

use scivar_traits::{DType, EventList};
use scivar_view::{Dim, Dimensions, Slice, Storage};

use crate::bins::{self, Bins};
use crate::concept::{VariableConcept, VariableElement};
use crate::units::Unit;
use crate::{Error, Result};

/// A typed, dimensioned, unit-carrying array with optional variances.
///
/// [`Variable::copy`] produces an independent deep copy and
/// [`Variable::share`] a second handle to the same buffers.
/// Slicing, transposing and broadcasting return views that write through to
/// the parent.
#[derive(Debug)]
pub struct Variable {
    unit: Unit,
    values: VariableConcept,
    variances: Option<VariableConcept>,
    sparse_dim: Option<Dim>,
    bins: Option<Box<Bins>>,
}

impl Variable {
    pub(crate) fn from_parts(
        unit: Unit,
        values: VariableConcept,
        variances: Option<VariableConcept>,
    ) -> Result<Self> {
        if let Some(var) = &variances {
            if !values.dtype().supports_variances() {
                return Err(Error::Variances(format!(
                    "{} does not support variances",
                    values.dtype()
                )));
            }
            if var.dtype() != values.dtype() {
                return Err(Error::Variances(format!(
                    "variances have type {} but values have type {}",
                    var.dtype(),
                    values.dtype()
                )));
            }
            if var.dims() != values.dims() {
                return Err(Error::Variances(format!(
                    "variances have dimensions {} but values have {}",
                    var.dims(),
                    values.dims()
                )));
            }
        }
        Ok(Self {
            unit,
            values,
            variances,
            sparse_dim: None,
            bins: None,
        })
    }

    pub(crate) fn from_bins(indices: VariableConcept, bins: Bins) -> Self {
        Self {
            unit: Unit::dimensionless(),
            values: indices,
            variances: None,
            sparse_dim: None,
            bins: Some(Box::new(bins)),
        }
    }

    /// Variable holding `values` in row-major order of `dims`.
    pub fn new<T: VariableElement>(dims: Dimensions, unit: Unit, values: Vec<T>) -> Result<Self> {
        Self::from_parts(unit, T::wrap(Storage::from_vec(dims, values)?), None)
    }

    pub fn with_variances<T: VariableElement>(
        dims: Dimensions,
        unit: Unit,
        values: Vec<T>,
        variances: Vec<T>,
    ) -> Result<Self> {
        if variances.len() != values.len() {
            return Err(Error::Variances(format!(
                "{} variances for {} values",
                variances.len(),
                values.len()
            )));
        }
        Self::from_parts(
            unit,
            T::wrap(Storage::from_vec(dims, values)?),
            Some(T::wrap(Storage::from_vec(dims, variances)?)),
        )
    }

    /// Zero-dimensional variable.
    pub fn scalar<T: VariableElement>(value: T, unit: Unit) -> Self {
        Self {
            unit,
            values: T::wrap(Storage::scalar(value)),
            variances: None,
            sparse_dim: None,
            bins: None,
        }
    }

    /// Zero-dimensional variable with a variance.
    pub fn scalar_with_variance<T: VariableElement>(value: T, variance: T, unit: Unit) -> Result<Self> {
        Self::with_variances(Dimensions::scalar(), unit, vec![value], vec![variance])
    }

    /// Default-initialized variable.
    pub fn zeros(dtype: DType, dims: Dimensions, unit: Unit, with_variances: bool) -> Result<Self> {
        let variances = with_variances.then(|| VariableConcept::zeros(dtype, dims));
        Self::from_parts(unit, VariableConcept::zeros(dtype, dims), variances)
    }

    /// Per-cell event lists along `sparse_dim`, which is not part of `dims`.
    pub fn sparse(
        dims: Dimensions,
        sparse_dim: Dim,
        unit: Unit,
        lists: Vec<EventList>,
    ) -> Result<Self> {
        if dims.contains(sparse_dim) {
            return Err(scivar_view::DimensionError::Duplicate(sparse_dim).into());
        }
        let mut var = Self::new(dims, unit, lists)?;
        var.sparse_dim = Some(sparse_dim);
        Ok(var)
    }

    pub fn sparse_with_variances(
        dims: Dimensions,
        sparse_dim: Dim,
        unit: Unit,
        lists: Vec<EventList>,
        variances: Vec<EventList>,
    ) -> Result<Self> {
        if lists.iter().zip(&variances).any(|(v, e)| v.len() != e.len()) {
            return Err(Error::Size("event list lengths of values and variances differ".into()));
        }
        if dims.contains(sparse_dim) {
            return Err(scivar_view::DimensionError::Duplicate(sparse_dim).into());
        }
        let mut var = Self::with_variances(dims, unit, lists, variances)?;
        var.sparse_dim = Some(sparse_dim);
        Ok(var)
    }

    /// Same type, unit, variance presence and bin buffer layout, new shape,
    /// default-initialized.
    pub fn zeros_like(&self, dims: Dimensions) -> Self {
        Self {
            unit: self.unit,
            values: self.values.clone_with_dims(dims),
            variances: self.variances.as_ref().map(|v| v.clone_with_dims(dims)),
            sparse_dim: self.sparse_dim,
            bins: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn dims(&self) -> Dimensions {
        self.values.dims()
    }

    /// Element type of the values; [`DType::BinRange`] for binned variables.
    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    /// Unit of the values; for binned variables the unit of the buffer data.
    pub fn unit(&self) -> Unit {
        match &self.bins {
            Some(b) => b.buffer().data().unit(),
            None => self.unit,
        }
    }

    /// Change the unit. Fails for views, which cannot own a unit change.
    pub fn set_unit(&mut self, unit: Unit) -> Result<()> {
        if self.is_view() && unit != self.unit() {
            return Err(Error::Unit(format!(
                "cannot change the unit of a view from {} to {unit}",
                self.unit()
            )));
        }
        self.set_unit_unchecked(unit);
        Ok(())
    }

    pub(crate) fn set_unit_unchecked(&mut self, unit: Unit) {
        match &mut self.bins {
            Some(b) => b.buffer_mut().data_mut().set_unit_unchecked(unit),
            None => self.unit = unit,
        }
    }

    /// Whether variances are present; for binned variables, in the buffer data.
    pub fn has_variances(&self) -> bool {
        match &self.bins {
            Some(b) => b.buffer().data().has_variances(),
            None => self.variances.is_some(),
        }
    }

    pub fn sparse_dim(&self) -> Option<Dim> {
        self.sparse_dim
    }

    pub fn is_binned(&self) -> bool {
        self.bins.is_some()
    }

    pub fn bins(&self) -> Option<&Bins> {
        self.bins.as_deref()
    }

    pub fn bins_mut(&mut self) -> Option<&mut Bins> {
        self.bins.as_deref_mut()
    }

    pub fn is_view(&self) -> bool {
        self.values.is_view()
    }

    pub fn is_contiguous(&self) -> bool {
        self.values.is_contiguous()
    }

    pub fn values_concept(&self) -> &VariableConcept {
        &self.values
    }

    pub fn variances_concept(&self) -> Option<&VariableConcept> {
        self.variances.as_ref()
    }

    pub(crate) fn concepts_mut(&mut self) -> (&mut VariableConcept, Option<&mut VariableConcept>) {
        (&mut self.values, self.variances.as_mut())
    }

    /// Typed values in row-major order.
    pub fn values<T: VariableElement>(&self) -> Result<Vec<T>> {
        Ok(self.values.typed::<T>()?.to_vec())
    }

    /// Typed variances in row-major order.
    pub fn variances<T: VariableElement>(&self) -> Result<Vec<T>> {
        match &self.variances {
            Some(v) => Ok(v.typed::<T>()?.to_vec()),
            None => Err(Error::Variances("variable has no variances".into())),
        }
    }

    /// Overwrite the values, writing through to the parent of a view.
    pub fn set_values<T: VariableElement>(&mut self, values: Vec<T>) -> Result<()> {
        self.values.typed_mut::<T>()?.set_values(values)?;
        Ok(())
    }

    /// Overwrite the variances, allocating them if absent.
    pub fn set_variances<T: VariableElement>(&mut self, variances: Vec<T>) -> Result<()> {
        if !T::DTYPE.supports_variances() || self.is_binned() {
            return Err(Error::Variances(format!(
                "{} does not support variances",
                self.dtype()
            )));
        }
        if self.dtype() != T::DTYPE {
            return Err(Error::Type(format!(
                "variances of type {} for values of type {}",
                T::DTYPE,
                self.dtype()
            )));
        }
        match &mut self.variances {
            Some(v) => v.typed_mut::<T>()?.set_values(variances)?,
            None => {
                if self.is_view() {
                    return Err(Error::Variances("cannot add variances to a view".into()));
                }
                self.variances = Some(T::wrap(Storage::from_vec(self.dims(), variances)?));
            }
        }
        Ok(())
    }

    /// Attach zero variances if none are present.
    pub(crate) fn ensure_variances(&mut self) -> Result<()> {
        if let Some(b) = &mut self.bins {
            return b.buffer_mut().data_mut().ensure_variances();
        }
        if self.variances.is_none() {
            if !self.dtype().supports_variances() {
                return Err(Error::Variances(format!(
                    "{} does not support variances",
                    self.dtype()
                )));
            }
            self.variances = Some(VariableConcept::zeros(self.dtype(), self.dims()));
        }
        Ok(())
    }

    /// Drop the variances.
    pub fn drop_variances(&mut self) {
        self.variances = None;
    }

    // ------------------------------------------------------------------
    // Views and copies
    // ------------------------------------------------------------------

    fn map_views(
        &self,
        f: impl Fn(&VariableConcept) -> Result<VariableConcept>,
    ) -> Result<Self> {
        Ok(Self {
            unit: self.unit,
            values: f(&self.values)?,
            variances: self.variances.as_ref().map(&f).transpose()?,
            sparse_dim: self.sparse_dim,
            bins: self.bins.as_ref().map(|b| Box::new(b.share())),
        })
    }

    /// Point or range view along one dimension.
    pub fn slice(&self, slice: Slice) -> Result<Self> {
        self.map_views(|c| c.slice(slice))
    }

    /// View with dimensions reordered.
    pub fn transpose(&self, order: &[Dim]) -> Result<Self> {
        self.map_views(|c| c.transpose(order))
    }

    /// Read-only view broadcast to `dims`.
    pub fn broadcast(&self, dims: &Dimensions) -> Result<Self> {
        self.map_views(|c| c.broadcast(dims))
    }

    /// View of the whole variable.
    pub fn view(&self) -> Self {
        Self {
            unit: self.unit,
            values: self.values.make_view(),
            variances: self.variances.as_ref().map(|v| v.make_view()),
            sparse_dim: self.sparse_dim,
            bins: self.bins.as_ref().map(|b| Box::new(b.share())),
        }
    }

    /// Element at row-major position `index` as a zero-dimensional view.
    pub fn element(&self, index: usize) -> Result<Self> {
        let dims = self.dims();
        if index >= dims.volume() {
            return Err(Error::Dimension(scivar_view::DimensionError::SliceOutOfRange {
                dim: dims.inner().unwrap_or_default(),
                begin: index,
                end: index + 1,
                extent: dims.volume(),
            }));
        }
        let mut out = self.view();
        let mut rem = index;
        let mut coords = [0usize; scivar_view::NDIM_MAX];
        for i in (0..dims.ndim()).rev() {
            coords[i] = rem % dims.size(i);
            rem /= dims.size(i);
        }
        for (i, dim) in dims.labels().iter().enumerate() {
            out = out.slice(Slice::point(*dim, coords[i]))?;
        }
        Ok(out)
    }

    /// Copy into a fresh buffer with new dimensions of equal volume.
    pub fn reshape(&self, dims: Dimensions) -> Result<Self> {
        if self.is_binned() {
            let copy = self.copy()?;
            let Some(b) = copy.bins else {
                return Err(Error::BinnedData("lost bin buffer during copy".into()));
            };
            return Ok(Self::from_bins(copy.values.reshape(dims)?, *b));
        }
        self.map_views(|c| c.reshape(dims))
    }

    /// Independent deep copy; views are materialized, binned variables get a
    /// compacted buffer.
    pub fn copy(&self) -> Result<Self> {
        if self.is_binned() {
            return bins::copy_binned(self);
        }
        Ok(Self {
            unit: self.unit,
            values: self.values.deep_clone(),
            variances: self.variances.as_ref().map(|v| v.deep_clone()),
            sparse_dim: self.sparse_dim,
            bins: None,
        })
    }

    /// Second handle to the same buffers.
    pub fn share(&self) -> Self {
        Self {
            unit: self.unit,
            values: self.values.clone(),
            variances: self.variances.clone(),
            sparse_dim: self.sparse_dim,
            bins: self.bins.as_ref().map(|b| Box::new(b.share())),
        }
    }

    /// Overwrite values and variances with `other` broadcast to `self.dims()`.
    pub fn assign(&mut self, other: &Variable) -> Result<()> {
        if self.is_binned() || other.is_binned() {
            return Err(Error::BinnedData("assign is not supported for binned data".into()));
        }
        if self.unit() != other.unit() {
            return Err(Error::Unit(format!(
                "cannot assign {} to {}",
                other.unit(),
                self.unit()
            )));
        }
        if self.has_variances() != other.has_variances() {
            return Err(Error::Variances(
                "assign requires variances on both sides or neither".into(),
            ));
        }
        if self.dtype() != other.dtype() {
            return Err(Error::Type(format!(
                "cannot assign {} to {}",
                other.dtype(),
                self.dtype()
            )));
        }
        self.values.assign(&other.values)?;
        if let (Some(a), Some(b)) = (&mut self.variances, &other.variances) {
            a.assign(b)?;
        }
        Ok(())
    }

    /// Copy `other[src_begin..src_end]` along `dim` into `self` at `dst_offset`.
    pub fn copy_range(
        &mut self,
        other: &Variable,
        dim: Dim,
        dst_offset: usize,
        src_begin: usize,
        src_end: usize,
    ) -> Result<()> {
        if self.unit() != other.unit() {
            return Err(Error::Unit(format!(
                "copy_range between {} and {}",
                self.unit(),
                other.unit()
            )));
        }
        if self.has_variances() != other.has_variances() {
            return Err(Error::Variances(
                "copy_range requires variances on both sides or neither".into(),
            ));
        }
        self.values
            .copy_range(&other.values, dim, dst_offset, src_begin, src_end)?;
        if let (Some(a), Some(b)) = (&mut self.variances, &other.variances) {
            a.copy_range(b, dim, dst_offset, src_begin, src_end)?;
        }
        Ok(())
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Variable) -> bool {
        if self.dims() != other.dims()
            || self.dtype() != other.dtype()
            || self.unit() != other.unit()
            || self.has_variances() != other.has_variances()
            || self.sparse_dim != other.sparse_dim
            || self.is_binned() != other.is_binned()
        {
            return false;
        }
        if self.is_binned() {
            return bins::bins_equal(self, other);
        }
        if !self.values.equals(&other.values) {
            return false;
        }
        match (&self.variances, &other.variances) {
            (Some(a), Some(b)) => a.equals(b),
            _ => true,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Variable {} {} [{}]", self.dims(), self.dtype(), self.unit())?;
        if self.has_variances() {
            f.write_str(" with variances")?;
        }
        if let Some(b) = &self.bins {
            write!(f, " binned along {}", b.dim())?;
        }
        f.write_str(">")
    }
}
