//! Typed storage: an owning dense array or a view into one.
//!
//! Both variants hold a [`Buffer`], a shared handle to one contiguous
//! `Vec<T>`. A view is a value type `(buffer, layout)`; it never owns the
//! data exclusively and may alias other views of the same buffer. Overlap is
//! detected by comparing buffer identity, never pointers into the data.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use scivar_traits::{DType, Element};

use crate::dims::{Dim, Dimensions};
use crate::layout::{Slice, ViewLayout};
use crate::view::{StridedView, StridedViewMut};
use crate::{DimensionError, Result};

// ============================================================================
// Buffer
// ============================================================================

/// Shared handle to a contiguous element buffer.
///
/// Cloning the handle shares the buffer. Locks are held only for the
/// duration of one operation; a poisoned lock is recovered since the buffer
/// holds plain data.
#[derive(Debug, Default)]
pub struct Buffer<T>(Arc<RwLock<Vec<T>>>);

impl<T> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Buffer<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self(Arc::new(RwLock::new(data)))
    }

    /// Identity of the underlying allocation.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Buffer<T>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of handles sharing this buffer.
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Guards
// ============================================================================

/// Read access to the elements of a [`Storage`].
pub struct ReadGuard<'a, T> {
    guard: RwLockReadGuard<'a, Vec<T>>,
    layout: ViewLayout,
}

impl<T> ReadGuard<'_, T> {
    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    /// View through the storage's own layout.
    pub fn view(&self) -> Result<StridedView<'_, T>> {
        StridedView::new(&self.guard, self.layout)
    }

    /// View through another layout over the same buffer, e.g. a broadcast
    /// of the storage's layout.
    pub fn view_as(&self, layout: ViewLayout) -> Result<StridedView<'_, T>> {
        StridedView::new(&self.guard, layout)
    }

    /// The whole buffer.
    pub fn raw(&self) -> &[T] {
        &self.guard
    }
}

/// Write access to the elements of a [`Storage`].
pub struct WriteGuard<'a, T> {
    guard: RwLockWriteGuard<'a, Vec<T>>,
    layout: ViewLayout,
}

impl<T> WriteGuard<'_, T> {
    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    pub fn view(&self) -> Result<StridedView<'_, T>> {
        StridedView::new(&self.guard, self.layout)
    }

    pub fn view_mut(&mut self) -> Result<StridedViewMut<'_, T>> {
        StridedViewMut::new(&mut self.guard, self.layout)
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Owning contiguous array: buffer length equals `dims.volume()`.
#[derive(Debug, Clone)]
pub struct DenseArray<T> {
    buffer: Buffer<T>,
    dims: Dimensions,
}

/// Non-owning strided view into a buffer.
#[derive(Debug, Clone)]
pub struct ArrayView<T> {
    buffer: Buffer<T>,
    layout: ViewLayout,
}

/// Typed storage of one variable's values (or variances).
///
/// `Clone` is shallow: both copies refer to the same buffer. Use
/// [`Storage::deep_clone`] for an independent copy.
#[derive(Debug, Clone)]
pub enum Storage<T> {
    Dense(DenseArray<T>),
    View(ArrayView<T>),
}

impl<T: Element> Storage<T> {
    /// Owning storage over `data`, which must hold `dims.volume()` elements.
    pub fn from_vec(dims: Dimensions, data: Vec<T>) -> Result<Self> {
        if data.len() != dims.volume() {
            return Err(DimensionError::LengthMismatch {
                expected: dims.volume(),
                actual: data.len(),
            });
        }
        Ok(Storage::Dense(DenseArray {
            buffer: Buffer::new(data),
            dims,
        }))
    }

    /// Zero-dimensional owning storage.
    pub fn scalar(value: T) -> Self {
        Storage::Dense(DenseArray {
            buffer: Buffer::new(vec![value]),
            dims: Dimensions::scalar(),
        })
    }

    /// Default-initialized owning storage.
    pub fn zeros(dims: Dimensions) -> Self {
        Storage::Dense(DenseArray {
            buffer: Buffer::new(vec![T::default(); dims.volume()]),
            dims,
        })
    }

    /// View of `buffer` through `layout`, which must stay within the buffer.
    pub fn from_buffer(buffer: Buffer<T>, layout: ViewLayout) -> Result<Self> {
        let len = buffer.len();
        let span = layout.span();
        if span > len {
            return Err(DimensionError::OutOfBounds { span, len });
        }
        Ok(Storage::View(ArrayView { buffer, layout }))
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn dims(&self) -> Dimensions {
        match self {
            Storage::Dense(a) => a.dims,
            Storage::View(v) => *v.layout.dims(),
        }
    }

    pub fn layout(&self) -> ViewLayout {
        match self {
            Storage::Dense(a) => ViewLayout::contiguous(a.dims),
            Storage::View(v) => v.layout,
        }
    }

    pub fn buffer(&self) -> &Buffer<T> {
        match self {
            Storage::Dense(a) => &a.buffer,
            Storage::View(v) => &v.buffer,
        }
    }

    #[inline]
    pub fn is_view(&self) -> bool {
        matches!(self, Storage::View(_))
    }

    pub fn is_contiguous(&self) -> bool {
        match self {
            Storage::Dense(_) => true,
            Storage::View(v) => v.layout.is_contiguous(),
        }
    }

    /// Whether `self` and `other` refer to the same buffer.
    pub fn shares_buffer(&self, other: &Storage<T>) -> bool {
        self.buffer().ptr_eq(other.buffer())
    }

    /// Same buffer, but a different offset or shape.
    pub fn overlaps(&self, other: &Storage<T>) -> bool {
        self.shares_buffer(other) && self.layout() != other.layout()
    }

    pub fn read(&self) -> ReadGuard<'_, T> {
        ReadGuard {
            guard: self.buffer().read(),
            layout: self.layout(),
        }
    }

    pub fn write(&mut self) -> WriteGuard<'_, T> {
        let layout = self.layout();
        WriteGuard {
            guard: self.buffer().write(),
            layout,
        }
    }

    /// Elements in row-major order of `dims()`.
    pub fn to_vec(&self) -> Vec<T> {
        let guard = self.read();
        let raw = guard.raw();
        guard
            .layout()
            .iter()
            .filter_map(|o| raw.get(o).cloned())
            .collect()
    }

    /// Independent owning copy with the same dimensions.
    pub fn deep_clone(&self) -> Self {
        Storage::Dense(DenseArray {
            buffer: Buffer::new(self.to_vec()),
            dims: self.dims(),
        })
    }

    /// Fresh default-initialized storage of another shape.
    pub fn clone_with_dims(&self, dims: Dimensions) -> Self {
        Self::zeros(dims)
    }

    /// View over the whole storage. For a dense array this is a re-wrap.
    pub fn make_view(&self) -> Self {
        Storage::View(ArrayView {
            buffer: self.buffer().clone(),
            layout: self.layout(),
        })
    }

    pub fn slice(&self, slice: Slice) -> Result<Self> {
        Ok(Storage::View(ArrayView {
            buffer: self.buffer().clone(),
            layout: self.layout().slice(slice)?,
        }))
    }

    pub fn broadcast(&self, target: &Dimensions) -> Result<Self> {
        Ok(Storage::View(ArrayView {
            buffer: self.buffer().clone(),
            layout: self.layout().broadcast_to(target)?,
        }))
    }

    pub fn transpose(&self, order: &[Dim]) -> Result<Self> {
        Ok(Storage::View(ArrayView {
            buffer: self.buffer().clone(),
            layout: self.layout().transpose(order)?,
        }))
    }

    /// Copy into a fresh buffer with new dimensions of equal volume.
    pub fn reshape(&self, dims: Dimensions) -> Result<Self> {
        if dims.volume() != self.dims().volume() {
            return Err(DimensionError::VolumeMismatch {
                from: self.dims(),
                to: dims,
            });
        }
        Self::from_vec(dims, self.to_vec())
    }

    /// Element-wise equality of dimensions and data.
    pub fn equals(&self, other: &Storage<T>) -> bool {
        if self.dims() != other.dims() {
            return false;
        }
        if self.shares_buffer(other) && self.layout() == other.layout() {
            return true;
        }
        let a = self.read();
        let b = other.read();
        match (a.view(), b.view()) {
            (Ok(a), Ok(b)) => a.iter().eq(b.iter()),
            _ => false,
        }
    }

    /// Overwrite every element with `other`, broadcast to `self.dims()`.
    ///
    /// If `other` shares the buffer it is copied first.
    pub fn assign(&mut self, other: &Storage<T>) -> Result<()> {
        let layout = other.layout().broadcast_to(&self.dims())?;
        if self.shares_buffer(other) {
            let tmp = other.deep_clone();
            return self.assign(&tmp);
        }
        let src = other.read();
        let src = src.view_as(layout)?;
        let mut dst = self.write();
        dst.view_mut()?.assign(&src)
    }

    /// Copy `other[src_begin..src_end]` along `dim` into `self` starting at
    /// `dst_offset` along the same dimension. All other extents must match.
    pub fn copy_range(
        &mut self,
        other: &Storage<T>,
        dim: Dim,
        dst_offset: usize,
        src_begin: usize,
        src_end: usize,
    ) -> Result<()> {
        let src = other.slice(Slice::range(dim, src_begin, src_end))?;
        let len = src_end - src_begin;
        let mut dst = self.slice(Slice::range(dim, dst_offset, dst_offset + len))?;
        if src.dims() != dst.dims() {
            return Err(DimensionError::Mismatch {
                expected: dst.dims(),
                actual: src.dims(),
            });
        }
        dst.assign(&src)
    }

    /// Replace all elements, in row-major order of `dims()`.
    pub fn set_values(&mut self, values: Vec<T>) -> Result<()> {
        let expected = self.dims().volume();
        if values.len() != expected {
            return Err(DimensionError::LengthMismatch {
                expected,
                actual: values.len(),
            });
        }
        let mut guard = self.write();
        guard.view_mut()?.assign_iter(values)
    }

    /// Set every element to `value`.
    pub fn fill(&mut self, value: T) -> Result<()> {
        let mut guard = self.write();
        guard.view_mut()?.fill(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yx(ny: usize, nx: usize) -> Dimensions {
        Dimensions::new(&[(Dim::Y, ny), (Dim::X, nx)]).unwrap()
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(matches!(
            Storage::from_vec(yx(2, 2), vec![1.0, 2.0, 3.0]),
            Err(DimensionError::LengthMismatch { expected: 4, actual: 3 })
        ));
        let s = Storage::from_vec(yx(2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(s.dtype(), DType::F64);
        assert!(!s.is_view());
        assert!(s.is_contiguous());
    }

    #[test]
    fn test_clone_is_shallow_deep_clone_is_not() {
        let s = Storage::from_vec(yx(1, 2), vec![1, 2]).unwrap();
        let shared = s.clone();
        let mut deep = s.deep_clone();
        assert!(shared.shares_buffer(&s));
        assert!(!deep.shares_buffer(&s));
        deep.fill(0).unwrap();
        assert_eq!(s.to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_slice_writes_reach_parent() {
        let s = Storage::from_vec(Dimensions::single(Dim::X, 4).unwrap(), vec![1, 2, 3, 4]).unwrap();
        let mut v = s.slice(Slice::range(Dim::X, 1, 3)).unwrap();
        assert!(v.is_view());
        v.fill(9).unwrap();
        assert_eq!(s.to_vec(), vec![1, 9, 9, 4]);
        assert!(v.overlaps(&s));
    }

    #[test]
    fn test_transpose_and_reshape() {
        let s = Storage::from_vec(yx(2, 3), vec![1, 2, 3, 4, 5, 6]).unwrap();
        let t = s.transpose(&[Dim::X, Dim::Y]).unwrap();
        assert!(!t.is_contiguous());
        assert_eq!(t.to_vec(), vec![1, 4, 2, 5, 3, 6]);
        let r = t.reshape(Dimensions::single(Dim::Z, 6).unwrap()).unwrap();
        assert_eq!(r.to_vec(), vec![1, 4, 2, 5, 3, 6]);
        assert!(!r.shares_buffer(&s));
        assert!(matches!(
            s.reshape(Dimensions::single(Dim::Z, 5).unwrap()),
            Err(DimensionError::VolumeMismatch { .. })
        ));
    }

    #[test]
    fn test_assign_broadcasts() {
        let mut s = Storage::<f64>::zeros(yx(2, 2));
        let row = Storage::from_vec(Dimensions::single(Dim::X, 2).unwrap(), vec![1.0, 2.0]).unwrap();
        s.assign(&row).unwrap();
        assert_eq!(s.to_vec(), vec![1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_assign_from_aliasing_view() {
        let mut s = Storage::from_vec(Dimensions::single(Dim::X, 4).unwrap(), vec![1, 2, 3, 4]).unwrap();
        let src = s.slice(Slice::range(Dim::X, 0, 3)).unwrap();
        let mut dst = s.slice(Slice::range(Dim::X, 1, 4)).unwrap();
        dst.assign(&src).unwrap();
        assert_eq!(s.to_vec(), vec![1, 1, 2, 3]);
        s.fill(0).unwrap();
        assert_eq!(src.to_vec(), vec![0, 0, 0]);
    }

    #[test]
    fn test_copy_range() {
        let a = Storage::from_vec(yx(2, 2), vec![1, 2, 3, 4]).unwrap();
        let mut out = Storage::<i32>::zeros(yx(2, 3));
        out.copy_range(&a, Dim::X, 1, 0, 2).unwrap();
        assert_eq!(out.to_vec(), vec![0, 1, 2, 0, 3, 4]);
        assert!(out.copy_range(&a, Dim::X, 2, 0, 2).is_err());
    }

    #[test]
    fn test_equals() {
        let a = Storage::from_vec(yx(1, 2), vec![1.0, 2.0]).unwrap();
        let b = Storage::from_vec(yx(1, 2), vec![1.0, 2.0]).unwrap();
        let c = Storage::from_vec(Dimensions::single(Dim::X, 2).unwrap(), vec![1.0, 2.0]).unwrap();
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
        assert!(a.equals(&a.make_view()));
    }
}
