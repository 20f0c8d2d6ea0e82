//! Borrowed element access through a [`ViewLayout`].
//!
//! - [`StridedView`]: immutable view over a slice
//! - [`StridedViewMut`]: mutable view over a slice; broadcast layouts are rejected
//!
//! Both check once at construction that the layout stays inside the slice,
//! so element access afterwards is plain indexing.

use crate::dims::Dimensions;
use crate::layout::{Slice, ViewIndex, ViewLayout};
use crate::{DimensionError, Result};

fn validate_bounds(len: usize, layout: &ViewLayout) -> Result<()> {
    let span = layout.span();
    if span > len {
        return Err(DimensionError::OutOfBounds { span, len });
    }
    Ok(())
}

// ============================================================================
// StridedView
// ============================================================================

/// Immutable strided view.
#[derive(Debug)]
pub struct StridedView<'a, T> {
    data: &'a [T],
    layout: ViewLayout,
}

impl<T> Clone for StridedView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StridedView<'_, T> {}

impl<'a, T> StridedView<'a, T> {
    pub fn new(data: &'a [T], layout: ViewLayout) -> Result<Self> {
        validate_bounds(data.len(), &layout)?;
        Ok(Self { data, layout })
    }

    /// Whole slice viewed with contiguous dimensions `dims`.
    pub fn contiguous(data: &'a [T], dims: Dimensions) -> Result<Self> {
        if data.len() != dims.volume() {
            return Err(DimensionError::LengthMismatch {
                expected: dims.volume(),
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            layout: ViewLayout::contiguous(dims),
        })
    }

    #[inline]
    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    #[inline]
    pub fn dims(&self) -> &Dimensions {
        self.layout.dims()
    }

    /// Number of logical elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.layout.volume()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The full underlying slice.
    #[inline]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// The visited elements as one slice, if they are contiguous.
    pub fn as_slice(&self) -> Option<&'a [T]> {
        if !self.layout.is_contiguous() {
            return None;
        }
        let start = self.layout.offset();
        Some(&self.data[start..start + self.len()])
    }

    /// Element at row-major position `index`.
    pub fn get(&self, index: usize) -> Option<&'a T> {
        if index >= self.len() {
            return None;
        }
        self.data.get(self.layout.offset_of(index))
    }

    pub fn offsets(&self) -> ViewIndex {
        self.layout.iter()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &'a T> + 'a {
        let data = self.data;
        self.layout.iter().map(move |o| &data[o])
    }

    pub fn slice(&self, slice: Slice) -> Result<Self> {
        Ok(Self {
            data: self.data,
            layout: self.layout.slice(slice)?,
        })
    }

    pub fn broadcast_to(&self, target: &Dimensions) -> Result<Self> {
        Ok(Self {
            data: self.data,
            layout: self.layout.broadcast_to(target)?,
        })
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

// ============================================================================
// StridedViewMut
// ============================================================================

/// Mutable strided view. Every logical element maps to a distinct offset.
#[derive(Debug)]
pub struct StridedViewMut<'a, T> {
    data: &'a mut [T],
    layout: ViewLayout,
}

impl<'a, T> StridedViewMut<'a, T> {
    pub fn new(data: &'a mut [T], layout: ViewLayout) -> Result<Self> {
        validate_bounds(data.len(), &layout)?;
        if layout.has_broadcast() {
            return Err(DimensionError::BroadcastWrite(*layout.dims()));
        }
        Ok(Self { data, layout })
    }

    #[inline]
    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    #[inline]
    pub fn dims(&self) -> &Dimensions {
        self.layout.dims()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layout.volume()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The full underlying slice, for kernels walking [`Self::offsets`].
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }

    pub fn as_slice_mut(&mut self) -> Option<&mut [T]> {
        if !self.layout.is_contiguous() {
            return None;
        }
        let start = self.layout.offset();
        let end = start + self.len();
        Some(&mut self.data[start..end])
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len() {
            return None;
        }
        self.data.get_mut(self.layout.offset_of(index))
    }

    pub fn offsets(&self) -> ViewIndex {
        self.layout.iter()
    }

    /// Shorter-lived mutable view over the same elements.
    pub fn reborrow(&mut self) -> StridedViewMut<'_, T> {
        StridedViewMut {
            data: &mut *self.data,
            layout: self.layout,
        }
    }

    pub fn as_view(&self) -> StridedView<'_, T> {
        StridedView {
            data: &*self.data,
            layout: self.layout,
        }
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        for o in self.layout.iter() {
            f(&mut self.data[o]);
        }
    }

    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.for_each_mut(|x| *x = value.clone());
    }

    /// Copy `src` element by element; dimensions must match exactly.
    pub fn assign(&mut self, src: &StridedView<'_, T>) -> Result<()>
    where
        T: Clone,
    {
        if src.dims() != self.dims() {
            return Err(DimensionError::Mismatch {
                expected: *self.dims(),
                actual: *src.dims(),
            });
        }
        for (d, s) in self.layout.iter().zip(src.offsets()) {
            self.data[d] = src.data[s].clone();
        }
        Ok(())
    }

    /// Move the elements of `values` in, in row-major order.
    pub fn assign_iter(&mut self, values: impl IntoIterator<Item = T>) -> Result<()> {
        let mut count = 0usize;
        let mut offsets = self.layout.iter();
        for value in values {
            count += 1;
            match offsets.next() {
                Some(o) => self.data[o] = value,
                None => continue,
            }
        }
        if count != self.len() {
            return Err(DimensionError::LengthMismatch {
                expected: self.len(),
                actual: count,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dims::Dim;

    fn yx(ny: usize, nx: usize) -> Dimensions {
        Dimensions::new(&[(Dim::Y, ny), (Dim::X, nx)]).unwrap()
    }

    #[test]
    fn test_bounds_checked_at_construction() {
        let data = [1.0, 2.0, 3.0];
        let layout = ViewLayout::contiguous(yx(2, 2));
        assert!(matches!(
            StridedView::new(&data, layout),
            Err(DimensionError::OutOfBounds { span: 4, len: 3 })
        ));
    }

    #[test]
    fn test_iter_and_get() {
        let data = [1, 2, 3, 4, 5, 6];
        let v = StridedView::contiguous(&data, yx(2, 3)).unwrap();
        let col = v.slice(Slice::point(Dim::X, 1)).unwrap();
        assert_eq!(col.to_vec(), vec![2, 5]);
        assert_eq!(col.get(1), Some(&5));
        assert_eq!(col.get(2), None);
        assert!(col.as_slice().is_none());
        let row = v.slice(Slice::point(Dim::Y, 1)).unwrap();
        assert_eq!(row.as_slice(), Some(&data[3..6]));
    }

    #[test]
    fn test_mut_rejects_broadcast() {
        let mut data = [0.0; 3];
        let layout = ViewLayout::new(0, yx(2, 3), &Dimensions::single(Dim::X, 3).unwrap()).unwrap();
        assert!(matches!(
            StridedViewMut::new(&mut data, layout),
            Err(DimensionError::BroadcastWrite(_))
        ));
    }

    #[test]
    fn test_assign_transposed() {
        let src = [1, 2, 3, 4, 5, 6];
        let src = StridedView::contiguous(&src, yx(2, 3)).unwrap();
        let src_t = StridedView::new(
            src.data(),
            src.layout().transpose(&[Dim::X, Dim::Y]).unwrap(),
        )
        .unwrap();
        let mut out = [0; 6];
        let mut dst =
            StridedViewMut::new(&mut out, ViewLayout::contiguous(yx(3, 2).transpose(&[Dim::X, Dim::Y]).unwrap()))
                .unwrap();
        assert!(dst.assign(&src_t).is_err());
        let mut dst = StridedViewMut::new(&mut out, ViewLayout::contiguous(*src_t.dims())).unwrap();
        dst.assign(&src_t).unwrap();
        assert_eq!(out, [1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_fill_and_assign_iter() {
        let mut data = [0; 6];
        let layout = ViewLayout::contiguous(yx(2, 3))
            .slice(Slice::range(Dim::X, 1, 3))
            .unwrap();
        let mut v = StridedViewMut::new(&mut data, layout).unwrap();
        v.fill(7);
        assert_eq!(data, [0, 7, 7, 0, 7, 7]);
        let mut v = StridedViewMut::new(&mut data, layout).unwrap();
        v.assign_iter([1, 2, 3, 4]).unwrap();
        assert_eq!(data, [0, 1, 2, 0, 3, 4]);
        let mut v = StridedViewMut::new(&mut data, layout).unwrap();
        assert!(matches!(
            v.assign_iter([1, 2]),
            Err(DimensionError::LengthMismatch { expected: 4, actual: 2 })
        ));
    }
}
