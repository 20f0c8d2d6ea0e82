//! Strided layouts over row-major buffers and odometer-style index iteration.
//!
//! A [`ViewLayout`] describes which elements of a contiguous buffer a view
//! visits: a base offset, the target [`Dimensions`] the caller iterates, and
//! one stride per target axis. Axes of the target that do not exist in the
//! underlying buffer get stride 0, i.e. the view is constant (broadcast)
//! along them.

use crate::dims::{Dim, Dimensions, NDIM_MAX};
use crate::{DimensionError, Result};

/// A point or range selection along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    dim: Dim,
    begin: usize,
    end: Option<usize>,
}

impl Slice {
    /// Select index `index` and drop `dim`.
    pub const fn point(dim: Dim, index: usize) -> Self {
        Self {
            dim,
            begin: index,
            end: None,
        }
    }

    /// Select `[begin, end)` and keep `dim` with extent `end - begin`.
    pub const fn range(dim: Dim, begin: usize, end: usize) -> Self {
        Self {
            dim,
            begin,
            end: Some(end),
        }
    }

    #[inline]
    pub fn dim(&self) -> Dim {
        self.dim
    }

    #[inline]
    pub fn begin(&self) -> usize {
        self.begin
    }

    #[inline]
    pub fn end(&self) -> Option<usize> {
        self.end
    }

    #[inline]
    pub fn is_range(&self) -> bool {
        self.end.is_some()
    }
}

/// Offset, target dimensions and per-axis strides of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewLayout {
    offset: usize,
    dims: Dimensions,
    strides: [usize; NDIM_MAX],
}

impl ViewLayout {
    /// Layout of a whole contiguous buffer with dimensions `dims`.
    pub fn contiguous(dims: Dimensions) -> Self {
        Self {
            offset: 0,
            dims,
            strides: dims.strides(),
        }
    }

    /// View of a contiguous buffer with dimensions `data`, iterated as `target`.
    ///
    /// Target axes absent from `data` are broadcast. Target extents must not
    /// exceed the corresponding buffer extents.
    pub fn new(offset: usize, target: Dimensions, data: &Dimensions) -> Result<Self> {
        let data_strides = data.strides();
        let mut strides = [0usize; NDIM_MAX];
        for (i, (dim, extent)) in target.iter().enumerate() {
            if let Ok(j) = data.index_of(dim) {
                if extent > data.size(j) {
                    return Err(DimensionError::ExtentMismatch {
                        dim,
                        expected: data.size(j),
                        actual: extent,
                    });
                }
                strides[i] = data_strides[j];
            }
        }
        Ok(Self {
            offset,
            dims: target,
            strides,
        })
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides[..self.dims.ndim()]
    }

    #[inline]
    pub fn volume(&self) -> usize {
        self.dims.volume()
    }

    /// Stride of `dim`.
    pub fn stride(&self, dim: Dim) -> Result<usize> {
        Ok(self.strides[self.dims.index_of(dim)?])
    }

    /// Whether the view visits `volume()` consecutive elements in order.
    pub fn is_contiguous(&self) -> bool {
        let mut expected = 1usize;
        for i in (0..self.dims.ndim()).rev() {
            let n = self.dims.size(i);
            if n != 1 && self.strides[i] != expected {
                return false;
            }
            expected *= n;
        }
        true
    }

    /// Whether some axis of extent > 1 has stride 0.
    pub fn has_broadcast(&self) -> bool {
        (0..self.dims.ndim()).any(|i| self.strides[i] == 0 && self.dims.size(i) > 1)
    }

    /// One past the largest buffer offset visited, or 0 for an empty view.
    pub fn span(&self) -> usize {
        if self.volume() == 0 {
            return 0;
        }
        self.offset
            + (0..self.dims.ndim())
                .map(|i| self.strides[i] * (self.dims.size(i) - 1))
                .sum::<usize>()
            + 1
    }

    /// Restrict the view to a point or range along one axis.
    pub fn slice(&self, slice: Slice) -> Result<Self> {
        let dim = slice.dim();
        let i = self.dims.index_of(dim)?;
        let extent = self.dims.size(i);
        let begin = slice.begin();
        let mut out = *self;
        match slice.end() {
            None => {
                if begin >= extent {
                    return Err(DimensionError::SliceOutOfRange {
                        dim,
                        begin,
                        end: begin + 1,
                        extent,
                    });
                }
                out.offset += begin * self.strides[i];
                for j in i..self.dims.ndim() - 1 {
                    out.strides[j] = out.strides[j + 1];
                }
                out.strides[self.dims.ndim() - 1] = 0;
                out.dims.erase(dim)?;
            }
            Some(end) => {
                if begin > end || end > extent {
                    return Err(DimensionError::SliceOutOfRange {
                        dim,
                        begin,
                        end,
                        extent,
                    });
                }
                if end > begin {
                    out.offset += begin * self.strides[i];
                }
                out.dims.resize(dim, end - begin)?;
            }
        }
        Ok(out)
    }

    /// Iterate the same elements as `target`, which must contain every axis
    /// of this layout with equal extent. New axes are broadcast.
    pub fn broadcast_to(&self, target: &Dimensions) -> Result<Self> {
        for (dim, extent) in self.dims.iter() {
            match target.extent(dim) {
                Ok(e) if e == extent => {}
                Ok(e) => {
                    return Err(DimensionError::ExtentMismatch {
                        dim,
                        expected: e,
                        actual: extent,
                    })
                }
                Err(_) => {
                    return Err(DimensionError::Broadcast {
                        from: self.dims,
                        to: *target,
                    })
                }
            }
        }
        let mut strides = [0usize; NDIM_MAX];
        for (i, dim) in target.labels().iter().enumerate() {
            if let Ok(j) = self.dims.index_of(*dim) {
                strides[i] = self.strides[j];
            }
        }
        Ok(Self {
            offset: self.offset,
            dims: *target,
            strides,
        })
    }

    /// Reorder the axes; no data moves.
    pub fn transpose(&self, order: &[Dim]) -> Result<Self> {
        let dims = self.dims.transpose(order)?;
        let mut strides = [0usize; NDIM_MAX];
        for (i, dim) in order.iter().enumerate() {
            strides[i] = self.stride(*dim)?;
        }
        Ok(Self {
            offset: self.offset,
            dims,
            strides,
        })
    }

    /// Buffer offset of the element at linear (row-major) target position `index`.
    pub fn offset_of(&self, index: usize) -> usize {
        let mut rem = index;
        let mut off = self.offset;
        for i in (0..self.dims.ndim()).rev() {
            let n = self.dims.size(i);
            off += (rem % n) * self.strides[i];
            rem /= n;
        }
        off
    }

    /// Iterate buffer offsets in row-major target order.
    pub fn iter(&self) -> ViewIndex {
        ViewIndex::new(self)
    }
}

/// Odometer over the buffer offsets of a [`ViewLayout`].
///
/// Axes are stored innermost first. Advancing increments the innermost
/// coordinate and carries outward; each carry applies a precomputed `delta`
/// (the net offset change for rolling all inner axes back to 0 and stepping
/// this axis by one), so every step is a constant number of additions.
#[derive(Debug, Clone)]
pub struct ViewIndex {
    ndim: usize,
    extent: [usize; NDIM_MAX],
    strides: [usize; NDIM_MAX],
    delta: [isize; NDIM_MAX],
    coord: [usize; NDIM_MAX],
    base: usize,
    offset: usize,
    index: usize,
    end: usize,
}

impl ViewIndex {
    pub fn new(layout: &ViewLayout) -> Self {
        let ndim = layout.dims().ndim();
        let mut extent = [0usize; NDIM_MAX];
        let mut strides = [0usize; NDIM_MAX];
        let mut delta = [0isize; NDIM_MAX];
        for k in 0..ndim {
            let i = ndim - 1 - k;
            extent[k] = layout.dims().size(i);
            strides[k] = layout.strides[i];
        }
        let mut rollover = 0isize;
        for k in 0..ndim {
            delta[k] = strides[k] as isize - rollover;
            rollover += strides[k] as isize * (extent[k] as isize - 1);
        }
        Self {
            ndim,
            extent,
            strides,
            delta,
            coord: [0; NDIM_MAX],
            base: layout.offset(),
            offset: layout.offset(),
            index: 0,
            end: layout.volume(),
        }
    }

    /// Current buffer offset.
    #[inline]
    pub fn get(&self) -> usize {
        self.offset
    }

    /// Current linear target position.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn increment(&mut self) {
        self.index += 1;
        for k in 0..self.ndim {
            self.coord[k] += 1;
            if self.coord[k] < self.extent[k] {
                self.offset = (self.offset as isize + self.delta[k]) as usize;
                return;
            }
            self.coord[k] = 0;
        }
        self.offset = self.base;
    }

    /// Jump to linear target position `index`.
    pub fn set_index(&mut self, index: usize) {
        self.index = index;
        self.offset = self.base;
        let mut rem = index;
        for k in 0..self.ndim {
            let n = self.extent[k];
            if n == 0 {
                self.coord[k] = 0;
                continue;
            }
            self.coord[k] = rem % n;
            rem /= n;
            self.offset += self.coord[k] * self.strides[k];
        }
    }
}

impl Iterator for ViewIndex {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.index >= self.end {
            return None;
        }
        let offset = self.offset;
        self.increment();
        Some(offset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end.saturating_sub(self.index);
        (n, Some(n))
    }
}

impl ExactSizeIterator for ViewIndex {}

#[cfg(test)]
mod tests {
    use super::*;

    fn yx(ny: usize, nx: usize) -> Dimensions {
        Dimensions::new(&[(Dim::Y, ny), (Dim::X, nx)]).unwrap()
    }

    #[test]
    fn test_contiguous_iteration() {
        let layout = ViewLayout::contiguous(yx(2, 3));
        assert!(layout.is_contiguous());
        assert_eq!(layout.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_transposed_iteration() {
        let layout = ViewLayout::contiguous(yx(2, 3))
            .transpose(&[Dim::X, Dim::Y])
            .unwrap();
        assert!(!layout.is_contiguous());
        assert_eq!(layout.iter().collect::<Vec<_>>(), vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_broadcast_axis_has_zero_stride() {
        let data = Dimensions::single(Dim::X, 3).unwrap();
        let layout = ViewLayout::new(0, yx(2, 3), &data).unwrap();
        assert!(layout.has_broadcast());
        assert_eq!(layout.strides(), &[0, 1]);
        assert_eq!(layout.iter().collect::<Vec<_>>(), vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_broadcast_to() {
        let layout = ViewLayout::contiguous(Dimensions::single(Dim::X, 2).unwrap());
        let b = layout.broadcast_to(&yx(3, 2)).unwrap();
        assert_eq!(b.iter().collect::<Vec<_>>(), vec![0, 1, 0, 1, 0, 1]);
        assert!(matches!(
            layout.broadcast_to(&yx(3, 4)),
            Err(DimensionError::ExtentMismatch { dim: Dim::X, .. })
        ));
        assert!(matches!(
            ViewLayout::contiguous(yx(3, 2)).broadcast_to(&Dimensions::single(Dim::X, 2).unwrap()),
            Err(DimensionError::Broadcast { .. })
        ));
    }

    #[test]
    fn test_slices() {
        let layout = ViewLayout::contiguous(yx(3, 4));
        let row = layout.slice(Slice::point(Dim::Y, 1)).unwrap();
        assert_eq!(row.iter().collect::<Vec<_>>(), vec![4, 5, 6, 7]);
        let col = layout.slice(Slice::point(Dim::X, 2)).unwrap();
        assert_eq!(col.iter().collect::<Vec<_>>(), vec![2, 6, 10]);
        let block = layout
            .slice(Slice::range(Dim::X, 1, 3))
            .unwrap()
            .slice(Slice::range(Dim::Y, 1, 3))
            .unwrap();
        assert_eq!(block.iter().collect::<Vec<_>>(), vec![5, 6, 9, 10]);
        assert!(!block.is_contiguous());
        assert_eq!(block.span(), 11);
        assert!(matches!(
            layout.slice(Slice::range(Dim::X, 2, 5)),
            Err(DimensionError::SliceOutOfRange { .. })
        ));
        assert!(layout.slice(Slice::point(Dim::Y, 3)).is_err());
    }

    #[test]
    fn test_positional_offset_matches_iteration() {
        let layout = ViewLayout::contiguous(
            Dimensions::new(&[(Dim::Z, 2), (Dim::Y, 3), (Dim::X, 4)]).unwrap(),
        )
        .transpose(&[Dim::X, Dim::Z, Dim::Y])
        .unwrap()
        .slice(Slice::range(Dim::Y, 1, 3))
        .unwrap();
        let offsets: Vec<_> = layout.iter().collect();
        for (i, &off) in offsets.iter().enumerate() {
            assert_eq!(layout.offset_of(i), off);
        }
    }

    #[test]
    fn test_set_index() {
        let layout = ViewLayout::contiguous(yx(3, 4))
            .transpose(&[Dim::X, Dim::Y])
            .unwrap();
        let all: Vec<_> = layout.iter().collect();
        let mut it = layout.iter();
        it.set_index(5);
        assert_eq!(it.collect::<Vec<_>>(), all[5..].to_vec());
    }

    #[test]
    fn test_empty_and_scalar() {
        let empty = ViewLayout::contiguous(yx(0, 3));
        assert_eq!(empty.iter().count(), 0);
        assert_eq!(empty.span(), 0);
        let scalar = ViewLayout::contiguous(Dimensions::scalar());
        assert_eq!(scalar.iter().collect::<Vec<_>>(), vec![0]);
    }
}
