//! Type-erased storage: one enum variant per element type.
//!
//! Operations that need the concrete element type go through [`visit!`],
//! [`visit_map!`] or [`visit_pair!`], which expand to an exhaustive match.
//! Combinations without an arm end in [`Error::Type`].

use scivar_traits::{BinRange, DType, Element, EventList, Vector3d};
use scivar_view::{Dim, Dimensions, Slice, Storage};

use crate::{Error, Result};

/// Storage of one of the supported element types.
///
/// `Clone` is shallow, like [`Storage`].
#[derive(Debug, Clone)]
pub enum VariableConcept {
    F64(Storage<f64>),
    F32(Storage<f32>),
    I64(Storage<i64>),
    I32(Storage<i32>),
    Bool(Storage<bool>),
    Vector3d(Storage<Vector3d>),
    SparseF64(Storage<EventList>),
    BinRange(Storage<BinRange>),
}

/// Run `$body` with `$s` bound to the typed storage, whatever its type.
macro_rules! visit {
    ($concept:expr, $s:ident => $body:expr) => {
        match $concept {
            $crate::concept::VariableConcept::F64($s) => $body,
            $crate::concept::VariableConcept::F32($s) => $body,
            $crate::concept::VariableConcept::I64($s) => $body,
            $crate::concept::VariableConcept::I32($s) => $body,
            $crate::concept::VariableConcept::Bool($s) => $body,
            $crate::concept::VariableConcept::Vector3d($s) => $body,
            $crate::concept::VariableConcept::SparseF64($s) => $body,
            $crate::concept::VariableConcept::BinRange($s) => $body,
        }
    };
}

/// Like [`visit!`], re-wrapping the resulting storage in the same variant.
macro_rules! visit_map {
    ($concept:expr, $s:ident => $body:expr) => {
        match $concept {
            $crate::concept::VariableConcept::F64($s) => $crate::concept::VariableConcept::F64($body),
            $crate::concept::VariableConcept::F32($s) => $crate::concept::VariableConcept::F32($body),
            $crate::concept::VariableConcept::I64($s) => $crate::concept::VariableConcept::I64($body),
            $crate::concept::VariableConcept::I32($s) => $crate::concept::VariableConcept::I32($body),
            $crate::concept::VariableConcept::Bool($s) => $crate::concept::VariableConcept::Bool($body),
            $crate::concept::VariableConcept::Vector3d($s) => {
                $crate::concept::VariableConcept::Vector3d($body)
            }
            $crate::concept::VariableConcept::SparseF64($s) => {
                $crate::concept::VariableConcept::SparseF64($body)
            }
            $crate::concept::VariableConcept::BinRange($s) => {
                $crate::concept::VariableConcept::BinRange($body)
            }
        }
    };
}

/// Run `$body` when both operands hold the same element type, else `$other`.
macro_rules! visit_pair {
    ($a:expr, $b:expr, ($x:ident, $y:ident) => $body:expr, _ => $other:expr) => {
        match ($a, $b) {
            ($crate::concept::VariableConcept::F64($x), $crate::concept::VariableConcept::F64($y)) => $body,
            ($crate::concept::VariableConcept::F32($x), $crate::concept::VariableConcept::F32($y)) => $body,
            ($crate::concept::VariableConcept::I64($x), $crate::concept::VariableConcept::I64($y)) => $body,
            ($crate::concept::VariableConcept::I32($x), $crate::concept::VariableConcept::I32($y)) => $body,
            ($crate::concept::VariableConcept::Bool($x), $crate::concept::VariableConcept::Bool($y)) => $body,
            (
                $crate::concept::VariableConcept::Vector3d($x),
                $crate::concept::VariableConcept::Vector3d($y),
            ) => $body,
            (
                $crate::concept::VariableConcept::SparseF64($x),
                $crate::concept::VariableConcept::SparseF64($y),
            ) => $body,
            (
                $crate::concept::VariableConcept::BinRange($x),
                $crate::concept::VariableConcept::BinRange($y),
            ) => $body,
            #[allow(unreachable_patterns)]
            _ => $other,
        }
    };
}

pub(crate) use {visit, visit_map, visit_pair};

/// Element types that can be wrapped in a [`VariableConcept`].
pub trait VariableElement: Element {
    fn wrap(storage: Storage<Self>) -> VariableConcept;
    fn storage(concept: &VariableConcept) -> Option<&Storage<Self>>;
    fn storage_mut(concept: &mut VariableConcept) -> Option<&mut Storage<Self>>;
}

macro_rules! impl_variable_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl VariableElement for $t {
            fn wrap(storage: Storage<Self>) -> VariableConcept {
                VariableConcept::$variant(storage)
            }
            fn storage(concept: &VariableConcept) -> Option<&Storage<Self>> {
                match concept {
                    VariableConcept::$variant(s) => Some(s),
                    _ => None,
                }
            }
            fn storage_mut(concept: &mut VariableConcept) -> Option<&mut Storage<Self>> {
                match concept {
                    VariableConcept::$variant(s) => Some(s),
                    _ => None,
                }
            }
        })*
    };
}

impl_variable_element!(
    f64 => F64,
    f32 => F32,
    i64 => I64,
    i32 => I32,
    bool => Bool,
    Vector3d => Vector3d,
    EventList => SparseF64,
    BinRange => BinRange,
);

fn type_mismatch(op: &str, a: DType, b: DType) -> Error {
    Error::Type(format!("{op}: element types {a} and {b} differ"))
}

impl VariableConcept {
    pub fn dtype(&self) -> DType {
        visit!(self, s => s.dtype())
    }

    pub fn dims(&self) -> Dimensions {
        visit!(self, s => s.dims())
    }

    pub fn is_view(&self) -> bool {
        visit!(self, s => s.is_view())
    }

    pub fn is_contiguous(&self) -> bool {
        visit!(self, s => s.is_contiguous())
    }

    /// Whether several elements alias the same buffer slot.
    pub fn has_broadcast(&self) -> bool {
        visit!(self, s => s.layout().has_broadcast())
    }

    /// Default-initialized storage of the same element type.
    pub fn zeros(dtype: DType, dims: Dimensions) -> Self {
        match dtype {
            DType::F64 => VariableConcept::F64(Storage::zeros(dims)),
            DType::F32 => VariableConcept::F32(Storage::zeros(dims)),
            DType::I64 => VariableConcept::I64(Storage::zeros(dims)),
            DType::I32 => VariableConcept::I32(Storage::zeros(dims)),
            DType::Bool => VariableConcept::Bool(Storage::zeros(dims)),
            DType::Vector3d => VariableConcept::Vector3d(Storage::zeros(dims)),
            DType::SparseF64 => VariableConcept::SparseF64(Storage::zeros(dims)),
            DType::BinRange => VariableConcept::BinRange(Storage::zeros(dims)),
        }
    }

    pub fn deep_clone(&self) -> Self {
        visit_map!(self, s => s.deep_clone())
    }

    /// Fresh default-initialized storage of a new shape.
    pub fn clone_with_dims(&self, dims: Dimensions) -> Self {
        visit_map!(self, s => s.clone_with_dims(dims))
    }

    pub fn make_view(&self) -> Self {
        visit_map!(self, s => s.make_view())
    }

    pub fn slice(&self, slice: Slice) -> Result<Self> {
        Ok(visit_map!(self, s => s.slice(slice)?))
    }

    pub fn broadcast(&self, dims: &Dimensions) -> Result<Self> {
        Ok(visit_map!(self, s => s.broadcast(dims)?))
    }

    pub fn transpose(&self, order: &[Dim]) -> Result<Self> {
        Ok(visit_map!(self, s => s.transpose(order)?))
    }

    pub fn reshape(&self, dims: Dimensions) -> Result<Self> {
        Ok(visit_map!(self, s => s.reshape(dims)?))
    }

    /// Whether both refer to the same underlying buffer.
    pub fn shares_buffer(&self, other: &VariableConcept) -> bool {
        visit_pair!(self, other, (a, b) => a.shares_buffer(b), _ => false)
    }

    /// Deep comparison; different element types compare unequal.
    pub fn equals(&self, other: &VariableConcept) -> bool {
        visit_pair!(self, other, (a, b) => a.equals(b), _ => false)
    }

    /// Overwrite with `other` broadcast to `self.dims()`.
    pub fn assign(&mut self, other: &VariableConcept) -> Result<()> {
        let (da, db) = (self.dtype(), other.dtype());
        visit_pair!(self, other, (a, b) => Ok(a.assign(b)?), _ => Err(type_mismatch("assign", da, db)))
    }

    pub fn copy_range(
        &mut self,
        other: &VariableConcept,
        dim: Dim,
        dst_offset: usize,
        src_begin: usize,
        src_end: usize,
    ) -> Result<()> {
        let (da, db) = (self.dtype(), other.dtype());
        visit_pair!(
            self,
            other,
            (a, b) => Ok(a.copy_range(b, dim, dst_offset, src_begin, src_end)?),
            _ => Err(type_mismatch("copy_range", da, db))
        )
    }

    pub fn typed<T: VariableElement>(&self) -> Result<&Storage<T>> {
        T::storage(self).ok_or_else(|| {
            Error::Type(format!("expected {}, found {}", T::DTYPE, self.dtype()))
        })
    }

    pub fn typed_mut<T: VariableElement>(&mut self) -> Result<&mut Storage<T>> {
        let found = self.dtype();
        T::storage_mut(self)
            .ok_or_else(|| Error::Type(format!("expected {}, found {found}", T::DTYPE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x(n: usize) -> Dimensions {
        Dimensions::single(Dim::X, n).unwrap()
    }

    #[test]
    fn test_dispatch_by_variant() {
        let c = f64::wrap(Storage::from_vec(x(3), vec![1.0, 2.0, 3.0]).unwrap());
        assert_eq!(c.dtype(), DType::F64);
        assert_eq!(c.dims(), x(3));
        let s = c.slice(Slice::range(Dim::X, 1, 3)).unwrap();
        assert!(s.is_view());
        assert_eq!(s.typed::<f64>().unwrap().to_vec(), vec![2.0, 3.0]);
        assert!(matches!(s.typed::<i32>(), Err(Error::Type(_))));
    }

    #[test]
    fn test_cross_type_equality_is_false() {
        let a = f64::wrap(Storage::from_vec(x(1), vec![1.0]).unwrap());
        let b = f32::wrap(Storage::from_vec(x(1), vec![1.0]).unwrap());
        assert!(!a.equals(&b));
        assert!(a.equals(&a.deep_clone()));
    }

    #[test]
    fn test_copy_range_type_mismatch() {
        let mut a = VariableConcept::zeros(DType::F64, x(2));
        let b = i64::wrap(Storage::from_vec(x(2), vec![1, 2]).unwrap());
        assert!(matches!(
            a.copy_range(&b, Dim::X, 0, 0, 2),
            Err(Error::Type(_))
        ));
    }
}
