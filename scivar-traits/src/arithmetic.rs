//! Scalar bounds for elementwise operations.
//!
//! Elementwise operations are written once against [`Arithmetic`] (or
//! [`FloatArithmetic`]) and run unchanged on plain numbers and on
//! [`ValueAndVariance`], which is how uncertainty propagation gets layered on
//! top of an operation without the operation knowing about it.

use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_traits::Float;

use crate::value_variance::ValueAndVariance;

/// Numbers (and value/variance pairs) supporting the four basic operations.
pub trait Arithmetic:
    Copy
    + Send
    + Sync
    + PartialEq
    + Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    fn zero() -> Self;
    fn one() -> Self;
    fn abs(self) -> Self;

    /// `self + other`. Integers wrap on overflow.
    #[inline(always)]
    fn add_op(self, other: Self) -> Self {
        self + other
    }
    /// `self - other`. Integers wrap on overflow.
    #[inline(always)]
    fn sub_op(self, other: Self) -> Self {
        self - other
    }
    /// `self * other`. Integers wrap on overflow.
    #[inline(always)]
    fn mul_op(self, other: Self) -> Self {
        self * other
    }
    /// `-self`. Integers wrap on overflow.
    #[inline(always)]
    fn neg_op(self) -> Self {
        -self
    }
}

/// [`Arithmetic`] types that also have a square root.
pub trait FloatArithmetic: Arithmetic {
    fn sqrt(self) -> Self;
}

macro_rules! impl_arithmetic_int {
    ($($t:ty),*) => {
        $(impl Arithmetic for $t {
            #[inline(always)]
            fn zero() -> Self {
                0
            }
            #[inline(always)]
            fn one() -> Self {
                1
            }
            #[inline(always)]
            fn abs(self) -> Self {
                self.wrapping_abs()
            }
            #[inline(always)]
            fn add_op(self, other: Self) -> Self {
                self.wrapping_add(other)
            }
            #[inline(always)]
            fn sub_op(self, other: Self) -> Self {
                self.wrapping_sub(other)
            }
            #[inline(always)]
            fn mul_op(self, other: Self) -> Self {
                self.wrapping_mul(other)
            }
            #[inline(always)]
            fn neg_op(self) -> Self {
                self.wrapping_neg()
            }
        })*
    };
}

macro_rules! impl_arithmetic_float {
    ($($t:ty),*) => {
        $(impl Arithmetic for $t {
            #[inline(always)]
            fn zero() -> Self {
                0.0
            }
            #[inline(always)]
            fn one() -> Self {
                1.0
            }
            #[inline(always)]
            fn abs(self) -> Self {
                <$t>::abs(self)
            }
        }

        impl FloatArithmetic for $t {
            #[inline(always)]
            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }
        })*
    };
}

impl_arithmetic_int!(i64, i32);
impl_arithmetic_float!(f64, f32);

impl<T: Float + Send + Sync + Debug + 'static> Arithmetic for ValueAndVariance<T> {
    fn zero() -> Self {
        ValueAndVariance::exact(T::zero())
    }
    fn one() -> Self {
        ValueAndVariance::exact(T::one())
    }
    fn abs(self) -> Self {
        ValueAndVariance::abs(self)
    }
}

impl<T: Float + Send + Sync + Debug + 'static> FloatArithmetic for ValueAndVariance<T> {
    fn sqrt(self) -> Self {
        ValueAndVariance::sqrt(self)
    }
}
