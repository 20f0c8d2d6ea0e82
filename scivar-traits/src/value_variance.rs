//! A value paired with its variance, with first-order uncertainty
//! propagation built into the arithmetic operators.
//!
//! Operands are treated as uncorrelated. Using the same source twice in one
//! expression (`x * x`) therefore over-estimates rather than cancels the
//! variance; there is no correlation tracking.

use std::ops::{Add, Div, Mul, Neg, Sub};

use num_traits::Float;

/// A value and its variance (squared standard deviation).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValueAndVariance<T> {
    pub value: T,
    pub variance: T,
}

impl<T: Float> ValueAndVariance<T> {
    pub fn new(value: T, variance: T) -> Self {
        Self { value, variance }
    }

    /// A value without uncertainty.
    pub fn exact(value: T) -> Self {
        Self {
            value,
            variance: T::zero(),
        }
    }

    /// `sqrt(x)` with `var = 0.25 * var_x / x`.
    pub fn sqrt(self) -> Self {
        Self {
            value: self.value.sqrt(),
            variance: T::from(0.25).unwrap_or_else(T::zero) * (self.variance / self.value),
        }
    }

    /// `|x|`; the variance is unchanged.
    pub fn abs(self) -> Self {
        Self {
            value: self.value.abs(),
            variance: self.variance,
        }
    }

    /// Standard deviation.
    pub fn stddev(&self) -> T {
        self.variance.sqrt()
    }
}

impl<T: Float> Add for ValueAndVariance<T> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
            variance: self.variance + rhs.variance,
        }
    }
}

impl<T: Float> Sub for ValueAndVariance<T> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
            variance: self.variance + rhs.variance,
        }
    }
}

impl<T: Float> Mul for ValueAndVariance<T> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self {
            value: self.value * rhs.value,
            variance: self.variance * rhs.value * rhs.value
                + rhs.variance * self.value * self.value,
        }
    }
}

impl<T: Float> Div for ValueAndVariance<T> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        // Absolute form; a zero numerator contributes no relative term.
        let ratio = self.value / rhs.value;
        Self {
            value: ratio,
            variance: (self.variance + rhs.variance * ratio * ratio) / (rhs.value * rhs.value),
        }
    }
}

impl<T: Float> Neg for ValueAndVariance<T> {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            value: -self.value,
            variance: self.variance,
        }
    }
}
