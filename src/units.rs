//! A small algebraic unit: integer exponents over a fixed set of base units.

use std::fmt;
use std::ops::{Div, Mul};

use crate::{Error, Result};

const NBASE: usize = 8;
const NAMES: [&str; NBASE] = ["counts", "m", "s", "kg", "K", "us", "Å", "meV"];

const COUNTS: usize = 0;

/// Product of base units raised to integer powers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Unit {
    exponents: [i8; NBASE],
}

impl Unit {
    const fn base(i: usize) -> Self {
        let mut exponents = [0; NBASE];
        exponents[i] = 1;
        Self { exponents }
    }

    pub const fn dimensionless() -> Self {
        Self {
            exponents: [0; NBASE],
        }
    }

    pub const fn counts() -> Self {
        Self::base(COUNTS)
    }

    pub const fn m() -> Self {
        Self::base(1)
    }

    pub const fn s() -> Self {
        Self::base(2)
    }

    pub const fn kg() -> Self {
        Self::base(3)
    }

    pub const fn kelvin() -> Self {
        Self::base(4)
    }

    pub const fn us() -> Self {
        Self::base(5)
    }

    pub const fn angstrom() -> Self {
        Self::base(6)
    }

    pub const fn mev() -> Self {
        Self::base(7)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.exponents == [0; NBASE]
    }

    pub fn is_counts(&self) -> bool {
        *self == Self::counts()
    }

    /// Counts per some non-trivial unit, e.g. counts/us.
    pub fn is_count_density(&self) -> bool {
        self.exponents[COUNTS] == 1
            && self.exponents[1..].iter().any(|&e| e != 0)
    }

    pub fn powi(self, n: i8) -> Self {
        let mut out = self;
        for e in out.exponents.iter_mut() {
            *e *= n;
        }
        out
    }

    /// Square root; every exponent must be even.
    pub fn sqrt(self) -> Result<Self> {
        if self.exponents.iter().any(|e| e % 2 != 0) {
            return Err(Error::Unit(format!("sqrt of {self} is not representable")));
        }
        let mut out = self;
        for e in out.exponents.iter_mut() {
            *e /= 2;
        }
        Ok(out)
    }
}

impl Mul for Unit {
    type Output = Unit;
    fn mul(self, rhs: Unit) -> Unit {
        let mut out = self;
        for (a, b) in out.exponents.iter_mut().zip(rhs.exponents) {
            *a += b;
        }
        out
    }
}

impl Div for Unit {
    type Output = Unit;
    fn div(self, rhs: Unit) -> Unit {
        let mut out = self;
        for (a, b) in out.exponents.iter_mut().zip(rhs.exponents) {
            *a -= b;
        }
        out
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return f.write_str("dimensionless");
        }
        let mut first = true;
        for (name, &e) in NAMES.iter().zip(self.exponents.iter()) {
            if e == 0 {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            if e == 1 {
                f.write_str(name)?;
            } else {
                write!(f, "{name}^{e}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algebra() {
        let density = Unit::counts() / Unit::us();
        assert!(density.is_count_density());
        assert!(!density.is_counts());
        assert!((density * Unit::us()).is_counts());
        assert!((Unit::m() / Unit::m()).is_dimensionless());
        assert!(!Unit::dimensionless().is_count_density());
    }

    #[test]
    fn test_sqrt() {
        let area = Unit::m() * Unit::m();
        assert_eq!(area.sqrt().unwrap(), Unit::m());
        assert!(matches!(Unit::m().sqrt(), Err(Error::Unit(_))));
        assert_eq!(Unit::counts().powi(2).sqrt().unwrap(), Unit::counts());
    }

    #[test]
    fn test_display() {
        assert_eq!(Unit::dimensionless().to_string(), "dimensionless");
        assert_eq!((Unit::counts() / Unit::us()).to_string(), "counts us^-1");
        assert_eq!((Unit::m() * Unit::m()).to_string(), "m^2");
    }
}
