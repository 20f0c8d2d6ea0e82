//! Arithmetic on variables: out-of-place operators and their in-place forms.

use crate::transform::{
    transform, transform_in_place, transform_unary, transform_unary_in_place, Abs, Divide, Minus,
    Negative, Plus, Sqrt, Times,
};
use crate::variable::Variable;
use crate::Result;

/// `a + b`; units must agree.
pub fn plus(a: &Variable, b: &Variable) -> Result<Variable> {
    transform::<Plus>(a, b)
}

/// `a - b`; units must agree.
pub fn minus(a: &Variable, b: &Variable) -> Result<Variable> {
    transform::<Minus>(a, b)
}

pub fn times(a: &Variable, b: &Variable) -> Result<Variable> {
    transform::<Times>(a, b)
}

pub fn divide(a: &Variable, b: &Variable) -> Result<Variable> {
    transform::<Divide>(a, b)
}

pub fn plus_equals(a: &mut Variable, b: &Variable) -> Result<()> {
    transform_in_place::<Plus>(a, b)
}

pub fn minus_equals(a: &mut Variable, b: &Variable) -> Result<()> {
    transform_in_place::<Minus>(a, b)
}

pub fn times_equals(a: &mut Variable, b: &Variable) -> Result<()> {
    transform_in_place::<Times>(a, b)
}

pub fn divide_equals(a: &mut Variable, b: &Variable) -> Result<()> {
    transform_in_place::<Divide>(a, b)
}

pub fn negative(var: &Variable) -> Result<Variable> {
    transform_unary::<Negative>(var)
}

/// Square root; variances follow `0.25 * var / x`.
pub fn sqrt(var: &Variable) -> Result<Variable> {
    transform_unary::<Sqrt>(var)
}

pub fn abs(var: &Variable) -> Result<Variable> {
    transform_unary::<Abs>(var)
}

pub fn sqrt_in_place(var: &mut Variable) -> Result<()> {
    transform_unary_in_place::<Sqrt>(var)
}

pub fn abs_in_place(var: &mut Variable) -> Result<()> {
    transform_unary_in_place::<Abs>(var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Unit};
    use approx::assert_relative_eq;
    use scivar_view::{Dim, Dimensions};

    fn x(n: usize) -> Dimensions {
        Dimensions::single(Dim::X, n).unwrap()
    }

    #[test]
    fn test_divide_by_self_is_dimensionless_one() {
        let a = Variable::new(x(3), Unit::counts(), vec![2.0, 3.0, 5.0]).unwrap();
        let r = divide(&a, &a).unwrap();
        assert!(r.unit().is_dimensionless());
        assert_eq!(r.values::<f64>().unwrap(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_variance_propagation() {
        let a = Variable::with_variances(x(1), Unit::m(), vec![2.0], vec![0.5]).unwrap();
        let b = Variable::with_variances(x(1), Unit::s(), vec![4.0], vec![0.25]).unwrap();
        let p = times(&a, &b).unwrap();
        assert_eq!(p.values::<f64>().unwrap(), vec![8.0]);
        // 0.5 * 16 + 0.25 * 4
        assert_eq!(p.variances::<f64>().unwrap(), vec![9.0]);
        let q = divide(&a, &b).unwrap();
        assert_eq!(q.values::<f64>().unwrap(), vec![0.5]);
        // (0.5 + 0.25 * 0.25) / 16
        assert_relative_eq!(q.variances::<f64>().unwrap()[0], 0.03515625);
        let d = minus(&a, &a).unwrap();
        assert_eq!(d.values::<f64>().unwrap(), vec![0.0]);
        assert_eq!(d.variances::<f64>().unwrap(), vec![1.0]);
    }

    #[test]
    fn test_in_place_forms() {
        let mut a = Variable::new(x(2), Unit::m(), vec![1.0, 2.0]).unwrap();
        plus_equals(&mut a, &Variable::scalar(1.0, Unit::m())).unwrap();
        times_equals(&mut a, &Variable::scalar(2.0, Unit::s())).unwrap();
        divide_equals(&mut a, &Variable::scalar(4.0, Unit::dimensionless())).unwrap();
        minus_equals(&mut a, &Variable::scalar(0.5, Unit::m() * Unit::s())).unwrap();
        assert_eq!(a.values::<f64>().unwrap(), vec![0.5, 1.0]);
        assert_eq!(a.unit(), Unit::m() * Unit::s());
        assert!(matches!(
            plus_equals(&mut a, &Variable::scalar(1.0, Unit::m())),
            Err(Error::Unit(_))
        ));
    }

    #[test]
    fn test_unary() {
        let a = Variable::new(x(2), Unit::m() * Unit::m(), vec![-4.0, 9.0]).unwrap();
        let n = negative(&a).unwrap();
        assert_eq!(n.values::<f64>().unwrap(), vec![4.0, -9.0]);
        let m = abs(&a).unwrap();
        let mut s = sqrt(&m).unwrap();
        assert!(matches!(s.unit().sqrt(), Err(Error::Unit(_))));
        assert!(matches!(sqrt_in_place(&mut s), Err(Error::Unit(_))));
        assert_eq!(s.values::<f64>().unwrap(), vec![2.0, 3.0]);
    }
}
