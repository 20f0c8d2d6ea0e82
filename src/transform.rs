//! Elementwise transforms over type-erased variables.
//!
//! An operation is a zero-sized type implementing [`BinaryOp`] or
//! [`UnaryOp`]. Its arithmetic is written once against
//! [`Arithmetic`]/[`FloatArithmetic`] and therefore runs unchanged on plain
//! values and on [`ValueAndVariance`], which is where uncertainty propagation
//! comes from.
//!
//! Dispatch happens in two steps. First, every precondition (unit, variance
//! presence, broadcast, element-type combination, event-list lengths) is
//! checked without touching the output. Then one arm of an exhaustive match
//! on the element types runs the typed kernel from `scivar-kernel`, which
//! picks the flat or the strided path.

use num_traits::{AsPrimitive, Float};
use scivar_kernel::{map2_in_place, map_in_place, zip2_in_place, zip3_in_place, zip4_in_place};
use scivar_kernel::MaybeSync;
use scivar_traits::{Arithmetic, DType, Element, EventList, FloatArithmetic, ValueAndVariance, Vector3d};
use scivar_view::{Dimensions, Storage};
use tracing::debug;

use crate::bins;
use crate::concept::VariableConcept as C;
use crate::units::Unit;
use crate::variable::Variable;
use crate::{Error, Result};

/// A binary elementwise operation `a op= b`.
pub trait BinaryOp {
    const NAME: &'static str;
    /// Whether integer operands are accepted.
    const INTEGERS: bool = true;
    /// Whether `a op b == b op a`, including the unit.
    const COMMUTATIVE: bool = false;

    fn apply<T: Arithmetic>(a: T, b: T) -> T;

    /// `Vector3d op Vector3d`, if defined.
    fn apply_vector(_a: Vector3d, _b: Vector3d) -> Option<Vector3d> {
        None
    }

    /// `Vector3d op f64`, if defined.
    fn scale_vector(_a: Vector3d, _b: f64) -> Option<Vector3d> {
        None
    }

    fn unit(a: Unit, b: Unit) -> Result<Unit>;
}

/// A unary elementwise operation `x = op(x)`.
pub trait UnaryOp {
    const NAME: &'static str;

    fn apply<T: FloatArithmetic>(x: T) -> T;

    /// Integer form, if defined.
    fn apply_integer<T: Arithmetic>(_x: T) -> Option<T> {
        None
    }

    fn apply_vector(_x: Vector3d) -> Option<Vector3d> {
        None
    }

    fn unit(u: Unit) -> Result<Unit>;
}

fn same_unit(name: &str, a: Unit, b: Unit) -> Result<Unit> {
    if a != b {
        return Err(Error::Unit(format!("{name}: {a} and {b} are incompatible")));
    }
    Ok(a)
}

pub struct Plus;
pub struct Minus;
pub struct Times;
pub struct Divide;

impl BinaryOp for Plus {
    const NAME: &'static str = "plus";
    const COMMUTATIVE: bool = true;

    fn apply<T: Arithmetic>(a: T, b: T) -> T {
        a.add_op(b)
    }
    fn apply_vector(a: Vector3d, b: Vector3d) -> Option<Vector3d> {
        Some(a + b)
    }
    fn unit(a: Unit, b: Unit) -> Result<Unit> {
        same_unit(Self::NAME, a, b)
    }
}

impl BinaryOp for Minus {
    const NAME: &'static str = "minus";

    fn apply<T: Arithmetic>(a: T, b: T) -> T {
        a.sub_op(b)
    }
    fn apply_vector(a: Vector3d, b: Vector3d) -> Option<Vector3d> {
        Some(a - b)
    }
    fn unit(a: Unit, b: Unit) -> Result<Unit> {
        same_unit(Self::NAME, a, b)
    }
}

impl BinaryOp for Times {
    const NAME: &'static str = "times";
    const COMMUTATIVE: bool = true;

    fn apply<T: Arithmetic>(a: T, b: T) -> T {
        a.mul_op(b)
    }
    fn scale_vector(a: Vector3d, b: f64) -> Option<Vector3d> {
        Some(a * b)
    }
    fn unit(a: Unit, b: Unit) -> Result<Unit> {
        Ok(a * b)
    }
}

impl BinaryOp for Divide {
    const NAME: &'static str = "divide";
    const INTEGERS: bool = false;

    fn apply<T: Arithmetic>(a: T, b: T) -> T {
        a / b
    }
    fn scale_vector(a: Vector3d, b: f64) -> Option<Vector3d> {
        Some(a / b)
    }
    fn unit(a: Unit, b: Unit) -> Result<Unit> {
        Ok(a / b)
    }
}

pub struct Negative;
pub struct Abs;
pub struct Sqrt;

impl UnaryOp for Negative {
    const NAME: &'static str = "negative";

    fn apply<T: FloatArithmetic>(x: T) -> T {
        -x
    }
    fn apply_integer<T: Arithmetic>(x: T) -> Option<T> {
        Some(x.neg_op())
    }
    fn apply_vector(x: Vector3d) -> Option<Vector3d> {
        Some(-x)
    }
    fn unit(u: Unit) -> Result<Unit> {
        Ok(u)
    }
}

impl UnaryOp for Abs {
    const NAME: &'static str = "abs";

    fn apply<T: FloatArithmetic>(x: T) -> T {
        x.abs()
    }
    fn apply_integer<T: Arithmetic>(x: T) -> Option<T> {
        Some(x.abs())
    }
    fn unit(u: Unit) -> Result<Unit> {
        Ok(u)
    }
}

impl UnaryOp for Sqrt {
    const NAME: &'static str = "sqrt";

    fn apply<T: FloatArithmetic>(x: T) -> T {
        x.sqrt()
    }
    fn unit(u: Unit) -> Result<Unit> {
        u.sqrt()
    }
}

fn unsupported(name: &str, a: DType, b: DType) -> Error {
    Error::Type(format!("{name} is not supported for {a} and {b}"))
}

fn unsupported_unary(name: &str, a: DType) -> Error {
    Error::Type(format!("{name} is not supported for {a}"))
}

fn check_view_unit(out: &Variable, unit: Unit) -> Result<()> {
    if out.is_view() && unit != out.unit() {
        return Err(Error::Unit(format!(
            "cannot change the unit of a view from {} to {unit}",
            out.unit()
        )));
    }
    Ok(())
}

/// `out op= rhs`, with `rhs` broadcast to the dimensions of `out`.
///
/// Nothing is written unless every check passes.
pub fn transform_in_place<Op: BinaryOp>(out: &mut Variable, rhs: &Variable) -> Result<()> {
    if out.is_binned() || rhs.is_binned() {
        return bins::transform_in_place::<Op>(out, rhs);
    }
    let unit = Op::unit(out.unit(), rhs.unit())?;
    check_view_unit(out, unit)?;
    apply_binary::<Op>(out, rhs)?;
    out.set_unit_unchecked(unit);
    Ok(())
}

/// `a op b` into a fresh variable spanning the union of both dimensions.
pub fn transform<Op: BinaryOp>(a: &Variable, b: &Variable) -> Result<Variable> {
    if b.is_binned() && !a.is_binned() {
        if Op::COMMUTATIVE {
            return transform::<Op>(b, a);
        }
        return Err(Error::BinnedData(format!(
            "{}: dense left-hand side with binned right-hand side",
            Op::NAME
        )));
    }
    let mut out = if a.is_binned() {
        a.copy()?
    } else {
        let dims = Dimensions::merge(&a.dims(), &b.dims())?;
        a.broadcast(&dims)?.copy()?
    };
    if b.has_variances() {
        out.ensure_variances()?;
    }
    transform_in_place::<Op>(&mut out, b)?;
    Ok(out)
}

/// `var = op(var)`.
pub fn transform_unary_in_place<Op: UnaryOp>(var: &mut Variable) -> Result<()> {
    if var.is_binned() {
        return bins::transform_unary_in_place::<Op>(var);
    }
    let unit = Op::unit(var.unit())?;
    check_view_unit(var, unit)?;
    apply_unary::<Op>(var)?;
    var.set_unit_unchecked(unit);
    Ok(())
}

pub fn transform_unary<Op: UnaryOp>(var: &Variable) -> Result<Variable> {
    let mut out = var.copy()?;
    transform_unary_in_place::<Op>(&mut out)?;
    Ok(out)
}

/// Values and variances of `out op= rhs`, units untouched.
pub(crate) fn apply_binary<Op: BinaryOp>(out: &mut Variable, rhs: &Variable) -> Result<()> {
    if rhs.has_variances() && !out.has_variances() {
        return Err(Error::Variances(format!(
            "{}: right-hand side has variances but left-hand side does not",
            Op::NAME
        )));
    }
    let dims = out.dims();
    let mut rhs_values = rhs.values_concept().broadcast(&dims)?;
    let mut rhs_variances = rhs
        .variances_concept()
        .map(|v| v.broadcast(&dims))
        .transpose()?;

    let aliased = {
        let targets: Vec<&C> = std::iter::once(out.values_concept())
            .chain(out.variances_concept())
            .collect();
        std::iter::once(&rhs_values)
            .chain(rhs_variances.as_ref())
            .any(|r| targets.iter().any(|t| t.shares_buffer(r)))
    };
    if aliased {
        debug!(op = Op::NAME, "right-hand side aliases the output, copying it first");
        rhs_values = rhs_values.deep_clone();
        rhs_variances = rhs_variances.map(|v| v.deep_clone());
    }

    check_binary::<Op>(out.values_concept(), &rhs_values)?;
    let (values, variances) = out.concepts_mut();
    match variances {
        None => binary_values::<Op>(values, &rhs_values),
        Some(variances) => {
            binary_with_variances::<Op>(values, variances, &rhs_values, rhs_variances.as_ref())
        }
    }
}

fn check_binary<Op: BinaryOp>(out: &C, rhs: &C) -> Result<()> {
    let probe = Vector3d::default();
    let supported = match (out.dtype(), rhs.dtype()) {
        (DType::F64 | DType::F32, DType::F64 | DType::F32) => true,
        (DType::I64 | DType::I32, DType::I64 | DType::I32) => Op::INTEGERS,
        (DType::Vector3d, DType::Vector3d) => Op::apply_vector(probe, probe).is_some(),
        (DType::Vector3d, DType::F64) => Op::scale_vector(probe, 1.0).is_some(),
        (DType::SparseF64, DType::SparseF64) => {
            check_event_lengths::<Op>(out.typed::<EventList>()?, rhs.typed::<EventList>()?)?;
            true
        }
        (DType::SparseF64, DType::F64) => true,
        _ => false,
    };
    if !supported {
        return Err(unsupported(Op::NAME, out.dtype(), rhs.dtype()));
    }
    Ok(())
}

fn check_event_lengths<Op: BinaryOp>(a: &Storage<EventList>, b: &Storage<EventList>) -> Result<()> {
    let (ga, gb) = (a.read(), b.read());
    let (va, vb) = (ga.view()?, gb.view()?);
    if va.iter().zip(vb.iter()).any(|(x, y)| x.len() != y.len()) {
        return Err(Error::Size(format!(
            "{}: event lists of the two operands differ in length",
            Op::NAME
        )));
    }
    Ok(())
}

fn zip<A: Element, B: Element>(
    a: &mut Storage<A>,
    b: &Storage<B>,
    f: impl Fn(&mut A, &B) + MaybeSync,
) -> Result<()> {
    let src = b.read();
    let src = src.view()?;
    let mut dst = a.write();
    let mut dst = dst.view_mut()?;
    zip2_in_place(&mut dst, &src, f)?;
    Ok(())
}

fn numeric<Op, A, B>(a: &mut Storage<A>, b: &Storage<B>) -> Result<()>
where
    Op: BinaryOp,
    A: Arithmetic + Element,
    B: Element + AsPrimitive<A>,
{
    zip(a, b, |x, y| *x = Op::apply(*x, (*y).as_()))
}

fn binary_values<Op: BinaryOp>(out: &mut C, rhs: &C) -> Result<()> {
    match (out, rhs) {
        (C::F64(a), C::F64(b)) => numeric::<Op, f64, f64>(a, b),
        (C::F64(a), C::F32(b)) => numeric::<Op, f64, f32>(a, b),
        (C::F32(a), C::F32(b)) => numeric::<Op, f32, f32>(a, b),
        (C::F32(a), C::F64(b)) => numeric::<Op, f32, f64>(a, b),
        (C::I64(a), C::I64(b)) if Op::INTEGERS => numeric::<Op, i64, i64>(a, b),
        (C::I64(a), C::I32(b)) if Op::INTEGERS => numeric::<Op, i64, i32>(a, b),
        (C::I32(a), C::I32(b)) if Op::INTEGERS => numeric::<Op, i32, i32>(a, b),
        (C::I32(a), C::I64(b)) if Op::INTEGERS => numeric::<Op, i32, i64>(a, b),
        (C::Vector3d(a), C::Vector3d(b)) => zip(a, b, |x, y| {
            if let Some(r) = Op::apply_vector(*x, *y) {
                *x = r;
            }
        }),
        (C::Vector3d(a), C::F64(b)) => zip(a, b, |x, y| {
            if let Some(r) = Op::scale_vector(*x, *y) {
                *x = r;
            }
        }),
        (C::SparseF64(a), C::SparseF64(b)) => zip(a, b, |x: &mut EventList, y: &EventList| {
            for (xi, yi) in x.iter_mut().zip(y) {
                *xi = Op::apply(*xi, *yi);
            }
        }),
        (C::SparseF64(a), C::F64(b)) => zip(a, b, |x: &mut EventList, y: &f64| {
            for xi in x.iter_mut() {
                *xi = Op::apply(*xi, *y);
            }
        }),
        (a, b) => Err(unsupported(Op::NAME, a.dtype(), b.dtype())),
    }
}

fn with_variance_rhs<Op, A, B>(
    values: &mut Storage<A>,
    variances: &mut Storage<A>,
    rhs: &Storage<B>,
    rhs_variances: Option<&Storage<B>>,
) -> Result<()>
where
    Op: BinaryOp,
    A: Float + Element,
    B: Element + AsPrimitive<A>,
{
    let src = rhs.read();
    let src = src.view()?;
    let mut gv = values.write();
    let mut ge = variances.write();
    let mut dv = gv.view_mut()?;
    let mut de = ge.view_mut()?;
    match rhs_variances {
        Some(rhs_variances) => {
            let src_var = rhs_variances.read();
            let src_var = src_var.view()?;
            zip4_in_place(&mut dv, &mut de, &src, &src_var, |x, ex, y, ey| {
                let r = Op::apply(
                    ValueAndVariance::new(*x, *ex),
                    ValueAndVariance::new((*y).as_(), (*ey).as_()),
                );
                *x = r.value;
                *ex = r.variance;
            })?;
        }
        None => {
            zip3_in_place(&mut dv, &mut de, &src, |x, ex, y| {
                let r = Op::apply(
                    ValueAndVariance::new(*x, *ex),
                    ValueAndVariance::exact((*y).as_()),
                );
                *x = r.value;
                *ex = r.variance;
            })?;
        }
    }
    Ok(())
}

fn apply_events<Op: BinaryOp>(
    x: &mut EventList,
    ex: &mut EventList,
    rhs: impl Fn(usize) -> ValueAndVariance<f64>,
) {
    for (i, (xi, ei)) in x.iter_mut().zip(ex.iter_mut()).enumerate() {
        let r = Op::apply(ValueAndVariance::new(*xi, *ei), rhs(i));
        *xi = r.value;
        *ei = r.variance;
    }
}

fn sparse_with_variance_rhs<Op: BinaryOp>(
    values: &mut Storage<EventList>,
    variances: &mut Storage<EventList>,
    rhs: &C,
    rhs_variances: Option<&C>,
) -> Result<()> {
    let mut gv = values.write();
    let mut ge = variances.write();
    let mut dv = gv.view_mut()?;
    let mut de = ge.view_mut()?;
    match (rhs, rhs_variances) {
        (C::SparseF64(b), None) => {
            let src = b.read();
            let src = src.view()?;
            zip3_in_place(&mut dv, &mut de, &src, |x, ex, y: &EventList| {
                apply_events::<Op>(x, ex, |i| ValueAndVariance::exact(y[i]))
            })?;
        }
        (C::SparseF64(b), Some(C::SparseF64(be))) => {
            let (src, src_var) = (b.read(), be.read());
            let (src, src_var) = (src.view()?, src_var.view()?);
            zip4_in_place(&mut dv, &mut de, &src, &src_var, |x, ex, y: &EventList, ey: &EventList| {
                apply_events::<Op>(x, ex, |i| ValueAndVariance::new(y[i], ey[i]))
            })?;
        }
        (C::F64(b), None) => {
            let src = b.read();
            let src = src.view()?;
            zip3_in_place(&mut dv, &mut de, &src, |x, ex, y: &f64| {
                apply_events::<Op>(x, ex, |_| ValueAndVariance::exact(*y))
            })?;
        }
        (C::F64(b), Some(C::F64(be))) => {
            let (src, src_var) = (b.read(), be.read());
            let (src, src_var) = (src.view()?, src_var.view()?);
            zip4_in_place(&mut dv, &mut de, &src, &src_var, |x, ex, y: &f64, ey: &f64| {
                apply_events::<Op>(x, ex, |_| ValueAndVariance::new(*y, *ey))
            })?;
        }
        (b, _) => return Err(unsupported(Op::NAME, DType::SparseF64, b.dtype())),
    }
    Ok(())
}

fn binary_with_variances<Op: BinaryOp>(
    values: &mut C,
    variances: &mut C,
    rhs: &C,
    rhs_variances: Option<&C>,
) -> Result<()> {
    match (values, variances, rhs, rhs_variances) {
        (C::F64(v), C::F64(e), C::F64(b), None) => with_variance_rhs::<Op, f64, f64>(v, e, b, None),
        (C::F64(v), C::F64(e), C::F64(b), Some(C::F64(be))) => {
            with_variance_rhs::<Op, f64, f64>(v, e, b, Some(be))
        }
        (C::F64(v), C::F64(e), C::F32(b), None) => with_variance_rhs::<Op, f64, f32>(v, e, b, None),
        (C::F64(v), C::F64(e), C::F32(b), Some(C::F32(be))) => {
            with_variance_rhs::<Op, f64, f32>(v, e, b, Some(be))
        }
        (C::F32(v), C::F32(e), C::F32(b), None) => with_variance_rhs::<Op, f32, f32>(v, e, b, None),
        (C::F32(v), C::F32(e), C::F32(b), Some(C::F32(be))) => {
            with_variance_rhs::<Op, f32, f32>(v, e, b, Some(be))
        }
        (C::F32(v), C::F32(e), C::F64(b), None) => with_variance_rhs::<Op, f32, f64>(v, e, b, None),
        (C::F32(v), C::F32(e), C::F64(b), Some(C::F64(be))) => {
            with_variance_rhs::<Op, f32, f64>(v, e, b, Some(be))
        }
        (C::SparseF64(v), C::SparseF64(e), b, be) => {
            sparse_with_variance_rhs::<Op>(v, e, b, be)
        }
        (v, _, b, _) => Err(unsupported(Op::NAME, v.dtype(), b.dtype())),
    }
}

/// Values and variances of `var = op(var)`, unit untouched.
pub(crate) fn apply_unary<Op: UnaryOp>(var: &mut Variable) -> Result<()> {
    let (values, variances) = var.concepts_mut();
    match (values, variances) {
        (C::F64(v), None) => unary_float::<Op, f64>(v),
        (C::F32(v), None) => unary_float::<Op, f32>(v),
        (C::F64(v), Some(C::F64(e))) => unary_with_variances::<Op, f64>(v, e),
        (C::F32(v), Some(C::F32(e))) => unary_with_variances::<Op, f32>(v, e),
        (C::I64(v), None) => unary_integer::<Op, i64>(v),
        (C::I32(v), None) => unary_integer::<Op, i32>(v),
        (C::Vector3d(v), None) => {
            if Op::apply_vector(Vector3d::default()).is_none() {
                return Err(unsupported_unary(Op::NAME, DType::Vector3d));
            }
            let mut g = v.write();
            map_in_place(&mut g.view_mut()?, |x| {
                if let Some(r) = Op::apply_vector(*x) {
                    *x = r;
                }
            })?;
            Ok(())
        }
        (C::SparseF64(v), None) => {
            let mut g = v.write();
            map_in_place(&mut g.view_mut()?, |x: &mut EventList| {
                for xi in x.iter_mut() {
                    *xi = Op::apply(*xi);
                }
            })?;
            Ok(())
        }
        (C::SparseF64(v), Some(C::SparseF64(e))) => {
            let (mut gv, mut ge) = (v.write(), e.write());
            map2_in_place(&mut gv.view_mut()?, &mut ge.view_mut()?, |x: &mut EventList, ex: &mut EventList| {
                for (xi, ei) in x.iter_mut().zip(ex.iter_mut()) {
                    let r = Op::apply(ValueAndVariance::new(*xi, *ei));
                    *xi = r.value;
                    *ei = r.variance;
                }
            })?;
            Ok(())
        }
        (v, _) => Err(unsupported_unary(Op::NAME, v.dtype())),
    }
}

fn unary_float<Op: UnaryOp, T: FloatArithmetic + Element>(v: &mut Storage<T>) -> Result<()> {
    let mut g = v.write();
    map_in_place(&mut g.view_mut()?, |x| *x = Op::apply(*x))?;
    Ok(())
}

fn unary_with_variances<Op, T>(v: &mut Storage<T>, e: &mut Storage<T>) -> Result<()>
where
    Op: UnaryOp,
    T: Float + Element,
{
    let (mut gv, mut ge) = (v.write(), e.write());
    map2_in_place(&mut gv.view_mut()?, &mut ge.view_mut()?, |x, ex| {
        let r = Op::apply(ValueAndVariance::new(*x, *ex));
        *x = r.value;
        *ex = r.variance;
    })?;
    Ok(())
}

fn unary_integer<Op: UnaryOp, T: Arithmetic + Element>(v: &mut Storage<T>) -> Result<()> {
    if Op::apply_integer(T::one()).is_none() {
        return Err(unsupported_unary(Op::NAME, T::DTYPE));
    }
    let mut g = v.write();
    map_in_place(&mut g.view_mut()?, |x| {
        if let Some(r) = Op::apply_integer(*x) {
            *x = r;
        }
    })?;
    Ok(())
}
