//! In-place elementwise kernels over strided views.
//!
//! Every kernel has two traversals producing identical results:
//!
//! - **flat**: all operands are contiguous in the iterated shape; the loop
//!   runs over plain slices and is split across rayon workers above
//!   [`MINTHREADLENGTH`](crate::threading::MINTHREADLENGTH) elements
//! - **strided**: operands are walked in lock-step with [`ViewIndex`]
//!   odometers, sequentially
//!
//! Destination views are never broadcast ([`StridedViewMut`] rejects that),
//! source views may be. All operands must have identical dimensions; callers
//! broadcast sources first.
//!
//! [`ViewIndex`]: scivar_view::ViewIndex

use scivar_view::{DimensionError, Dimensions, StridedView, StridedViewMut};
use tracing::trace;

use crate::maybe_sync::{MaybeSendSync, MaybeSync};
use crate::Result;

#[cfg(feature = "parallel")]
use crate::threading::MINTHREADLENGTH;

fn ensure_same_dims(expected: &Dimensions, actual: &Dimensions) -> Result<()> {
    if expected != actual {
        return Err(DimensionError::Mismatch {
            expected: *expected,
            actual: *actual,
        });
    }
    Ok(())
}

#[cfg(feature = "parallel")]
#[inline]
fn parallel_worthwhile(len: usize) -> bool {
    len > MINTHREADLENGTH
}

// ============================================================================
// Unary
// ============================================================================

/// `f(&mut dst[i])` for every element.
pub fn map_in_place<A, F>(dst: &mut StridedViewMut<'_, A>, f: F) -> Result<()>
where
    A: MaybeSendSync,
    F: Fn(&mut A) + MaybeSync,
{
    if let Some(d) = dst.as_slice_mut() {
        trace!(len = d.len(), "map: flat path");
        #[cfg(feature = "parallel")]
        {
            if parallel_worthwhile(d.len()) {
                use rayon::prelude::*;
                d.par_iter_mut().for_each(&f);
                return Ok(());
            }
        }
        d.iter_mut().for_each(f);
        return Ok(());
    }
    trace!(dims = %dst.dims(), "map: strided path");
    let offsets = dst.offsets();
    let data = dst.data_mut();
    for o in offsets {
        f(&mut data[o]);
    }
    Ok(())
}

/// `f(&mut values[i], &mut variances[i])` for every element.
pub fn map2_in_place<A, F>(
    values: &mut StridedViewMut<'_, A>,
    variances: &mut StridedViewMut<'_, A>,
    f: F,
) -> Result<()>
where
    A: MaybeSendSync,
    F: Fn(&mut A, &mut A) + MaybeSync,
{
    ensure_same_dims(values.dims(), variances.dims())?;
    if values.layout().is_contiguous() && variances.layout().is_contiguous() {
        if let (Some(v), Some(e)) = (values.as_slice_mut(), variances.as_slice_mut()) {
            trace!(len = v.len(), "map2: flat path");
            #[cfg(feature = "parallel")]
            {
                if parallel_worthwhile(v.len()) {
                    use rayon::prelude::*;
                    v.par_iter_mut()
                        .zip(e.par_iter_mut())
                        .for_each(|(v, e)| f(v, e));
                    return Ok(());
                }
            }
            v.iter_mut().zip(e.iter_mut()).for_each(|(v, e)| f(v, e));
            return Ok(());
        }
    }
    trace!(dims = %values.dims(), "map2: strided path");
    let offsets = values.offsets().zip(variances.offsets());
    let v = values.data_mut();
    let e = variances.data_mut();
    for (ov, oe) in offsets {
        f(&mut v[ov], &mut e[oe]);
    }
    Ok(())
}

// ============================================================================
// Binary
// ============================================================================

/// `f(&mut dst[i], &src[i])` for every element.
pub fn zip2_in_place<A, B, F>(
    dst: &mut StridedViewMut<'_, A>,
    src: &StridedView<'_, B>,
    f: F,
) -> Result<()>
where
    A: MaybeSendSync,
    B: MaybeSync,
    F: Fn(&mut A, &B) + MaybeSync,
{
    ensure_same_dims(dst.dims(), src.dims())?;
    if let (true, Some(s)) = (dst.layout().is_contiguous(), src.as_slice()) {
        if let Some(d) = dst.as_slice_mut() {
            trace!(len = d.len(), "zip2: flat path");
            #[cfg(feature = "parallel")]
            {
                if parallel_worthwhile(d.len()) {
                    use rayon::prelude::*;
                    d.par_iter_mut()
                        .zip(s.par_iter())
                        .for_each(|(a, b)| f(a, b));
                    return Ok(());
                }
            }
            d.iter_mut().zip(s).for_each(|(a, b)| f(a, b));
            return Ok(());
        }
    }
    trace!(dims = %dst.dims(), "zip2: strided path");
    let offsets = dst.offsets().zip(src.offsets());
    let s = src.data();
    let d = dst.data_mut();
    for (od, os) in offsets {
        f(&mut d[od], &s[os]);
    }
    Ok(())
}

/// `f(&mut values[i], &mut variances[i], &src[i])` for every element.
///
/// Used when the destination carries variances and the source does not.
pub fn zip3_in_place<A, B, F>(
    values: &mut StridedViewMut<'_, A>,
    variances: &mut StridedViewMut<'_, A>,
    src: &StridedView<'_, B>,
    f: F,
) -> Result<()>
where
    A: MaybeSendSync,
    B: MaybeSync,
    F: Fn(&mut A, &mut A, &B) + MaybeSync,
{
    ensure_same_dims(values.dims(), variances.dims())?;
    ensure_same_dims(values.dims(), src.dims())?;
    let flat = values.layout().is_contiguous() && variances.layout().is_contiguous();
    if let (true, Some(s)) = (flat, src.as_slice()) {
        if let (Some(v), Some(e)) = (values.as_slice_mut(), variances.as_slice_mut()) {
            trace!(len = v.len(), "zip3: flat path");
            #[cfg(feature = "parallel")]
            {
                if parallel_worthwhile(v.len()) {
                    use rayon::prelude::*;
                    v.par_iter_mut()
                        .zip(e.par_iter_mut())
                        .zip(s.par_iter())
                        .for_each(|((v, e), s)| f(v, e, s));
                    return Ok(());
                }
            }
            v.iter_mut()
                .zip(e.iter_mut())
                .zip(s)
                .for_each(|((v, e), s)| f(v, e, s));
            return Ok(());
        }
    }
    trace!(dims = %values.dims(), "zip3: strided path");
    let offsets = values
        .offsets()
        .zip(variances.offsets())
        .zip(src.offsets());
    let s = src.data();
    let v = values.data_mut();
    let e = variances.data_mut();
    for ((ov, oe), os) in offsets {
        f(&mut v[ov], &mut e[oe], &s[os]);
    }
    Ok(())
}

/// `f(&mut values[i], &mut variances[i], &src_values[i], &src_variances[i])`.
pub fn zip4_in_place<A, B, F>(
    values: &mut StridedViewMut<'_, A>,
    variances: &mut StridedViewMut<'_, A>,
    src_values: &StridedView<'_, B>,
    src_variances: &StridedView<'_, B>,
    f: F,
) -> Result<()>
where
    A: MaybeSendSync,
    B: MaybeSync,
    F: Fn(&mut A, &mut A, &B, &B) + MaybeSync,
{
    ensure_same_dims(values.dims(), variances.dims())?;
    ensure_same_dims(values.dims(), src_values.dims())?;
    ensure_same_dims(values.dims(), src_variances.dims())?;
    let flat = values.layout().is_contiguous() && variances.layout().is_contiguous();
    if let (true, Some(sv), Some(se)) = (flat, src_values.as_slice(), src_variances.as_slice()) {
        if let (Some(v), Some(e)) = (values.as_slice_mut(), variances.as_slice_mut()) {
            trace!(len = v.len(), "zip4: flat path");
            #[cfg(feature = "parallel")]
            {
                if parallel_worthwhile(v.len()) {
                    use rayon::prelude::*;
                    v.par_iter_mut()
                        .zip(e.par_iter_mut())
                        .zip(sv.par_iter().zip(se.par_iter()))
                        .for_each(|((v, e), (sv, se))| f(v, e, sv, se));
                    return Ok(());
                }
            }
            v.iter_mut()
                .zip(e.iter_mut())
                .zip(sv.iter().zip(se))
                .for_each(|((v, e), (sv, se))| f(v, e, sv, se));
            return Ok(());
        }
    }
    trace!(dims = %values.dims(), "zip4: strided path");
    let offsets = values
        .offsets()
        .zip(variances.offsets())
        .zip(src_values.offsets().zip(src_variances.offsets()));
    let sv = src_values.data();
    let se = src_variances.data();
    let v = values.data_mut();
    let e = variances.data_mut();
    for ((ov, oe), (osv, ose)) in offsets {
        f(&mut v[ov], &mut e[oe], &sv[osv], &se[ose]);
    }
    Ok(())
}
