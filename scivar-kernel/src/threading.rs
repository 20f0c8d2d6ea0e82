//! Data-parallel loops over independent output groups.
//!
//! An output buffer is split into equal-length groups (rows of a rebinned or
//! histogrammed array, one per outer index). Groups write disjoint memory,
//! so they can run on separate threads; the split recursively halves the
//! group range with `rayon::join` until each half fits one thread or falls
//! below [`MINTHREADLENGTH`] elements.

use tracing::trace;

use crate::maybe_sync::{MaybeSend, MaybeSync};

/// Minimum number of elements to justify multi-threaded execution.
pub const MINTHREADLENGTH: usize = 1 << 15;

/// Call `f(group_index, group)` for every `group_len`-sized chunk of `out`.
///
/// A trailing partial chunk is passed as well. Nothing is called when
/// `group_len` is zero.
pub fn for_each_group_mut<T, F>(out: &mut [T], group_len: usize, f: &F)
where
    T: MaybeSend,
    F: Fn(usize, &mut [T]) + MaybeSync,
{
    if group_len == 0 {
        return;
    }
    #[cfg(feature = "parallel")]
    {
        if out.len() > MINTHREADLENGTH && out.len() > group_len {
            let nthreads = rayon::current_num_threads();
            trace!(len = out.len(), group_len, nthreads, "group loop: parallel split");
            split_groups(out, group_len, 0, nthreads, f);
            return;
        }
    }
    trace!(len = out.len(), group_len, "group loop: sequential");
    run_groups(out, group_len, 0, f);
}

fn run_groups<T, F>(out: &mut [T], group_len: usize, first: usize, f: &F)
where
    F: Fn(usize, &mut [T]),
{
    for (g, chunk) in out.chunks_mut(group_len).enumerate() {
        f(first + g, chunk);
    }
}

#[cfg(feature = "parallel")]
fn split_groups<T, F>(out: &mut [T], group_len: usize, first: usize, nthreads: usize, f: &F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    let ngroups = out.len().div_ceil(group_len);
    if nthreads <= 1 || ngroups <= 1 || out.len() <= MINTHREADLENGTH {
        run_groups(out, group_len, first, f);
        return;
    }
    let left = ngroups / 2;
    let nt_left = nthreads / 2;
    let (lo, hi) = out.split_at_mut(left * group_len);
    rayon::join(
        || split_groups(lo, group_len, first, nt_left, f),
        || split_groups(hi, group_len, first + left, nthreads - nt_left, f),
    );
}
