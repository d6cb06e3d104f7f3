//! Static worker partitioning for blocked variants.
//!
//! Blocks are assigned to workers ahead of time in contiguous ranges; there
//! is no work stealing and no runtime rebalancing. Workers write to disjoint
//! operand blocks, so the only shared mutable state is the first-error slot.
//! All workers are joined before the partitioned call returns, even on error.

use std::ops::Range;
#[cfg(feature = "parallel")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "parallel")]
use std::sync::Mutex;

#[cfg(feature = "parallel")]
use crate::error::{ObError, Result};

/// Raw pointer wrapper that may cross thread boundaries. The partitioner
/// guarantees each worker only dereferences offsets inside its own block.
#[derive(Copy, Clone)]
pub(crate) struct SendPtr<T>(pub *mut T);

unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

impl<T> SendPtr<T> {
    #[inline]
    pub fn as_ptr(self) -> *mut T {
        self.0
    }
}

/// Split `nblocks` into at most `nworkers` contiguous ranges, front-loading
/// the remainder so range lengths differ by at most one.
pub(crate) fn block_ranges(nblocks: usize, nworkers: usize) -> Vec<Range<usize>> {
    let nworkers = nworkers.max(1).min(nblocks.max(1));
    let base = nblocks / nworkers;
    let extra = nblocks % nworkers;
    let mut ranges = Vec::with_capacity(nworkers);
    let mut start = 0;
    for w in 0..nworkers {
        let len = base + usize::from(w < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Run `f` once per block index on a static partition of `0..nblocks`.
///
/// The first error observed is kept and returned after every worker has
/// finished; later workers stop picking up new blocks once a failure is
/// flagged. A panic inside `f` propagates after the join.
#[cfg(feature = "parallel")]
pub(crate) fn run_partitioned<F>(nblocks: usize, nthreads: usize, f: &F) -> Result<()>
where
    F: Fn(usize) -> Result<()> + Sync,
{
    let failed = AtomicBool::new(false);
    let first_err: Mutex<Option<ObError>> = Mutex::new(None);

    rayon::scope(|s| {
        for range in block_ranges(nblocks, nthreads) {
            let failed = &failed;
            let first_err = &first_err;
            s.spawn(move |_| {
                for b in range {
                    if failed.load(Ordering::Acquire) {
                        break;
                    }
                    if let Err(e) = f(b) {
                        let mut slot = first_err.lock().expect("error slot poisoned");
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                        failed.store(true, Ordering::Release);
                    }
                }
            });
        }
    });

    // The scope is a barrier, so the slot is quiescent here.
    match first_err.into_inner().expect("error slot poisoned") {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
