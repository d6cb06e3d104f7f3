//! Fused microkernel layer.
//!
//! Microkernels are the leaves of every control tree: small routines working
//! on an in-cache block in a single pass, reached through per-datatype
//! function references held by the execution context. The portable
//! realizations here define the contract a hardware-specific kernel must
//! satisfy when plugged in; they also bump the context's instrumentation
//! counters, which the test suite uses to prove degeneracy elision never
//! reaches a kernel.

use smallvec::SmallVec;

use crate::context::ExecContext;
use crate::dtype::Elem;
use crate::object::{MatrixView, MatrixViewMut};

/// Conjugation switches for the four operand roles of the fused kernel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FusedConj {
    /// Conjugate A in its reduction (A^T w) role.
    pub at: bool,
    /// Conjugate A in its update (A x) role.
    pub a: bool,
    /// Conjugate the shared reduction vector w.
    pub w: bool,
    /// Conjugate the f-element coefficient vector x.
    pub x: bool,
}

/// Vector-scaling kernel: x := beta * x.
pub type ScalvKernel<T> = fn(&ExecContext, T, &mut MatrixViewMut<T>);

/// Fused dot/axpy kernel over f packed columns of an m x f operand:
/// y := beta * y + alpha * A^T w  and  z := z + alpha * A x, one pass over A.
pub type DotxAxpyfKernel<T> = fn(
    &ExecContext,
    FusedConj,
    T,                      // alpha
    T,                      // beta
    &MatrixView<'_, T>,     // a: m x f
    &MatrixView<'_, T>,     // w: m
    &MatrixView<'_, T>,     // x: f
    &mut MatrixViewMut<'_, T>, // y: f
    &mut MatrixViewMut<'_, T>, // z: m
);

/// Per-datatype microkernel function references, shared read-only through
/// the execution context. Replacing a field is the plug-in point for
/// hardware-specific kernels.
#[derive(Copy, Clone)]
pub struct Microkernels<T: Elem> {
    pub scalv: ScalvKernel<T>,
    pub dotxaxpyf: DotxAxpyfKernel<T>,
}

impl<T: Elem> Default for Microkernels<T> {
    fn default() -> Self {
        Microkernels {
            scalv: scalv_ker::<T>,
            dotxaxpyf: dotxaxpyf_ker::<T>,
        }
    }
}

#[inline]
fn maybe_conj<T: Elem>(flag: bool, v: T) -> T {
    if flag {
        v.conj()
    } else {
        v
    }
}

/// Portable scaling kernel.
pub fn scalv_ker<T: Elem>(ctx: &ExecContext, beta: T, x: &mut MatrixViewMut<'_, T>) {
    ctx.counters().bump_scalv();
    for i in 0..x.len() {
        let v = x.at(i, 0);
        x.set(i, 0, beta * v);
    }
}

/// Portable fused dot/axpy kernel.
///
/// Mathematically equivalent to f independent dot products plus f
/// independent axpy updates with the stated conjugation semantics; only the
/// memory-traffic pattern and the floating-point summation order differ
/// from the unfused composition.
pub fn dotxaxpyf_ker<T: Elem>(
    ctx: &ExecContext,
    conj: FusedConj,
    alpha: T,
    beta: T,
    a: &MatrixView<'_, T>,
    w: &MatrixView<'_, T>,
    x: &MatrixView<'_, T>,
    y: &mut MatrixViewMut<'_, T>,
    z: &mut MatrixViewMut<'_, T>,
) {
    ctx.counters().bump_fused();
    let (m, f) = a.logical_dims();
    debug_assert_eq!(w.len(), m);
    debug_assert_eq!(x.len(), f);
    debug_assert_eq!(y.len(), f);
    debug_assert_eq!(z.len(), m);

    let aval = |i: usize, j: usize| {
        if a.is_trans() {
            a.at(j, i)
        } else {
            a.at(i, j)
        }
    };

    let xs: SmallVec<[T; 8]> = (0..f).map(|j| maybe_conj(conj.x, x.at(j, 0))).collect();
    let mut acc: SmallVec<[T; 8]> = smallvec::smallvec![T::zero(); f];

    for i in 0..m {
        let wi = maybe_conj(conj.w, w.at(i, 0));
        let mut zi = z.at(i, 0);
        for j in 0..f {
            let aij = aval(i, j);
            acc[j] = acc[j] + maybe_conj(conj.at, aij) * wi;
            zi = zi + alpha * maybe_conj(conj.a, aij) * xs[j];
        }
        z.set(i, 0, zi);
    }

    for j in 0..f {
        // beta == 0 overwrites rather than scales, so y may start
        // uninitialized without poisoning the result.
        let yj = if beta.is_zero() {
            T::zero()
        } else {
            beta * y.at(j, 0)
        };
        y.set(j, 0, yj + alpha * acc[j]);
    }
}
