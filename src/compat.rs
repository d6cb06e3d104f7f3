//! Legacy flat-array calling convention.
//!
//! The historical interface describes a vector as (length, base slice,
//! starting offset, signed increment); logical element i lives at
//! offset + i * inc, so a negative increment walks towards lower
//! addresses. For operations that touch each element independently the
//! description is renormalized into a forward walk (the offset moves to
//! the last touched element and the increment flips sign), which visits
//! the same elements in reverse order. Operations that pair two vectors
//! keep the raw description instead: flipping only one of the two would
//! pair logical element i with logical element n-1-i of the other. A
//! negative length is treated as zero rather than rejected.
//!
//! Real shims translate a returned error into their host convention; here
//! the error is simply propagated.

use crate::context::ExecContext;
use crate::dtype::Elem;
use crate::error::Result;
use crate::object::{MatrixView, MatrixViewMut};
use crate::scalv;

/// Clamp a legacy signed dimension to a usable length.
pub fn convert_dim(n: i64) -> usize {
    if n < 0 {
        0
    } else {
        n as usize
    }
}

/// Renormalize a legacy (offset, increment) pair for a forward walk.
pub fn convert_inc(n0: usize, offset: isize, inc: isize) -> (isize, isize) {
    if inc < 0 && n0 > 0 {
        (offset + (n0 as isize - 1) * inc, -inc)
    } else {
        (offset, inc)
    }
}

/// Canonical read-only vector view over a legacy description.
pub fn vector_view<T>(data: &[T], n: i64, offset: isize, inc: isize) -> Result<MatrixView<'_, T>> {
    let n0 = convert_dim(n);
    let (offset0, inc0) = convert_inc(n0, offset, inc);
    MatrixView::vector(data, n0, inc0, offset0)
}

/// Canonical mutable vector view over a legacy description.
pub fn vector_view_mut<T>(
    data: &mut [T],
    n: i64,
    offset: isize,
    inc: isize,
) -> Result<MatrixViewMut<'_, T>> {
    let n0 = convert_dim(n);
    let (offset0, inc0) = convert_inc(n0, offset, inc);
    MatrixViewMut::vector(data, n0, inc0, offset0)
}

/// Legacy scaling entry point: x := alpha * x.
pub fn scal<T: Elem>(
    ctx: &ExecContext,
    n: i64,
    alpha: T,
    x: &mut [T],
    offset: isize,
    inc: isize,
) -> Result<()> {
    let mut xv = vector_view_mut(x, n, offset, inc)?;
    scalv::scalv(&alpha.to_scalar(), &mut xv, ctx, None)
}

/// Legacy dot product, optionally conjugating the first vector.
///
/// Built on raw views so that each increment keeps its sign: logical
/// element i of x always meets logical element i of y, whichever way the
/// two walk through memory.
#[allow(clippy::too_many_arguments)]
pub fn dot<T: Elem>(
    n: i64,
    conjx: bool,
    x: &[T],
    offset_x: isize,
    inc_x: isize,
    y: &[T],
    offset_y: isize,
    inc_y: isize,
) -> Result<T> {
    let n0 = convert_dim(n);
    let xv = MatrixView::vector(x, n0, inc_x, offset_x)?;
    let yv = MatrixView::vector(y, n0, inc_y, offset_y)?;
    let mut acc = T::zero();
    for i in 0..xv.len() {
        let xi = if conjx { xv.at(i, 0).conj() } else { xv.at(i, 0) };
        acc = acc + xi * yv.at(i, 0);
    }
    Ok(acc)
}
