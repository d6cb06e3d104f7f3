//! Symmetric/Hermitian rank-k update front end:
//! C := beta-free accumulation  C += alpha * A * A^H (or A^T).
//!
//! Only the triangle named by the operand's uplo marker is read or written;
//! for a Hermitian C the diagonal is re-projected onto the real axis after
//! each update. Two algorithm families are registered: variant 1 sweeps by
//! rows (blocked: partitions the k dimension), variant 2 sweeps by columns
//! (blocked: partitions the m dimension into triangle-aware row blocks, the
//! family the static worker partitioner parallelizes).

use log::debug;

use crate::check;
use crate::cntl::{self, ControlNode, ImplKind, Variant};
use crate::context::ExecContext;
use crate::dispatch::DispatchTable;
use crate::dtype::{Elem, Scalar};
use crate::error::{ObError, Result};
use crate::object::{MatrixView, MatrixViewMut, Struc, Uplo};
use crate::threading::SendPtr;
use crate::typed;

const OP: &str = "herk";

/// Row-sweep family; its blocked form partitions the reduction dimension.
pub const VAR1: Variant = Variant(0);
/// Column-sweep family; its blocked form partitions the update dimension.
pub const VAR2: Variant = Variant(1);
const NVARS: usize = 2;

type HerkFn<T> = fn(
    T,
    &MatrixView<'_, T>,
    &mut MatrixViewMut<'_, T>,
    &ExecContext,
    &ControlNode,
) -> Result<()>;

fn table<T: Elem>() -> DispatchTable<HerkFn<T>, NVARS> {
    DispatchTable::new(
        OP,
        [
            [
                Some(unb_var1::<T> as HerkFn<T>),
                None,
                Some(blk_var1::<T> as HerkFn<T>),
            ],
            [
                Some(unb_var2::<T> as HerkFn<T>),
                None,
                Some(blk_var2::<T> as HerkFn<T>),
            ],
        ],
    )
}

/// Rank-k update of the structured matrix `c` by `a`'s logical rows.
///
/// `a` contributes `a * a^T` for a symmetric `c` and `a * a^H` for a
/// Hermitian one; transpose/conjugation attributes of `a` apply before the
/// product. `cntl` overrides the default control tree.
pub fn herk<T: Elem>(
    alpha: &Scalar,
    a: &MatrixView<'_, T>,
    c: &mut MatrixViewMut<'_, T>,
    ctx: &ExecContext,
    cntl: Option<&ControlNode>,
) -> Result<()> {
    typed::scalar_compat(OP, alpha, T::DTYPE, ctx)?;
    if ctx.diagnostics() {
        check::herk_check(OP, alpha, a, c)?;
    }

    let tbl = table::<T>();
    let (m, k) = a.logical_dims();
    let default_node;
    let node = match cntl {
        Some(n) => n,
        None => {
            default_node = cntl::default_tree(
                ctx.tree_policy(T::DTYPE),
                tbl.has(VAR2, ImplKind::Optimized),
                m.max(k),
                VAR2,
                VAR2,
            );
            &default_node
        }
    };
    node.validate(OP)?;

    if node.is_noop() || c.has_zero_dim() || k == 0 || alpha.is_zero() {
        return Ok(());
    }

    let f = tbl.lookup(node.variant(), node.kind())?;
    debug!(
        "herk: m={} k={} variant={} kind={:?}",
        m,
        k,
        node.variant().0,
        node.kind()
    );
    f(T::from_scalar(*alpha), a, c, ctx, node)
}

// ============================================================================
// Unblocked variants
// ============================================================================

#[inline]
fn row_conj<T: Elem>(herm: bool, v: T) -> T {
    if herm {
        v.conj()
    } else {
        v
    }
}

/// Variant 1: sweep the triangle row by row, each entry a full-length dot.
fn unb_var1<T: Elem>(
    alpha: T,
    a: &MatrixView<'_, T>,
    c: &mut MatrixViewMut<'_, T>,
    _ctx: &ExecContext,
    _cntl: &ControlNode,
) -> Result<()> {
    let (m, k) = a.logical_dims();
    let herm = c.struc() == Struc::Hermitian;
    let uplo = c.uplo().ok_or(ObError::MissingUplo { op: OP })?;
    for i in 0..m {
        let (j0, j1) = match uplo {
            Uplo::Lower => (0, i + 1),
            Uplo::Upper => (i, m),
        };
        for j in j0..j1 {
            let mut sum = T::zero();
            for p in 0..k {
                sum = sum + a.at_logical(i, p) * row_conj(herm, a.at_logical(j, p));
            }
            let upd = c.at(i, j) + alpha * sum;
            let upd = if herm && i == j { upd.real_part() } else { upd };
            c.set(i, j, upd);
        }
    }
    Ok(())
}

/// Variant 2: sweep the reduction dimension, accumulating one scaled
/// rank-1 contribution per column into the triangle.
fn unb_var2<T: Elem>(
    alpha: T,
    a: &MatrixView<'_, T>,
    c: &mut MatrixViewMut<'_, T>,
    _ctx: &ExecContext,
    _cntl: &ControlNode,
) -> Result<()> {
    let (m, k) = a.logical_dims();
    let herm = c.struc() == Struc::Hermitian;
    let uplo = c.uplo().ok_or(ObError::MissingUplo { op: OP })?;
    for p in 0..k {
        for j in 0..m {
            let s = alpha * row_conj(herm, a.at_logical(j, p));
            let (i0, i1) = match uplo {
                Uplo::Lower => (j, m),
                Uplo::Upper => (0, j + 1),
            };
            for i in i0..i1 {
                let upd = c.at(i, j) + a.at_logical(i, p) * s;
                let upd = if herm && i == j { upd.real_part() } else { upd };
                c.set(i, j, upd);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Blocked variants
// ============================================================================

fn child_of<'a, T: Elem>(
    cntl: &'a ControlNode,
) -> Result<(HerkFn<T>, &'a ControlNode)> {
    let sub = cntl.sub().ok_or(ObError::BadControlTree {
        op: OP,
        reason: "blocked node without a child",
    })?;
    let f = table::<T>().lookup(sub.variant(), sub.kind())?;
    Ok((f, sub))
}

/// Blocked variant 1: partition the reduction dimension and accumulate one
/// full-triangle update per k-panel. Sequential by construction, every panel
/// writes the whole triangle.
fn blk_var1<T: Elem>(
    alpha: T,
    a: &MatrixView<'_, T>,
    c: &mut MatrixViewMut<'_, T>,
    ctx: &ExecContext,
    cntl: &ControlNode,
) -> Result<()> {
    let (child, sub) = child_of::<T>(cntl)?;
    let b = cntl.block_for(ctx.blocking(T::DTYPE).block);
    let (_m, k) = a.logical_dims();
    let mut p0 = 0;
    while p0 < k {
        let bk = b.min(k - p0);
        let ap = a.logical_col_block(p0, bk);
        let mut cc = c.rb();
        child(alpha, &ap, &mut cc, ctx, sub)?;
        p0 += bk;
    }
    Ok(())
}

/// Blocked variant 2: partition the update dimension into row blocks. Each
/// block updates its diagonal sub-triangle through the child node and its
/// off-diagonal panel through a dense rank-k loop; panels falling entirely
/// outside the stored triangle are skipped. Row blocks touch disjoint parts
/// of C, which is what the worker partitioner relies on.
fn blk_var2<T: Elem>(
    alpha: T,
    a: &MatrixView<'_, T>,
    c: &mut MatrixViewMut<'_, T>,
    ctx: &ExecContext,
    cntl: &ControlNode,
) -> Result<()> {
    let (child, sub) = child_of::<T>(cntl)?;
    let b = cntl.block_for(ctx.blocking(T::DTYPE).block);
    let (m, _k) = a.logical_dims();
    let herm = c.struc() == Struc::Hermitian;
    let uplo = c.uplo().ok_or(ObError::MissingUplo { op: OP })?;
    let nblocks = m.div_ceil(b);

    let base = SendPtr(c.as_mut_ptr());
    let (crs, ccs) = (c.row_stride(), c.col_stride());
    let cattrs = c.attrs();

    let do_block = move |bi: usize| -> Result<()> {
        let i0 = bi * b;
        let bm = b.min(m - i0);
        let ai = a.logical_row_block(i0, bm);

        // Diagonal block: same structure as C, handled by the child node.
        let diag = (i0 as isize) * crs + (i0 as isize) * ccs;
        let mut cd = unsafe {
            MatrixViewMut::from_raw_parts(base.as_ptr().offset(diag), bm, bm, crs, ccs, cattrs)
        };
        child(alpha, &ai, &mut cd, ctx, sub)?;

        // Off-diagonal panel inside the stored triangle, if any.
        let (pj, pw) = match uplo {
            Uplo::Lower => (0, i0),
            Uplo::Upper => (i0 + bm, m - i0 - bm),
        };
        if pw == 0 {
            return Ok(());
        }
        let aj = a.logical_row_block(pj, pw);
        let off = (i0 as isize) * crs + (pj as isize) * ccs;
        let mut cp = unsafe {
            MatrixViewMut::from_raw_parts(base.as_ptr().offset(off), bm, pw, crs, ccs, cattrs)
        };
        panel_rank_k(alpha, &ai, &aj, herm, &mut cp);
        Ok(())
    };

    #[cfg(feature = "parallel")]
    if ctx.nthreads() > 1 && nblocks > 1 {
        return crate::threading::run_partitioned(nblocks, ctx.nthreads(), &do_block);
    }

    for bi in 0..nblocks {
        do_block(bi)?;
    }
    Ok(())
}

/// Dense rank-k update of one off-diagonal panel:
/// cp[r, s] += alpha * (ai row r) . conj?(aj row s).
fn panel_rank_k<T: Elem>(
    alpha: T,
    ai: &MatrixView<'_, T>,
    aj: &MatrixView<'_, T>,
    herm: bool,
    cp: &mut MatrixViewMut<'_, T>,
) {
    let (bm, k) = ai.logical_dims();
    let (pw, _) = aj.logical_dims();
    for s in 0..pw {
        for r in 0..bm {
            let mut sum = T::zero();
            for p in 0..k {
                sum = sum + ai.at_logical(r, p) * row_conj(herm, aj.at_logical(s, p));
            }
            cp.set(r, s, cp.at(r, s) + alpha * sum);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Matrix;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    fn dense_reference(a: &Matrix<f64>) -> Matrix<f64> {
        let (m, k) = (a.m(), a.n());
        Matrix::from_fn(m, m, |i, j| {
            (0..k).map(|p| a.get(i, p) * a.get(j, p)).sum()
        })
    }

    fn run_f64(uplo: Uplo, node: Option<&ControlNode>) -> (Matrix<f64>, Matrix<f64>) {
        let ctx = ExecContext::new();
        let m = 7;
        let k = 5;
        let a = Matrix::from_fn(m, k, |i, j| ((3 * i + 2 * j) % 11) as f64 - 4.0);
        let full = dense_reference(&a);
        let mut c = Matrix::zeros(m, m);
        {
            let av = a.view();
            let mut cv = c.view_mut().with_struc(Struc::Symmetric, Some(uplo));
            herk(&Scalar::F64(1.0), &av, &mut cv, &ctx, node).unwrap();
        }
        (c, full)
    }

    fn assert_triangle(c: &Matrix<f64>, full: &Matrix<f64>, uplo: Uplo) {
        for i in 0..c.m() {
            for j in 0..c.n() {
                let stored = match uplo {
                    Uplo::Lower => i >= j,
                    Uplo::Upper => i <= j,
                };
                if stored {
                    assert_relative_eq!(c.get(i, j), full.get(i, j), epsilon = 1e-12);
                } else {
                    assert_eq!(c.get(i, j), 0.0, "wrote outside the triangle");
                }
            }
        }
    }

    #[test]
    fn test_unb_var1_matches_dense() {
        let node = ControlNode::leaf(VAR1, ImplKind::Reference);
        for uplo in [Uplo::Lower, Uplo::Upper] {
            let (c, full) = run_f64(uplo, Some(&node));
            assert_triangle(&c, &full, uplo);
        }
    }

    #[test]
    fn test_unb_var2_matches_var1() {
        let node = ControlNode::leaf(VAR2, ImplKind::Reference);
        for uplo in [Uplo::Lower, Uplo::Upper] {
            let (c, full) = run_f64(uplo, Some(&node));
            assert_triangle(&c, &full, uplo);
        }
    }

    #[test]
    fn test_blocked_variants_match_reference() {
        for blocksize in [2, 3, 5, 8, 64] {
            for variant in [VAR1, VAR2] {
                let node = ControlNode::blocked(
                    variant,
                    Some(blocksize),
                    ControlNode::leaf(VAR1, ImplKind::Reference),
                );
                for uplo in [Uplo::Lower, Uplo::Upper] {
                    let (c, full) = run_f64(uplo, Some(&node));
                    assert_triangle(&c, &full, uplo);
                }
            }
        }
    }

    #[test]
    fn test_hermitian_diagonal_stays_real() {
        let ctx = ExecContext::new();
        let m = 4;
        let k = 3;
        let a = Matrix::from_fn(m, k, |i, j| {
            Complex64::new((i + j) as f64, (i as f64) - (j as f64))
        });
        let mut c = Matrix::zeros(m, m);
        {
            let av = a.view();
            let mut cv = c
                .view_mut()
                .with_struc(Struc::Hermitian, Some(Uplo::Lower));
            herk(&Scalar::F64(1.0), &av, &mut cv, &ctx, None).unwrap();
        }
        for i in 0..m {
            assert_eq!(c.get(i, i).im, 0.0);
            for j in 0..i {
                // A * A^H lower entry.
                let want: Complex64 = (0..k)
                    .map(|p| a.get(i, p) * a.get(j, p).conj())
                    .sum();
                assert_relative_eq!(c.get(i, j).re, want.re, epsilon = 1e-12);
                assert_relative_eq!(c.get(i, j).im, want.im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_zero_alpha_is_elided() {
        let ctx = ExecContext::new();
        let a = Matrix::from_fn(3, 2, |i, j| (i + j) as f64);
        let mut c = Matrix::from_fn(3, 3, |i, j| (i * 3 + j) as f64);
        let before: Vec<f64> = c.data().to_vec();
        {
            let av = a.view();
            let mut cv = c.view_mut().with_struc(Struc::Symmetric, Some(Uplo::Lower));
            herk(&Scalar::F64(0.0), &av, &mut cv, &ctx, None).unwrap();
        }
        assert_eq!(c.data(), &before[..]);
    }
}
