//! Fused dot/axpy front end over f packed columns of an m x f operand:
//!
//!   y := beta * y + alpha * A^T w      (f reductions)
//!   z := z + alpha * A x               (f updates)
//!
//! both computed in one traversal of A. The reference realization is the
//! unfused composition; the optimized one walks A in panels of at most the
//! context's fusion factor and hands each panel to the fused microkernel.
//! Results agree with the unfused composition up to floating-point
//! summation order.

use log::trace;

use crate::check;
use crate::cntl::{self, ControlNode, ImplKind, Variant};
use crate::context::ExecContext;
use crate::dispatch::DispatchTable;
use crate::dtype::{Elem, Scalar};
use crate::error::Result;
use crate::kernels::FusedConj;
use crate::object::{MatrixView, MatrixViewMut};
use crate::typed;

const OP: &str = "dotxaxpyf";

pub const VAR1: Variant = Variant(0);
const NVARS: usize = 1;

type FusedFn<T> = fn(
    FusedConj,
    T,
    T,
    &MatrixView<'_, T>,
    &MatrixView<'_, T>,
    &MatrixView<'_, T>,
    &mut MatrixViewMut<'_, T>,
    &mut MatrixViewMut<'_, T>,
    &ExecContext,
) -> Result<()>;

fn table<T: Elem>() -> DispatchTable<FusedFn<T>, NVARS> {
    DispatchTable::new(
        OP,
        [[
            Some(ref_var1::<T> as FusedFn<T>),
            Some(opt_var1::<T> as FusedFn<T>),
            None,
        ]],
    )
}

/// Fused `y := beta y + alpha A^T w` and `z := z + alpha A x`.
///
/// Conjugation of A's two roles and of `w`/`x` comes from `conj`, composed
/// with any conjugation attribute already carried by the views.
#[allow(clippy::too_many_arguments)]
pub fn dotxaxpyf<T: Elem>(
    conj: FusedConj,
    alpha: &Scalar,
    a: &MatrixView<'_, T>,
    w: &MatrixView<'_, T>,
    x: &MatrixView<'_, T>,
    beta: &Scalar,
    y: &mut MatrixViewMut<'_, T>,
    z: &mut MatrixViewMut<'_, T>,
    ctx: &ExecContext,
    cntl: Option<&ControlNode>,
) -> Result<()> {
    typed::scalar_compat(OP, alpha, T::DTYPE, ctx)?;
    typed::scalar_compat(OP, beta, T::DTYPE, ctx)?;
    if ctx.diagnostics() {
        check::dotxaxpyf_check(OP, a, w, x, y, z)?;
    }

    let tbl = table::<T>();
    let (m, f) = a.logical_dims();
    let default_node;
    let node = match cntl {
        Some(n) => n,
        None => {
            default_node = cntl::default_tree(
                ctx.tree_policy(T::DTYPE),
                tbl.has(VAR1, ImplKind::Optimized),
                m.max(f),
                VAR1,
                VAR1,
            );
            &default_node
        }
    };
    node.validate(OP)?;

    if node.is_noop() || (alpha.is_zero() && beta.is_one()) {
        return Ok(());
    }
    // Any zero dimension empties both the reduction and the update, so the
    // kernel is never reached and y keeps its contents, beta included.
    if a.has_zero_dim() {
        return Ok(());
    }

    // Fold view-carried conjugation into the role switches.
    let conj = FusedConj {
        at: conj.at ^ a.is_conj(),
        a: conj.a ^ a.is_conj(),
        w: conj.w ^ w.is_conj(),
        x: conj.x ^ x.is_conj(),
    };

    let func = tbl.lookup(node.variant(), node.kind())?;
    trace!("dotxaxpyf: m={} f={} kind={:?}", m, f, node.kind());
    func(
        conj,
        T::from_scalar(*alpha),
        T::from_scalar(*beta),
        a,
        w,
        x,
        y,
        z,
        ctx,
    )
}

#[inline]
fn maybe_conj<T: Elem>(flag: bool, v: T) -> T {
    if flag {
        v.conj()
    } else {
        v
    }
}

/// Reference realization: the unfused composition, f dots then f axpys.
#[allow(clippy::too_many_arguments)]
fn ref_var1<T: Elem>(
    conj: FusedConj,
    alpha: T,
    beta: T,
    a: &MatrixView<'_, T>,
    w: &MatrixView<'_, T>,
    x: &MatrixView<'_, T>,
    y: &mut MatrixViewMut<'_, T>,
    z: &mut MatrixViewMut<'_, T>,
    _ctx: &ExecContext,
) -> Result<()> {
    let (m, f) = a.logical_dims();
    // The front end folded the view's conjugation flag into `conj`, so only
    // the transposition flag applies on access here.
    let aval = |i: usize, j: usize| if a.is_trans() { a.at(j, i) } else { a.at(i, j) };
    for j in 0..f {
        let mut dot = T::zero();
        for i in 0..m {
            dot = dot + maybe_conj(conj.at, aval(i, j)) * maybe_conj(conj.w, w.at(i, 0));
        }
        let yj = if beta.is_zero() {
            T::zero()
        } else {
            beta * y.at(j, 0)
        };
        y.set(j, 0, yj + alpha * dot);
    }
    for j in 0..f {
        let xj = maybe_conj(conj.x, x.at(j, 0));
        for i in 0..m {
            let zi = z.at(i, 0) + alpha * maybe_conj(conj.a, aval(i, j)) * xj;
            z.set(i, 0, zi);
        }
    }
    Ok(())
}

/// Optimized realization: panel A by the fusion factor and invoke the
/// per-datatype fused microkernel once per panel.
#[allow(clippy::too_many_arguments)]
fn opt_var1<T: Elem>(
    conj: FusedConj,
    alpha: T,
    beta: T,
    a: &MatrixView<'_, T>,
    w: &MatrixView<'_, T>,
    x: &MatrixView<'_, T>,
    y: &mut MatrixViewMut<'_, T>,
    z: &mut MatrixViewMut<'_, T>,
    ctx: &ExecContext,
) -> Result<()> {
    let (_m, f) = a.logical_dims();
    let fuse = ctx.blocking(T::DTYPE).fuse.max(1);
    let kernel = T::microkernels(ctx).dotxaxpyf;
    let mut j0 = 0;
    while j0 < f {
        let bf = fuse.min(f - j0);
        let ap = a.logical_col_block(j0, bf);
        let xp = x.subview(j0, 0, bf, 1);
        let mut yp = y.subview_mut(j0, 0, bf, 1);
        let mut zp = z.rb();
        kernel(ctx, conj, alpha, beta, &ap, w, &xp, &mut yp, &mut zp);
        j0 += bf;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Matrix;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    fn run_real(f: usize, fuse: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        use crate::context::Blocking;
        use crate::dtype::DataType;

        let m = 9;
        let a = Matrix::from_fn(m, f, |i, j| ((2 * i + 5 * j) % 7) as f64 - 3.0);
        let w: Vec<f64> = (0..m).map(|i| 0.5 * i as f64 - 2.0).collect();
        let x: Vec<f64> = (0..f).map(|j| 1.0 + j as f64).collect();
        let alpha = Scalar::F64(1.5);
        let beta = Scalar::F64(-0.5);

        let mut run = |ctx: &ExecContext, node: Option<&ControlNode>| {
            let mut yd: Vec<f64> = (0..f).map(|j| j as f64).collect();
            let mut zd: Vec<f64> = (0..m).map(|i| -(i as f64)).collect();
            {
                let av = a.view();
                let wv = MatrixView::vector(&w, m, 1, 0).unwrap();
                let xv = MatrixView::vector(&x, f, 1, 0).unwrap();
                let mut yv = MatrixViewMut::vector(&mut yd, f, 1, 0).unwrap();
                let mut zv = MatrixViewMut::vector(&mut zd, m, 1, 0).unwrap();
                dotxaxpyf(
                    FusedConj::default(),
                    &alpha,
                    &av,
                    &wv,
                    &xv,
                    &beta,
                    &mut yv,
                    &mut zv,
                    ctx,
                    node,
                )
                .unwrap();
            }
            (yd, zd)
        };

        let fast_ctx =
            ExecContext::new().with_blocking(DataType::F64, Blocking { block: 64, fuse });
        let (fy, fz) = run(&fast_ctx, None);

        let slow_ctx = ExecContext::new();
        let node = ControlNode::leaf(VAR1, ImplKind::Reference);
        let (ry, rz) = run(&slow_ctx, Some(&node));
        (fy, fz, ry, rz)
    }

    #[test]
    fn test_fused_matches_unfused_across_fusing_factors() {
        for f in [1, 2, 4, 8] {
            for fuse in [1, 2, 4] {
                let (fy, fz, ry, rz) = run_real(f, fuse);
                for (got, want) in fy.iter().zip(&ry) {
                    assert_relative_eq!(*got, *want, epsilon = 1e-12);
                }
                for (got, want) in fz.iter().zip(&rz) {
                    assert_relative_eq!(*got, *want, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_conjugation_roles_complex() {
        let ctx = ExecContext::new();
        let m = 4;
        let f = 2;
        let a = Matrix::from_fn(m, f, |i, j| Complex64::new(i as f64, j as f64 + 1.0));
        let w: Vec<Complex64> = (0..m).map(|i| Complex64::new(1.0, i as f64)).collect();
        let x: Vec<Complex64> = (0..f).map(|j| Complex64::new(j as f64, -1.0)).collect();
        let alpha = Scalar::C64(Complex64::new(1.0, 0.0));
        let beta = Scalar::C64(Complex64::new(0.0, 0.0));
        let conj = FusedConj {
            at: true,
            a: false,
            w: false,
            x: true,
        };

        let mut yd = vec![Complex64::new(7.0, 7.0); f];
        let mut zd = vec![Complex64::new(0.0, 0.0); m];
        {
            let av = a.view();
            let wv = MatrixView::vector(&w, m, 1, 0).unwrap();
            let xv = MatrixView::vector(&x, f, 1, 0).unwrap();
            let mut yv = MatrixViewMut::vector(&mut yd, f, 1, 0).unwrap();
            let mut zv = MatrixViewMut::vector(&mut zd, m, 1, 0).unwrap();
            dotxaxpyf(conj, &alpha, &av, &wv, &xv, &beta, &mut yv, &mut zv, &ctx, None).unwrap();
        }

        for j in 0..f {
            let want: Complex64 = (0..m).map(|i| a.get(i, j).conj() * w[i]).sum();
            assert_relative_eq!(yd[j].re, want.re, epsilon = 1e-12);
            assert_relative_eq!(yd[j].im, want.im, epsilon = 1e-12);
        }
        for i in 0..m {
            let want: Complex64 = (0..f).map(|j| a.get(i, j) * x[j].conj()).sum();
            assert_relative_eq!(zd[i].re, want.re, epsilon = 1e-12);
            assert_relative_eq!(zd[i].im, want.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_degenerate_scalars_leave_operands_alone() {
        let ctx = ExecContext::new();
        let a = Matrix::from_fn(3, 2, |i, j| (i + j) as f64);
        let w = vec![1.0f64; 3];
        let x = vec![1.0f64; 2];
        let mut yd = vec![5.0f64, 6.0];
        let mut zd = vec![7.0f64, 8.0, 9.0];
        {
            let av = a.view();
            let wv = MatrixView::vector(&w, 3, 1, 0).unwrap();
            let xv = MatrixView::vector(&x, 2, 1, 0).unwrap();
            let mut yv = MatrixViewMut::vector(&mut yd, 2, 1, 0).unwrap();
            let mut zv = MatrixViewMut::vector(&mut zd, 3, 1, 0).unwrap();
            dotxaxpyf(
                FusedConj::default(),
                &Scalar::F64(0.0),
                &av,
                &wv,
                &xv,
                &Scalar::F64(1.0),
                &mut yv,
                &mut zv,
                &ctx,
                None,
            )
            .unwrap();
        }
        assert_eq!(yd, vec![5.0, 6.0]);
        assert_eq!(zd, vec![7.0, 8.0, 9.0]);
        assert_eq!(ctx.counters().fused_calls(), 0);
    }

    #[test]
    fn test_zero_dim_skips_kernel_even_with_scaling_beta() {
        let ctx = ExecContext::new();
        let a = Matrix::from_fn(0, 2, |_, _| 0.0f64);
        let w: Vec<f64> = vec![];
        let x = vec![1.0f64; 2];
        let mut yd = vec![5.0f64, 6.0];
        let mut zd: Vec<f64> = vec![];
        {
            let av = a.view();
            let wv = MatrixView::vector(&w, 0, 1, 0).unwrap();
            let xv = MatrixView::vector(&x, 2, 1, 0).unwrap();
            let mut yv = MatrixViewMut::vector(&mut yd, 2, 1, 0).unwrap();
            let mut zv = MatrixViewMut::vector(&mut zd, 0, 1, 0).unwrap();
            dotxaxpyf(
                FusedConj::default(),
                &Scalar::F64(1.0),
                &av,
                &wv,
                &xv,
                &Scalar::F64(2.0),
                &mut yv,
                &mut zv,
                &ctx,
                None,
            )
            .unwrap();
        }
        // m == 0 elides the whole call: no kernel and no beta scaling of y.
        assert_eq!(yd, vec![5.0, 6.0]);
        assert_eq!(ctx.counters().fused_calls(), 0);
    }
}
