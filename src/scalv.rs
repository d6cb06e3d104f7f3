//! Vector scaling front end: x := beta * x.
//!
//! The front end owns degeneracy elision: a no-op tree, a zero-length
//! operand, or beta == 1 all return before the dispatch table is even
//! consulted, so a unit scaling leaves the operand bit-identical and the
//! kernel counters untouched.

use log::trace;

use crate::check;
use crate::cntl::{self, ControlNode, ImplKind, Variant};
use crate::context::ExecContext;
use crate::dispatch::DispatchTable;
use crate::dtype::{Elem, Scalar};
use crate::error::Result;
use crate::object::MatrixViewMut;
use crate::typed;

const OP: &str = "scalv";

/// The single algorithm family: one pass over the vector.
pub const VAR1: Variant = Variant(0);
const NVARS: usize = 1;

type ScalvFn<T> =
    fn(T, &mut MatrixViewMut<'_, T>, &ExecContext, &ControlNode) -> Result<()>;

fn table<T: Elem>() -> DispatchTable<ScalvFn<T>, NVARS> {
    DispatchTable::new(
        OP,
        [[
            Some(unb_var1::<T> as ScalvFn<T>),
            Some(opt_var1::<T> as ScalvFn<T>),
            None,
        ]],
    )
}

/// Scale `x` in place by `beta`.
///
/// `cntl` overrides the context's default control tree; `None` builds one
/// from the datatype's tree policy.
pub fn scalv<T: Elem>(
    beta: &Scalar,
    x: &mut MatrixViewMut<'_, T>,
    ctx: &ExecContext,
    cntl: Option<&ControlNode>,
) -> Result<()> {
    typed::scalar_compat(OP, beta, T::DTYPE, ctx)?;
    if ctx.diagnostics() {
        check::scalv_check(OP, x)?;
    }

    let tbl = table::<T>();
    let default_node;
    let node = match cntl {
        Some(n) => n,
        None => {
            default_node = cntl::default_tree(
                ctx.tree_policy(T::DTYPE),
                tbl.has(VAR1, ImplKind::Optimized),
                x.len(),
                VAR1,
                VAR1,
            );
            &default_node
        }
    };
    node.validate(OP)?;

    if node.is_noop() || x.has_zero_dim() || beta.is_one() {
        return Ok(());
    }

    let f = tbl.lookup(node.variant(), node.kind())?;
    trace!(
        "scalv: n={} variant={} kind={:?}",
        x.len(),
        node.variant().0,
        node.kind()
    );
    f(T::from_scalar(*beta), x, ctx, node)
}

/// Reference loop, one element at a time.
fn unb_var1<T: Elem>(
    beta: T,
    x: &mut MatrixViewMut<'_, T>,
    _ctx: &ExecContext,
    _cntl: &ControlNode,
) -> Result<()> {
    for i in 0..x.len() {
        let v = x.at(i, 0);
        x.set(i, 0, beta * v);
    }
    Ok(())
}

/// Kernel-backed realization.
fn opt_var1<T: Elem>(
    beta: T,
    x: &mut MatrixViewMut<'_, T>,
    ctx: &ExecContext,
    _cntl: &ControlNode,
) -> Result<()> {
    (T::microkernels(ctx).scalv)(ctx, beta, x);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObError;

    #[test]
    fn test_unit_scalar_is_elided() {
        let ctx = ExecContext::new();
        let mut data = vec![1.5f64, -2.5, 3.25];
        let before = data.clone();
        let mut x = MatrixViewMut::vector(&mut data, 3, 1, 0).unwrap();
        scalv(&Scalar::F64(1.0), &mut x, &ctx, None).unwrap();
        assert_eq!(data, before);
        assert_eq!(ctx.counters().scalv_calls(), 0);
    }

    #[test]
    fn test_scales_through_kernel() {
        let ctx = ExecContext::new();
        let mut data = vec![1.0f64, 2.0, 3.0, 4.0];
        let mut x = MatrixViewMut::vector(&mut data, 4, 1, 0).unwrap();
        scalv(&Scalar::F64(2.0), &mut x, &ctx, None).unwrap();
        assert_eq!(data, vec![2.0, 4.0, 6.0, 8.0]);
        assert_eq!(ctx.counters().scalv_calls(), 1);
    }

    #[test]
    fn test_reference_tree_bypasses_kernel() {
        let ctx = ExecContext::new();
        let mut data = vec![1.0f32, 2.0];
        let mut x = MatrixViewMut::vector(&mut data, 2, 1, 0).unwrap();
        let node = ControlNode::leaf(VAR1, ImplKind::Reference);
        scalv(&Scalar::F32(3.0), &mut x, &ctx, Some(&node)).unwrap();
        assert_eq!(data, vec![3.0, 6.0]);
        assert_eq!(ctx.counters().scalv_calls(), 0);
    }

    #[test]
    fn test_unregistered_blocked_kind_is_config_error() {
        let ctx = ExecContext::new();
        let mut data = vec![1.0f64; 4];
        let mut x = MatrixViewMut::vector(&mut data, 4, 1, 0).unwrap();
        // The tree shape is valid, but no blocked realization was ever
        // registered for this operation.
        let node = ControlNode::blocked(VAR1, None, ControlNode::leaf(VAR1, ImplKind::Reference));
        let err = scalv(&Scalar::F64(2.0), &mut x, &ctx, Some(&node)).unwrap_err();
        assert!(matches!(err, ObError::MissingRealization { .. }));
        assert_eq!(data, vec![1.0; 4]);
    }

    #[test]
    fn test_negative_stride_view() {
        let ctx = ExecContext::new();
        let mut data: Vec<f64> = (0..9).map(f64::from).collect();
        let mut x = MatrixViewMut::vector(&mut data, 3, -4, 8).unwrap();
        scalv(&Scalar::F64(10.0), &mut x, &ctx, None).unwrap();
        assert_eq!(data[8], 80.0);
        assert_eq!(data[4], 40.0);
        assert_eq!(data[0], 0.0);
        assert_eq!(data[1], 1.0);
    }
}
