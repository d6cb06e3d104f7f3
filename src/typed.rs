//! Runtime type binding: datatype-tagged operand wrappers that resolve to
//! the generic realizations, plus the admission rules for mixed-type
//! invocations.
//!
//! Homogeneous calls bind directly. Heterogeneous calls are admitted only
//! when the context enables the relevant mixing axis (domain, precision)
//! and the input promotes losslessly to the output's type; the input is
//! then copied once into the output's element type and the homogeneous
//! path runs on the copy. Demotion is never admitted.

use crate::cntl::ControlNode;
use crate::context::ExecContext;
use crate::dtype::{DataType, Domain, Elem, Precision, Scalar};
use crate::error::{ObError, Result};
use crate::herk;
use crate::object::{Matrix, MatrixView, MatrixViewMut};
use crate::scalv;

// ============================================================================
// Tagged operand wrappers
// ============================================================================

/// A read-only matrix operand tagged with its runtime datatype.
pub enum TypedMatrix<'a> {
    F32(MatrixView<'a, f32>),
    F64(MatrixView<'a, f64>),
    C32(MatrixView<'a, num_complex::Complex32>),
    C64(MatrixView<'a, num_complex::Complex64>),
}

/// A mutable matrix operand tagged with its runtime datatype.
pub enum TypedMatrixMut<'a> {
    F32(MatrixViewMut<'a, f32>),
    F64(MatrixViewMut<'a, f64>),
    C32(MatrixViewMut<'a, num_complex::Complex32>),
    C64(MatrixViewMut<'a, num_complex::Complex64>),
}

/// A mutable vector operand tagged with its runtime datatype.
pub enum TypedVectorMut<'a> {
    F32(MatrixViewMut<'a, f32>),
    F64(MatrixViewMut<'a, f64>),
    C32(MatrixViewMut<'a, num_complex::Complex32>),
    C64(MatrixViewMut<'a, num_complex::Complex64>),
}

impl TypedMatrix<'_> {
    pub fn dtype(&self) -> DataType {
        match self {
            TypedMatrix::F32(_) => DataType::F32,
            TypedMatrix::F64(_) => DataType::F64,
            TypedMatrix::C32(_) => DataType::C32,
            TypedMatrix::C64(_) => DataType::C64,
        }
    }
}

impl TypedMatrixMut<'_> {
    pub fn dtype(&self) -> DataType {
        match self {
            TypedMatrixMut::F32(_) => DataType::F32,
            TypedMatrixMut::F64(_) => DataType::F64,
            TypedMatrixMut::C32(_) => DataType::C32,
            TypedMatrixMut::C64(_) => DataType::C64,
        }
    }
}

impl TypedVectorMut<'_> {
    pub fn dtype(&self) -> DataType {
        match self {
            TypedVectorMut::F32(_) => DataType::F32,
            TypedVectorMut::F64(_) => DataType::F64,
            TypedVectorMut::C32(_) => DataType::C32,
            TypedVectorMut::C64(_) => DataType::C64,
        }
    }
}

// ============================================================================
// Admission rules
// ============================================================================

/// Scalar-against-operand compatibility.
///
/// A real scalar embeds losslessly in a complex operand and is always
/// admitted; the Hermitian update's contract even requires that pairing
/// (real alpha, complex C). The lossy direction, a complex scalar meeting
/// a real operand, needs the mixed-domain gate and keeps the real part in
/// [`Elem::from_scalar`]. Precision mixing needs its own gate either way.
pub(crate) fn scalar_compat(
    op: &'static str,
    s: &Scalar,
    dst: DataType,
    ctx: &ExecContext,
) -> Result<()> {
    let sd = s.dtype();
    if sd == dst {
        return Ok(());
    }
    let lossy_domain = sd.domain() == Domain::Complex && dst.domain() == Domain::Real;
    if lossy_domain && !ctx.mixed_domain() {
        return Err(ObError::UnsupportedTypes {
            op,
            found: sd,
            requested: dst,
        });
    }
    if sd.precision() != dst.precision() && !ctx.mixed_precision() {
        return Err(ObError::UnsupportedTypes {
            op,
            found: sd,
            requested: dst,
        });
    }
    Ok(())
}

/// Can `from` promote losslessly to `to`? Real embeds into complex and
/// single widens to double; the reverse directions never do.
fn promotable(from: DataType, to: DataType) -> bool {
    let dom_ok = match (from.domain(), to.domain()) {
        (Domain::Real, _) => true,
        (Domain::Complex, Domain::Complex) => true,
        (Domain::Complex, Domain::Real) => false,
    };
    let prec_ok = match (from.precision(), to.precision()) {
        (Precision::Single, _) => true,
        (Precision::Double, Precision::Double) => true,
        (Precision::Double, Precision::Single) => false,
    };
    dom_ok && prec_ok
}

fn operand_compat(
    op: &'static str,
    from: DataType,
    to: DataType,
    ctx: &ExecContext,
) -> Result<()> {
    if from.domain() != to.domain() && !ctx.mixed_domain() {
        return Err(ObError::UnsupportedTypes {
            op,
            found: from,
            requested: to,
        });
    }
    if from.precision() != to.precision() && !ctx.mixed_precision() {
        return Err(ObError::UnsupportedTypes {
            op,
            found: from,
            requested: to,
        });
    }
    if !promotable(from, to) {
        return Err(ObError::UnsupportedTypes {
            op,
            found: from,
            requested: to,
        });
    }
    Ok(())
}

// ============================================================================
// Promotion by copy
// ============================================================================

fn convert_matrix<S: Elem, T: Elem>(v: &MatrixView<'_, S>) -> Matrix<T> {
    let (m, k) = v.logical_dims();
    // at_logical folds the view's transpose/conjugation attributes into the
    // copy, so the promoted view carries none.
    Matrix::from_fn(m, k, |i, j| T::from_scalar(v.at_logical(i, j).to_scalar()))
}

fn promote_matrix<T: Elem>(a: &TypedMatrix<'_>) -> Matrix<T> {
    match a {
        TypedMatrix::F32(v) => convert_matrix(v),
        TypedMatrix::F64(v) => convert_matrix(v),
        TypedMatrix::C32(v) => convert_matrix(v),
        TypedMatrix::C64(v) => convert_matrix(v),
    }
}

// ============================================================================
// Bound operations
// ============================================================================

/// Scale a tagged vector in place.
pub fn scalv_typed(
    beta: &Scalar,
    x: &mut TypedVectorMut<'_>,
    ctx: &ExecContext,
    cntl: Option<&ControlNode>,
) -> Result<()> {
    match x {
        TypedVectorMut::F32(v) => scalv::scalv(beta, v, ctx, cntl),
        TypedVectorMut::F64(v) => scalv::scalv(beta, v, ctx, cntl),
        TypedVectorMut::C32(v) => scalv::scalv(beta, v, ctx, cntl),
        TypedVectorMut::C64(v) => scalv::scalv(beta, v, ctx, cntl),
    }
}

/// Rank-k update of a tagged structured matrix by a tagged input.
///
/// A mismatched input type is promoted by copy into `c`'s element type when
/// the context admits that combination.
pub fn herk_typed(
    alpha: &Scalar,
    a: &TypedMatrix<'_>,
    c: &mut TypedMatrixMut<'_>,
    ctx: &ExecContext,
    cntl: Option<&ControlNode>,
) -> Result<()> {
    const OP: &str = "herk";

    if a.dtype() == c.dtype() {
        return match (a, c) {
            (TypedMatrix::F32(av), TypedMatrixMut::F32(cv)) => herk::herk(alpha, av, cv, ctx, cntl),
            (TypedMatrix::F64(av), TypedMatrixMut::F64(cv)) => herk::herk(alpha, av, cv, ctx, cntl),
            (TypedMatrix::C32(av), TypedMatrixMut::C32(cv)) => herk::herk(alpha, av, cv, ctx, cntl),
            (TypedMatrix::C64(av), TypedMatrixMut::C64(cv)) => herk::herk(alpha, av, cv, ctx, cntl),
            _ => unreachable!("tags matched above"),
        };
    }

    operand_compat(OP, a.dtype(), c.dtype(), ctx)?;
    match c {
        TypedMatrixMut::F32(cv) => {
            let p: Matrix<f32> = promote_matrix(a);
            herk::herk(alpha, &p.view(), cv, ctx, cntl)
        }
        TypedMatrixMut::F64(cv) => {
            let p: Matrix<f64> = promote_matrix(a);
            herk::herk(alpha, &p.view(), cv, ctx, cntl)
        }
        TypedMatrixMut::C32(cv) => {
            let p: Matrix<num_complex::Complex32> = promote_matrix(a);
            herk::herk(alpha, &p.view(), cv, ctx, cntl)
        }
        TypedMatrixMut::C64(cv) => {
            let p: Matrix<num_complex::Complex64> = promote_matrix(a);
            herk::herk(alpha, &p.view(), cv, ctx, cntl)
        }
    }
}

// ============================================================================
// Mixed-precision reductions
// ============================================================================

/// Dot product of two single-precision vectors accumulated in double
/// precision, returned as a double. The one member of the family whose
/// accumulation type differs from its storage type.
pub fn dsdot(x: &MatrixView<'_, f32>, y: &MatrixView<'_, f32>) -> Result<f64> {
    if x.len() != y.len() {
        return Err(ObError::DimensionMismatch {
            op: "dsdot",
            expected: x.len(),
            found: y.len(),
        });
    }
    let mut acc = 0.0f64;
    for i in 0..x.len() {
        acc += f64::from(x.at(i, 0)) * f64::from(y.at(i, 0));
    }
    Ok(acc)
}

/// Same accumulation as [`dsdot`] plus an initial single-precision addend,
/// rounded back to single at the end.
pub fn sdsdot(sb: f32, x: &MatrixView<'_, f32>, y: &MatrixView<'_, f32>) -> Result<f32> {
    Ok((f64::from(sb) + dsdot(x, y)?) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Struc, Uplo};
    use approx::assert_relative_eq;

    #[test]
    fn test_homogeneous_mismatch_rejected_by_default() {
        let ctx = ExecContext::new();
        let err = scalar_compat("scalv", &Scalar::F32(2.0), DataType::F64, &ctx).unwrap_err();
        assert!(matches!(err, ObError::UnsupportedTypes { .. }));
    }

    #[test]
    fn test_mixed_precision_scalar_admitted_when_enabled() {
        let ctx = ExecContext::new().with_mixed_precision(true);
        scalar_compat("scalv", &Scalar::F32(2.0), DataType::F64, &ctx).unwrap();
    }

    #[test]
    fn test_real_scalar_on_complex_operand_needs_no_gate() {
        // The Hermitian update takes a real alpha against a complex C, so
        // the lossless embedding must pass with every mixing gate closed.
        let ctx = ExecContext::new();
        scalar_compat("herk", &Scalar::F64(1.0), DataType::C64, &ctx).unwrap();
        scalar_compat("scalv", &Scalar::F32(2.0), DataType::C32, &ctx).unwrap();
        // The lossy direction still needs the gate.
        let err = scalar_compat(
            "scalv",
            &Scalar::C64(num_complex::Complex64::new(1.0, 2.0)),
            DataType::F64,
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, ObError::UnsupportedTypes { .. }));
        // Precision mixing is a separate axis even for the embedding.
        let err = scalar_compat("scalv", &Scalar::F64(1.0), DataType::C32, &ctx).unwrap_err();
        assert!(matches!(err, ObError::UnsupportedTypes { .. }));
    }

    #[test]
    fn test_promotion_rules() {
        assert!(promotable(DataType::F32, DataType::C64));
        assert!(promotable(DataType::F64, DataType::C64));
        assert!(promotable(DataType::C32, DataType::C64));
        assert!(!promotable(DataType::C64, DataType::F64));
        assert!(!promotable(DataType::F64, DataType::F32));
    }

    #[test]
    fn test_herk_promotes_real_input_into_complex_output() {
        use num_complex::Complex64;
        let ctx = ExecContext::new().with_mixed_domain(true);
        let m = 3;
        let a = Matrix::from_fn(m, 2, |i, j| (i + 2 * j) as f64);
        let mut c = Matrix::<Complex64>::zeros(m, m);
        {
            let av = TypedMatrix::F64(a.view());
            let mut cv = TypedMatrixMut::C64(
                c.view_mut().with_struc(Struc::Hermitian, Some(Uplo::Lower)),
            );
            herk_typed(&Scalar::F64(1.0), &av, &mut cv, &ctx, None).unwrap();
        }
        for i in 0..m {
            for j in 0..=i {
                let want: f64 = (0..2).map(|p| a.get(i, p) * a.get(j, p)).sum();
                assert_relative_eq!(c.get(i, j).re, want, epsilon = 1e-12);
                assert_eq!(c.get(i, j).im, 0.0);
            }
        }
    }

    #[test]
    fn test_herk_rejects_demotion_even_when_mixing_enabled() {
        use num_complex::Complex64;
        let ctx = ExecContext::new()
            .with_mixed_domain(true)
            .with_mixed_precision(true);
        let a = Matrix::from_fn(2, 2, |i, j| Complex64::new(i as f64, j as f64));
        let mut c = Matrix::<f64>::zeros(2, 2);
        {
            let av = TypedMatrix::C64(a.view());
            let mut cv = TypedMatrixMut::F64(
                c.view_mut().with_struc(Struc::Symmetric, Some(Uplo::Lower)),
            );
            let err = herk_typed(&Scalar::F64(1.0), &av, &mut cv, &ctx, None).unwrap_err();
            assert!(matches!(err, ObError::UnsupportedTypes { .. }));
        }
        assert!(c.data().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_dsdot_accumulates_in_double() {
        // Products below single-precision resolution of the running sum
        // survive double accumulation.
        let x = vec![1.0e4f32; 3];
        let y = vec![1.0e4f32, 1.0e-4, 1.0e-4];
        let xv = MatrixView::vector(&x, 3, 1, 0).unwrap();
        let yv = MatrixView::vector(&y, 3, 1, 0).unwrap();
        let got = dsdot(&xv, &yv).unwrap();
        assert_relative_eq!(got, 1.0e8 + 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sdsdot_adds_offset_before_rounding() {
        let x = vec![1.0e4f32; 3];
        let y = vec![1.0e4f32, 1.0e-4, 1.0e-4];
        let xv = MatrixView::vector(&x, 3, 1, 0).unwrap();
        let yv = MatrixView::vector(&y, 3, 1, 0).unwrap();
        // The addend joins the double-precision sum before the final rounding.
        let got = sdsdot(5.0, &xv, &yv).unwrap();
        assert_relative_eq!(got, (1.0e8f64 + 7.0) as f32);
        let err = sdsdot(0.0, &xv, &MatrixView::vector(&y, 2, 1, 0).unwrap()).unwrap_err();
        assert!(matches!(err, ObError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_scalv_typed_binds_each_tag() {
        let ctx = ExecContext::new();
        let mut data = vec![1.0f32, 2.0];
        {
            let v = MatrixViewMut::vector(&mut data, 2, 1, 0).unwrap();
            let mut x = TypedVectorMut::F32(v);
            scalv_typed(&Scalar::F32(4.0), &mut x, &ctx, None).unwrap();
        }
        assert_eq!(data, vec![4.0, 8.0]);
    }
}
