//! Operand validation, shared by the operation front ends.
//!
//! Every check runs before the first operand element is written, so a
//! returned error guarantees that no operand was mutated. Front ends skip
//! these checks when the context has diagnostics disabled.

use crate::dtype::{Elem, Scalar};
use crate::error::{ObError, Result};
use crate::object::{MatrixView, MatrixViewMut, Struc};

/// `x := beta * x` operates on a vector view (a single storage column).
pub(crate) fn scalv_check<T>(op: &'static str, x: &MatrixViewMut<'_, T>) -> Result<()> {
    expect_vector(op, x.m(), x.n())
}

pub(crate) fn amaxv_check<T>(op: &'static str, x: &MatrixView<'_, T>) -> Result<()> {
    expect_vector(op, x.m(), x.n())
}

/// Rank-k update contract: `C` square with a declared triangle, logical row
/// count of `A` matching `C`, and a real scalar whenever `C` is Hermitian.
pub(crate) fn herk_check<T: Elem>(
    op: &'static str,
    alpha: &Scalar,
    a: &MatrixView<'_, T>,
    c: &MatrixViewMut<'_, T>,
) -> Result<()> {
    if c.m() != c.n() {
        return Err(ObError::NotSquare {
            op,
            m: c.m(),
            n: c.n(),
        });
    }
    match c.struc() {
        Struc::Symmetric | Struc::Hermitian => {}
        Struc::General => {
            return Err(ObError::BadStructure {
                op,
                found: "general",
            })
        }
        Struc::Triangular => {
            return Err(ObError::BadStructure {
                op,
                found: "triangular",
            })
        }
        Struc::Diagonal => {
            return Err(ObError::BadStructure {
                op,
                found: "diagonal",
            })
        }
    }
    if c.uplo().is_none() {
        return Err(ObError::MissingUplo { op });
    }
    let (am, _k) = a.logical_dims();
    if am != c.m() {
        return Err(ObError::DimensionMismatch {
            op,
            expected: c.m(),
            found: am,
        });
    }
    if c.struc() == Struc::Hermitian && !alpha.is_real() {
        return Err(ObError::NonRealScalar { op });
    }
    Ok(())
}

/// Fused dot/axpy family: `A` is m x f, `w`/`z` have length m, `x`/`y`
/// have length f.
pub(crate) fn dotxaxpyf_check<T>(
    op: &'static str,
    a: &MatrixView<'_, T>,
    w: &MatrixView<'_, T>,
    x: &MatrixView<'_, T>,
    y: &MatrixViewMut<'_, T>,
    z: &MatrixViewMut<'_, T>,
) -> Result<()> {
    expect_vector(op, w.m(), w.n())?;
    expect_vector(op, x.m(), x.n())?;
    expect_vector(op, y.m(), y.n())?;
    expect_vector(op, z.m(), z.n())?;
    let (m, f) = a.logical_dims();
    for (found, expected) in [(w.len(), m), (z.len(), m), (x.len(), f), (y.len(), f)] {
        if found != expected {
            return Err(ObError::DimensionMismatch {
                op,
                expected,
                found,
            });
        }
    }
    Ok(())
}

fn expect_vector(op: &'static str, _m: usize, n: usize) -> Result<()> {
    if n != 1 {
        return Err(ObError::DimensionMismatch {
            op,
            expected: 1,
            found: n,
        });
    }
    Ok(())
}
