//! Index of the element with the largest absolute value.
//!
//! A reduction front end with a single registered realization, so it skips
//! the table and calls its variant directly. Complex magnitudes use the
//! |re| + |im| norm, which avoids the square root and matches the classic
//! BLAS convention. Ties resolve to the lowest index; an empty vector
//! yields index 0.

use crate::check;
use crate::context::ExecContext;
use crate::dtype::Elem;
use crate::error::Result;
use crate::object::MatrixView;

const OP: &str = "amaxv";

pub fn amaxv<T: Elem>(x: &MatrixView<'_, T>, ctx: &ExecContext) -> Result<usize> {
    if ctx.diagnostics() {
        check::amaxv_check(OP, x)?;
    }
    Ok(unb_var1(x))
}

fn unb_var1<T: Elem>(x: &MatrixView<'_, T>) -> usize {
    let mut best = 0usize;
    let mut best_mag = f64::NEG_INFINITY;
    for i in 0..x.len() {
        let mag = x.at(i, 0).abs1();
        if mag > best_mag {
            best_mag = mag;
            best = i;
        }
    }
    best
}
