//! Per-operation dispatch tables.
//!
//! Each operation owns a fixed V x 3 array mapping (variant, implementation
//! kind) to a callable realization. An absent cell means the combination was
//! never registered; looking it up is a configuration error, reported before
//! any operand is touched. The table is the single seam for adding algorithm
//! variants or hardware-optimized realizations: one new cell, optionally one
//! new control-node template that selects it.

use crate::cntl::{ImplKind, Variant};
use crate::error::{ObError, Result};

/// Fixed-size (variant, kind) -> callable mapping for one operation.
pub struct DispatchTable<F, const V: usize> {
    op: &'static str,
    entries: [[Option<F>; ImplKind::COUNT]; V],
}

impl<F: Copy, const V: usize> DispatchTable<F, V> {
    pub const fn new(op: &'static str, entries: [[Option<F>; ImplKind::COUNT]; V]) -> Self {
        DispatchTable { op, entries }
    }

    /// Pure lookup; absence is a configuration error, distinct from any
    /// runtime/data error.
    pub fn lookup(&self, variant: Variant, kind: ImplKind) -> Result<F> {
        let row = self
            .entries
            .get(variant.0)
            .ok_or(ObError::UnknownVariant {
                op: self.op,
                variant: variant.0,
                nvars: V,
            })?;
        row[kind.index()].ok_or(ObError::MissingRealization {
            op: self.op,
            variant: variant.0,
            kind,
        })
    }

    /// Whether a realization is registered (drives the default-tree policy).
    pub fn has(&self, variant: Variant, kind: ImplKind) -> bool {
        self.entries
            .get(variant.0)
            .map(|row| row[kind.index()].is_some())
            .unwrap_or(false)
    }
}
