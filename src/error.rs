//! Error types for the dispatch engine.
//!
//! Two recoverable classes exist, mirroring the failure taxonomy of the
//! engine: *configuration* errors (a requested realization or type
//! combination was never registered) and *validation* errors (operand
//! shapes/strides/structure violate an operation's contract). Both are
//! detected before any operand is mutated, so callers may treat an `Err`
//! as "no side effect occurred".
//!
//! Failures after mutation has begun have no such guarantee and are not
//! representable here; they panic (there is no undo log).

use crate::cntl::ImplKind;
use crate::dtype::DataType;

/// Errors surfaced before an operation mutates any operand.
#[derive(Debug, thiserror::Error)]
pub enum ObError {
    /// No realization is registered for (variant, implementation kind).
    #[error("{op}: no realization for variant {variant} ({kind:?})")]
    MissingRealization {
        op: &'static str,
        variant: usize,
        kind: ImplKind,
    },

    /// Variant index outside the operation's dispatch table.
    #[error("{op}: variant {variant} out of range (table has {nvars})")]
    UnknownVariant {
        op: &'static str,
        variant: usize,
        nvars: usize,
    },

    /// A heterogeneous (domain, precision) combination that is not enabled
    /// in the execution context.
    #[error("{op}: type combination {found:?} -> {requested:?} is not enabled")]
    UnsupportedTypes {
        op: &'static str,
        found: DataType,
        requested: DataType,
    },

    /// A control tree violating the node invariants (blocked node without a
    /// child, leaf node with one, or excessive depth).
    #[error("{op}: invalid control tree: {reason}")]
    BadControlTree {
        op: &'static str,
        reason: &'static str,
    },

    /// Operand dimensions do not conform.
    #[error("{op}: dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        op: &'static str,
        expected: usize,
        found: usize,
    },

    /// A structural marker requiring squareness applied to an m x n operand.
    #[error("{op}: operand must be square, got {m} x {n}")]
    NotSquare {
        op: &'static str,
        m: usize,
        n: usize,
    },

    /// A triangular/symmetric/Hermitian operand without a declared uplo.
    #[error("{op}: structured operand has no upper/lower marker")]
    MissingUplo { op: &'static str },

    /// Operand structure unsupported by the operation.
    #[error("{op}: unsupported structural marker {found}")]
    BadStructure { op: &'static str, found: &'static str },

    /// A Hermitian update requires a real scaling factor.
    #[error("{op}: scalar must be real for a Hermitian operand")]
    NonRealScalar { op: &'static str },

    /// Dimensions, strides and offset would address memory outside the
    /// backing buffer.
    #[error("view walks outside the backing buffer")]
    OffsetOverflow,
}

/// Coarse classification matching the engine's error taxonomy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Absent dispatch entry or unregistered type combination; fatal to the
    /// request, never retried.
    Configuration,
    /// Operand contract violation, caught by the validation collaborator.
    Validation,
}

impl ObError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ObError::MissingRealization { .. }
            | ObError::UnknownVariant { .. }
            | ObError::UnsupportedTypes { .. }
            | ObError::BadControlTree { .. } => ErrorClass::Configuration,
            ObError::DimensionMismatch { .. }
            | ObError::NotSquare { .. }
            | ObError::MissingUplo { .. }
            | ObError::BadStructure { .. }
            | ObError::NonRealScalar { .. }
            | ObError::OffsetOverflow => ErrorClass::Validation,
        }
    }
}

/// Convenience alias for `Result<T, ObError>`.
pub type Result<T> = std::result::Result<T, ObError>;
