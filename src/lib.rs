//! Object-based dispatch engine for dense linear algebra.
//!
//! Operations are invoked on type-erased operand views and resolved at
//! runtime: a front end elides degenerate cases, an execution context
//! supplies blocking parameters and microkernel bindings, a control tree
//! chooses between reference, optimized and blocked realizations, and a
//! dispatch table maps (variant, kind) pairs onto concrete functions.
//!
//! # Core Types
//!
//! - [`MatrixView`] / [`MatrixViewMut`]: zero-copy strided operand views
//!   carrying structure, triangle, transpose and conjugation attributes
//! - [`ExecContext`]: blocking parameters, tree policy, thread count and
//!   per-datatype microkernel bindings for one invocation
//! - [`ControlNode`]: a tree selecting the algorithm family and
//!   realization kind at each blocking level
//! - [`Scalar`] / [`DataType`] / [`TypedMatrix`]: the runtime face of the
//!   closed element-type set
//!
//! # Operations
//!
//! - [`scalv`]: in-place vector scaling with full degeneracy elision
//! - [`herk`]: symmetric/Hermitian rank-k update, blocked and parallel
//! - [`dotxaxpyf`]: fused dot/axpy family over packed column panels
//! - [`amaxv`]: index of the largest absolute value
//! - [`compat`]: the legacy flat-array calling convention
//!
//! # Example
//!
//! ```rust
//! use obla::{scalv, ExecContext, MatrixViewMut, Scalar};
//!
//! let ctx = ExecContext::new();
//! let mut data = vec![1.0f64, 2.0, 3.0];
//! let mut x = MatrixViewMut::vector(&mut data, 3, 1, 0)?;
//! scalv(&Scalar::F64(2.0), &mut x, &ctx, None)?;
//! assert_eq!(data, vec![2.0, 4.0, 6.0]);
//! # Ok::<(), obla::ObError>(())
//! ```

pub mod amaxv;
mod check;
pub mod cntl;
pub mod compat;
pub mod context;
pub mod dispatch;
pub mod dtype;
pub mod error;
pub mod fused;
pub mod herk;
pub mod kernels;
pub mod object;
pub mod scalv;
mod threading;
pub mod typed;

pub use amaxv::amaxv;
pub use cntl::{default_tree, ControlNode, ImplKind, TreePolicy, Variant};
pub use context::{Blocking, ExecContext, KernelCounters, DEFAULT_BLOCK, DEFAULT_FUSE};
pub use dispatch::DispatchTable;
pub use dtype::{DataType, Domain, Elem, Precision, Scalar};
pub use error::{ErrorClass, ObError, Result};
pub use fused::dotxaxpyf;
pub use herk::herk;
pub use kernels::{FusedConj, Microkernels};
pub use object::{Matrix, MatrixView, MatrixViewMut, ObjAttrs, Struc, Uplo};
pub use scalv::scalv;
pub use typed::{dsdot, herk_typed, scalv_typed, TypedMatrix, TypedMatrixMut, TypedVectorMut};
