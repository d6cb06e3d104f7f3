//! The execution context: architecture-scoped blocking parameters and
//! microkernel references, shared read-only across an entire operation
//! invocation and all its recursive sub-calls.
//!
//! The original design kept this as process-global state behind an
//! init/teardown pair; here it is an explicitly constructed object passed by
//! reference into every front end, which makes the read-only sharing (and
//! hence thread safety) a property of the type rather than a convention. An
//! operation cannot execute without one, so the "initialized before use"
//! precondition holds by construction.

use std::sync::atomic::{AtomicU64, Ordering};

use num_complex::{Complex32, Complex64};

use crate::cntl::TreePolicy;
use crate::dtype::DataType;
use crate::kernels::Microkernels;

/// Default cache-block size per datatype. A tuning value, not a correctness
/// requirement.
pub const DEFAULT_BLOCK: usize = 64;

/// Default register-blocking width of the fused kernel.
pub const DEFAULT_FUSE: usize = 4;

/// Per-datatype blocking parameters.
#[derive(Copy, Clone, Debug)]
pub struct Blocking {
    /// Partition width for blocked realizations.
    pub block: usize,
    /// Fusing factor handed to the fused dot/axpy kernel.
    pub fuse: usize,
}

impl Default for Blocking {
    fn default() -> Self {
        Blocking {
            block: DEFAULT_BLOCK,
            fuse: DEFAULT_FUSE,
        }
    }
}

/// Atomic microkernel invocation counters.
///
/// Instrumentation only: tests assert that elided operations never reach a
/// kernel. Interior mutability keeps the context itself immutable.
#[derive(Debug, Default)]
pub struct KernelCounters {
    scalv: AtomicU64,
    fused: AtomicU64,
}

impl KernelCounters {
    #[inline]
    pub fn bump_scalv(&self) {
        self.scalv.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn bump_fused(&self) {
        self.fused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scalv_calls(&self) -> u64 {
        self.scalv.load(Ordering::Relaxed)
    }

    pub fn fused_calls(&self) -> u64 {
        self.fused.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.scalv.store(0, Ordering::Relaxed);
        self.fused.store(0, Ordering::Relaxed);
    }
}

/// Immutable bundle of blocking parameters, selection policy, type-mixing
/// configuration and microkernel references.
///
/// Never mutated after construction; safe for concurrent read by all worker
/// threads of an invocation.
pub struct ExecContext {
    blocking: [Blocking; DataType::COUNT],
    policy: [TreePolicy; DataType::COUNT],
    nthreads: usize,
    diagnostics: bool,
    mixed_domain: bool,
    mixed_precision: bool,
    pub(crate) mk_f32: Microkernels<f32>,
    pub(crate) mk_f64: Microkernels<f64>,
    pub(crate) mk_c32: Microkernels<Complex32>,
    pub(crate) mk_c64: Microkernels<Complex64>,
    counters: KernelCounters,
}

impl Default for ExecContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecContext {
    pub fn new() -> Self {
        ExecContext {
            blocking: [Blocking::default(); DataType::COUNT],
            policy: [TreePolicy {
                block_threshold: DEFAULT_BLOCK,
            }; DataType::COUNT],
            nthreads: 1,
            diagnostics: true,
            mixed_domain: false,
            mixed_precision: false,
            mk_f32: Microkernels::default(),
            mk_f64: Microkernels::default(),
            mk_c32: Microkernels::default(),
            mk_c64: Microkernels::default(),
            counters: KernelCounters::default(),
        }
    }

    pub fn with_nthreads(mut self, nthreads: usize) -> Self {
        self.nthreads = nthreads.max(1);
        self
    }

    /// Enable/disable the validation collaborator.
    pub fn with_diagnostics(mut self, on: bool) -> Self {
        self.diagnostics = on;
        self
    }

    /// Enable heterogeneous real/complex operand combinations.
    pub fn with_mixed_domain(mut self, on: bool) -> Self {
        self.mixed_domain = on;
        self
    }

    /// Enable heterogeneous single/double operand combinations.
    pub fn with_mixed_precision(mut self, on: bool) -> Self {
        self.mixed_precision = on;
        self
    }

    pub fn with_blocking(mut self, dtype: DataType, blocking: Blocking) -> Self {
        self.blocking[dtype.index()] = blocking;
        self
    }

    pub fn with_policy(mut self, dtype: DataType, policy: TreePolicy) -> Self {
        self.policy[dtype.index()] = policy;
        self
    }

    #[inline]
    pub fn blocking(&self, dtype: DataType) -> Blocking {
        self.blocking[dtype.index()]
    }

    #[inline]
    pub fn tree_policy(&self, dtype: DataType) -> TreePolicy {
        self.policy[dtype.index()]
    }

    #[inline]
    pub fn nthreads(&self) -> usize {
        self.nthreads
    }

    #[inline]
    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }

    #[inline]
    pub fn mixed_domain(&self) -> bool {
        self.mixed_domain
    }

    #[inline]
    pub fn mixed_precision(&self) -> bool {
        self.mixed_precision
    }

    #[inline]
    pub fn counters(&self) -> &KernelCounters {
        &self.counters
    }
}
