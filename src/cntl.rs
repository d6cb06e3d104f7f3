//! Control trees: which algorithmic variant and implementation kind to run
//! at each recursion level of an operation.
//!
//! A [`ControlNode`] selects a (variant, implementation-kind) pair, may
//! override the context block size, may mark the whole subtree as a no-op,
//! and owns at most one child node describing the next recursion level.
//! Trees are acyclic by construction (`Box`-owned children) with depth
//! bounded by the number of blocking levels an operation defines.

use crate::error::{ObError, Result};

/// How a variant is realized at one recursion level.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImplKind {
    /// Straightforward unblocked loop; always a tree leaf.
    Reference,
    /// Microkernel-backed unblocked realization; always a tree leaf.
    Optimized,
    /// Cache-blocked realization; partitions operands and recurses into the
    /// child node.
    Blocked,
}

impl ImplKind {
    pub const COUNT: usize = 3;

    #[inline]
    pub fn index(self) -> usize {
        match self {
            ImplKind::Reference => 0,
            ImplKind::Optimized => 1,
            ImplKind::Blocked => 2,
        }
    }
}

/// Identifier of an algorithm family within one operation (row-sweep vs
/// column-sweep, k-partitioned vs m-partitioned, ...).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Variant(pub usize);

/// One node of a control tree.
#[derive(Clone, Debug)]
pub struct ControlNode {
    variant: Variant,
    kind: ImplKind,
    blocksize: Option<usize>,
    noop: bool,
    sub: Option<Box<ControlNode>>,
}

/// Blocking levels are small; anything deeper is a malformed tree.
const MAX_DEPTH: usize = 3;

impl ControlNode {
    /// Leaf node: a reference or optimized unblocked realization.
    pub fn leaf(variant: Variant, kind: ImplKind) -> Self {
        debug_assert!(kind != ImplKind::Blocked, "blocked nodes need a child");
        ControlNode {
            variant,
            kind,
            blocksize: None,
            noop: false,
            sub: None,
        }
    }

    /// Blocked node with an explicit child for the next recursion level.
    pub fn blocked(variant: Variant, blocksize: Option<usize>, sub: ControlNode) -> Self {
        ControlNode {
            variant,
            kind: ImplKind::Blocked,
            blocksize,
            noop: false,
            sub: Some(Box::new(sub)),
        }
    }

    /// A node whose whole subtree is skipped.
    pub fn noop() -> Self {
        ControlNode {
            variant: Variant(0),
            kind: ImplKind::Reference,
            blocksize: None,
            noop: true,
            sub: None,
        }
    }

    #[inline]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[inline]
    pub fn kind(&self) -> ImplKind {
        self.kind
    }

    #[inline]
    pub fn is_noop(&self) -> bool {
        self.noop
    }

    #[inline]
    pub fn sub(&self) -> Option<&ControlNode> {
        self.sub.as_deref()
    }

    /// Effective block size at this level: node override or context default.
    #[inline]
    pub fn block_for(&self, default: usize) -> usize {
        self.blocksize.unwrap_or(default).max(1)
    }

    /// Check the node invariants over the whole tree: a blocked node has a
    /// child, a leaf has none, and depth stays within the blocking levels.
    pub fn validate(&self, op: &'static str) -> Result<()> {
        self.validate_depth(op, 0)
    }

    fn validate_depth(&self, op: &'static str, depth: usize) -> Result<()> {
        if depth >= MAX_DEPTH {
            return Err(ObError::BadControlTree {
                op,
                reason: "tree deeper than the operation's blocking levels",
            });
        }
        match (self.kind, &self.sub) {
            (ImplKind::Blocked, None) => Err(ObError::BadControlTree {
                op,
                reason: "blocked node without a child",
            }),
            (ImplKind::Reference | ImplKind::Optimized, Some(_)) => Err(ObError::BadControlTree {
                op,
                reason: "unblocked node with a child",
            }),
            (ImplKind::Blocked, Some(sub)) => sub.validate_depth(op, depth + 1),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Default-tree policy
// ============================================================================

/// Data-driven selection policy for operations invoked without an explicit
/// control tree: prefer the optimized unblocked realization when the
/// operation registers one for the datatype, else go blocked once the
/// largest operand dimension exceeds the threshold, else fall back to the
/// reference loop.
#[derive(Copy, Clone, Debug)]
pub struct TreePolicy {
    pub block_threshold: usize,
}

impl TreePolicy {
    pub fn select(&self, has_optimized: bool, max_dim: usize) -> ImplKind {
        if has_optimized {
            ImplKind::Optimized
        } else if max_dim > self.block_threshold {
            ImplKind::Blocked
        } else {
            ImplKind::Reference
        }
    }
}

/// Build the default tree for an operation from its policy.
///
/// `unb_variant` names the unblocked algorithm family, `blk_variant` the
/// blocked one; a blocked root gets a reference leaf as its child.
pub fn default_tree(
    policy: TreePolicy,
    has_optimized: bool,
    max_dim: usize,
    unb_variant: Variant,
    blk_variant: Variant,
) -> ControlNode {
    match policy.select(has_optimized, max_dim) {
        ImplKind::Optimized => ControlNode::leaf(unb_variant, ImplKind::Optimized),
        ImplKind::Reference => ControlNode::leaf(unb_variant, ImplKind::Reference),
        ImplKind::Blocked => ControlNode::blocked(
            blk_variant,
            None,
            ControlNode::leaf(unb_variant, ImplKind::Reference),
        ),
    }
}
