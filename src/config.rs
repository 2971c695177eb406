//! Octree tuning knobs.

// =============================================================================
// Configuration
// =============================================================================

/// Children per node.
pub const BRANCHING: usize = 8;

/// Largest allowed ratio between the heaviest and lightest present child.
pub const DEFAULT_BALANCE_FACTOR: usize = 7;

/// Rebalancing behaviour of an [`Octree`](crate::Octree).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OctreeConfig {
    balance_factor: usize,
    rebalance: bool,
}

impl OctreeConfig {
    pub const fn new() -> Self {
        Self {
            balance_factor: DEFAULT_BALANCE_FACTOR,
            rebalance: true,
        }
    }

    /// Set the balance factor. Values below 1 are clamped to 1.
    pub fn with_balance_factor(mut self, factor: usize) -> Self {
        self.balance_factor = factor.max(1);
        self
    }

    /// Turn automatic rebuilds on or off. With rebalancing off the tree is a
    /// plain insertion-ordered octree.
    pub fn with_rebalance(mut self, rebalance: bool) -> Self {
        self.rebalance = rebalance;
        self
    }

    #[inline]
    pub fn balance_factor(&self) -> usize {
        self.balance_factor
    }

    #[inline]
    pub fn rebalance(&self) -> bool {
        self.rebalance
    }

    /// Classify a node with these child weights.
    ///
    /// `subtree_size` is the node's own size; `children` yields the sizes of
    /// its present children.
    pub(crate) fn skew(&self, subtree_size: usize, children: impl Iterator<Item = usize>) -> Skew {
        let mut present = 0usize;
        let mut largest = 0usize;
        let mut smallest = usize::MAX;
        for size in children {
            present += 1;
            largest = largest.max(size);
            smallest = smallest.min(size);
        }
        if present == 0 {
            return Skew::Balanced;
        }

        let factor = self.balance_factor;
        if present >= 2 && largest > factor.saturating_mul(smallest) {
            Skew::Siblings
        } else if largest > factor.saturating_mul(subtree_size.saturating_sub(largest)) {
            Skew::Chain
        } else {
            Skew::Balanced
        }
    }
}

/// How a node fails the balance rules, from mildest to worst.
///
/// `Siblings` breaks the sibling ratio: two present children differ by more
/// than the balance factor. `Chain` has one child carrying more than the
/// balance factor times the rest of the subtree; only single-child nodes can
/// end up here, since a node that keeps the sibling ratio cannot be chain
/// skewed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Skew {
    Balanced,
    Chain,
    Siblings,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self::new()
    }
}
