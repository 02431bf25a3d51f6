use std::fmt;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` in construction (pre-order) order, with
/// the root at index 0 and children referenced by [`NodeIndex`] rather than
/// pointers. A parent's arena index is always strictly less than both of
/// its children's, which is what makes the flat-array export trivial.
///
/// Every node carries its per-class training sample counts (`class_counts`),
/// not just leaves, so the exported `value` array is populated at every
/// position for introspection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Threshold value: samples with feature <= threshold go left.
        threshold: f64,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Per-class training sample counts at this node.
        class_counts: Vec<f64>,
    },
    /// A terminal leaf node.
    Leaf {
        /// Predicted class: argmax of `class_counts`, lowest index on ties.
        prediction: usize,
        /// Per-class training sample counts at this leaf.
        class_counts: Vec<f64>,
    },
}

impl Node {
    /// Return the per-class training sample counts at this node.
    #[must_use]
    pub fn class_counts(&self) -> &[f64] {
        match self {
            Node::Split { class_counts, .. } | Node::Leaf { class_counts, .. } => class_counts,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> f64 {
        self.class_counts().iter().sum()
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// Argmax over a count vector with ties broken by lowest index.
///
/// `Iterator::max_by` keeps the last maximum, so ties are resolved with an
/// explicit strict-greater scan instead.
pub(crate) fn argmax_lowest(counts: &[f64]) -> usize {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (idx, &c) in counts.iter().enumerate() {
        if c > best {
            best = c;
            best_idx = idx;
        }
    }
    best_idx
}
