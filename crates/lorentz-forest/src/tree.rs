use tracing::{debug, instrument};

use crate::{
    ForestError,
    node::{Node, NodeIndex, argmax_lowest},
    split::find_best_split,
};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `n_classes`         | `None` (derived)      |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) n_classes: Option<usize>,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            n_classes: None,
        }
    }

    /// Set the maximum tree depth.
    ///
    /// `None` means grow until all leaves are pure or stopping conditions
    /// are met. `Some(d)` limits depth to `d` levels (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Fix the number of classes instead of deriving it from the labels.
    ///
    /// A bootstrap sample can miss a class entirely; pinning `n_classes`
    /// keeps every tree's per-node count vectors the same width.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: Option<usize>) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Train a decision tree on the provided row-major dataset.
    ///
    /// `features[sample_idx][feature_idx]` — row-major layout.
    /// `labels[sample_idx]` — class labels (zero-based).
    ///
    /// The split search is fully deterministic (all features scanned in
    /// index order, ties to lowest feature then lowest threshold), so the
    /// only randomness in forest training lives in the bootstrap sampling.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                           |
    /// |-------------------------------------|------------------------------------------------|
    /// | [`ForestError::EmptyDataset`]           | `features` is empty                        |
    /// | [`ForestError::ZeroFeatures`]           | rows have zero feature columns             |
    /// | [`ForestError::FeatureCountMismatch`]   | rows have inconsistent lengths             |
    /// | [`ForestError::NonFiniteValue`]         | any value is NaN or infinite               |
    /// | [`ForestError::LabelOutOfRange`]        | a label exceeds the pinned `n_classes`     |
    /// | [`ForestError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                   |
    /// | [`ForestError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                    |
    #[instrument(skip(self, features, labels), fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, ForestError> {
        // --- Validate inputs ---
        if features.is_empty() {
            return Err(ForestError::EmptyDataset);
        }

        let n_samples = features.len();
        let n_features = features[0].len();

        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }

        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != n_features {
                return Err(ForestError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            for (feature_index, &val) in row.iter().enumerate() {
                if !val.is_finite() {
                    return Err(ForestError::NonFiniteValue {
                        sample_index,
                        feature_index,
                    });
                }
            }
        }

        // --- Validate config ---
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(ForestError::InvalidMaxDepth { max_depth: 0 });
        }

        if self.min_samples_split < 2 {
            return Err(ForestError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }

        let derived = labels.iter().max().copied().unwrap_or(0) + 1;
        let n_classes = self.n_classes.unwrap_or(derived);
        if let Some((sample_index, &label)) =
            labels.iter().enumerate().find(|&(_, &l)| l >= n_classes)
        {
            return Err(ForestError::LabelOutOfRange {
                label,
                n_classes,
                sample_index,
            });
        }

        debug!(n_samples, n_features, n_classes, "fitting decision tree");

        // Column-major layout for the split scan.
        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();

        let sample_indices: Vec<usize> = (0..n_samples).collect();
        let mut arena: Vec<Node> = Vec::new();

        build_tree(
            &col_features,
            labels,
            &sample_indices,
            n_classes,
            self,
            0,
            &mut arena,
        )?;

        debug!(n_nodes = arena.len(), "decision tree built");

        Ok(DecisionTree {
            nodes: arena,
            n_features,
            n_classes,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively build the arena-based decision tree.
///
/// Nodes are appended in pre-order: the parent reserves its slot before
/// recursing, so every child's arena index is strictly greater than its
/// parent's and the root lands at index 0.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
fn build_tree(
    col_features: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    n_classes: usize,
    config: &DecisionTreeConfig,
    depth: usize,
    arena: &mut Vec<Node>,
) -> Result<NodeIndex, ForestError> {
    let n_samples = sample_indices.len();

    // Partitioning never routes zero samples to a child; reaching this is
    // an invariant violation, not a recoverable state.
    if n_samples == 0 {
        return Err(ForestError::EmptyNode { depth });
    }

    let mut class_counts = vec![0usize; n_classes];
    for &si in sample_indices {
        class_counts[labels[si]] += 1;
    }
    let counts_f64: Vec<f64> = class_counts.iter().map(|&c| c as f64).collect();

    let make_leaf = |arena: &mut Vec<Node>| -> NodeIndex {
        let idx = arena.len();
        arena.push(Node::Leaf {
            prediction: argmax_lowest(&counts_f64),
            class_counts: counts_f64.clone(),
        });
        NodeIndex::new(idx)
    };

    // Stopping conditions → leaf.
    let depth_exceeded = config.max_depth.is_some_and(|max_d| depth >= max_d);
    let too_few = n_samples < config.min_samples_split;
    let pure = class_counts.iter().filter(|&&c| c > 0).count() <= 1;

    if too_few || pure || depth_exceeded {
        return Ok(make_leaf(arena));
    }

    // No candidate split improves impurity → fall back to a leaf.
    let split = match find_best_split(col_features, labels, sample_indices, n_classes) {
        Some(s) => s,
        None => return Ok(make_leaf(arena)),
    };

    // Arena pattern: reserve this node's slot, recurse, then overwrite.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        prediction: 0,
        class_counts: counts_f64.clone(),
    });

    let left_idx = build_tree(
        col_features,
        labels,
        &split.left_indices,
        n_classes,
        config,
        depth + 1,
        arena,
    )?;

    let right_idx = build_tree(
        col_features,
        labels,
        &split.right_indices,
        n_classes,
        config,
        depth + 1,
        arena,
    )?;

    arena[node_idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: left_idx,
        right: right_idx,
        class_counts: counts_f64,
    };

    Ok(NodeIndex::new(node_idx))
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` in pre-order with the root at
/// index 0 — the same ordering the flat-array model export uses.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// Traverses from the root (index 0): at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise. The prediction is
    /// the class with the highest count at the reached leaf, ties broken
    /// by lowest class index.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let leaf = self.traverse(sample);
        match &self.nodes[leaf] {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the per-class training counts at the leaf a sample lands on.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features`.
    pub fn leaf_counts(&self, sample: &[f64]) -> Result<&[f64], ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(self.nodes[self.traverse(sample)].class_counts())
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => {
                    if d > max_depth {
                        max_depth = d;
                    }
                }
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }

    /// Traverse the tree from the root and return the arena index of the leaf.
    fn traverse(&self, sample: &[f64]) -> usize {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if sample[feature.index()] <= *threshold {
                        idx = left.index();
                    } else {
                        idx = right.index();
                    }
                }
            }
        }
    }
}
