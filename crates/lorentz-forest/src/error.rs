use std::path::PathBuf;

/// Errors from tree/forest training, scaling, and model import/export.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a label is outside the configured class range.
    #[error("label {label} at sample {sample_index} exceeds n_classes {n_classes}")]
    LabelOutOfRange {
        /// The offending label value.
        label: usize,
        /// The number of classes the model was configured for.
        n_classes: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when tree construction routes zero samples to a node.
    #[error("tree construction produced an empty node at depth {depth}")]
    EmptyNode {
        /// The depth at which the empty node was encountered (root is 0).
        depth: usize,
    },

    /// Returned when a tree record's parallel arrays disagree in length.
    #[error(
        "tree {tree_index}: array \"{array}\" has {got} entries, expected {expected}"
    )]
    ArrayLengthMismatch {
        /// The zero-based tree index in the model file.
        tree_index: usize,
        /// The name of the offending array.
        array: &'static str,
        /// The length of the reference array (children_left).
        expected: usize,
        /// The length of the offending array.
        got: usize,
    },

    /// Returned when a tree record has zero nodes.
    #[error("tree {tree_index} has zero nodes")]
    EmptyTree {
        /// The zero-based tree index in the model file.
        tree_index: usize,
    },

    /// Returned when a child index is neither the -1 sentinel nor a valid
    /// forward reference within the same tree.
    #[error(
        "tree {tree_index}, node {node_index}: child index {child} invalid (tree has {n_nodes} nodes)"
    )]
    InvalidChildIndex {
        /// The zero-based tree index in the model file.
        tree_index: usize,
        /// The arena index of the parent node.
        node_index: usize,
        /// The offending child index value.
        child: i64,
        /// The number of nodes in the tree.
        n_nodes: usize,
    },

    /// Returned when one child is the leaf sentinel and the other is not.
    #[error("tree {tree_index}, node {node_index}: children_left and children_right disagree on leaf status")]
    MismatchedChildSentinels {
        /// The zero-based tree index in the model file.
        tree_index: usize,
        /// The arena index of the offending node.
        node_index: usize,
    },

    /// Returned when a split node's feature index is out of range, or a
    /// leaf's feature entry is not the -2 sentinel.
    #[error(
        "tree {tree_index}, node {node_index}: feature index {feature} invalid for {n_features} features"
    )]
    InvalidFeatureIndex {
        /// The zero-based tree index in the model file.
        tree_index: usize,
        /// The arena index of the offending node.
        node_index: usize,
        /// The offending feature index value.
        feature: i64,
        /// The number of feature columns the model expects.
        n_features: usize,
    },

    /// Returned when a node's value row has a different class count than the
    /// rest of the model.
    #[error(
        "tree {tree_index}, node {node_index}: value row has {got} classes, expected {expected}"
    )]
    ValueWidthMismatch {
        /// The zero-based tree index in the model file.
        tree_index: usize,
        /// The arena index of the offending node.
        node_index: usize,
        /// The expected per-node class count.
        expected: usize,
        /// The actual width of the offending value row.
        got: usize,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the model file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when scaler parameters have inconsistent or invalid fields.
    #[error("invalid scaler parameters: {reason}")]
    InvalidScalerParams {
        /// Human-readable description of the inconsistency.
        reason: String,
    },
}
