//! Portable flat-array model export and import.
//!
//! A forest is serialized as a JSON array of per-tree records, each holding
//! five parallel arrays indexed by arena position (pre-order, root at 0):
//! `children_left`, `children_right`, `feature`, `threshold`, `value`.
//! Child entries use -1 for "no child"; leaves carry -2 in `feature` and
//! -2.0 in `threshold`; `value` holds the per-class training counts at
//! every node. A consumer can evaluate the model with nothing but these
//! arrays, and a re-imported forest predicts bit-for-bit identically.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::node::{FeatureIndex, Node, NodeIndex, argmax_lowest};
use crate::tree::DecisionTree;

/// Sentinel for "no child" in `children_left`/`children_right`.
pub const NO_CHILD: i64 = -1;

/// Sentinel stored in `feature` at leaf positions.
pub const LEAF_FEATURE: i64 = -2;

/// Placeholder stored in `threshold` at leaf positions (value is unused).
pub const LEAF_THRESHOLD: f64 = -2.0;

/// One tree's worth of parallel node arrays.
///
/// All five arrays have one entry per node in arena order. Every non-leaf
/// node's child indices point strictly forward (child index > parent
/// index), which both rules out cycles and pins the traversal order a
/// deserializer must assume.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeArrays {
    /// Left child index per node, or -1 at leaves.
    pub children_left: Vec<i64>,
    /// Right child index per node, or -1 at leaves.
    pub children_right: Vec<i64>,
    /// Split feature index per node, or -2 at leaves.
    pub feature: Vec<i64>,
    /// Split threshold per node; -2.0 at leaves.
    pub threshold: Vec<f64>,
    /// Per-class training sample counts per node.
    pub value: Vec<Vec<f64>>,
}

impl RandomForest {
    /// Flatten the forest into per-tree parallel arrays.
    #[must_use]
    pub fn to_arrays(&self) -> Vec<TreeArrays> {
        self.trees
            .iter()
            .map(|tree| {
                let n = tree.nodes.len();
                let mut arrays = TreeArrays {
                    children_left: Vec::with_capacity(n),
                    children_right: Vec::with_capacity(n),
                    feature: Vec::with_capacity(n),
                    threshold: Vec::with_capacity(n),
                    value: Vec::with_capacity(n),
                };
                for node in &tree.nodes {
                    match node {
                        Node::Split {
                            feature,
                            threshold,
                            left,
                            right,
                            class_counts,
                        } => {
                            arrays.children_left.push(left.index() as i64);
                            arrays.children_right.push(right.index() as i64);
                            arrays.feature.push(feature.index() as i64);
                            arrays.threshold.push(*threshold);
                            arrays.value.push(class_counts.clone());
                        }
                        Node::Leaf { class_counts, .. } => {
                            arrays.children_left.push(NO_CHILD);
                            arrays.children_right.push(NO_CHILD);
                            arrays.feature.push(LEAF_FEATURE);
                            arrays.threshold.push(LEAF_THRESHOLD);
                            arrays.value.push(class_counts.clone());
                        }
                    }
                }
                arrays
            })
            .collect()
    }

    /// Reconstruct a forest from per-tree parallel arrays.
    ///
    /// `n_features` must be supplied by the caller: the arrays only record
    /// the features actually split on, not the input width.
    ///
    /// Validates every structural invariant before building a node:
    /// consistent array lengths, leaf sentinel agreement, forward-only
    /// child references, in-range feature indices, and a uniform value
    /// width (the class count) across all trees.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyTree`] | a tree record has zero nodes |
    /// | [`ForestError::ArrayLengthMismatch`] | parallel arrays disagree in length |
    /// | [`ForestError::MismatchedChildSentinels`] | one child is -1 and the other is not |
    /// | [`ForestError::InvalidChildIndex`] | child index out of range or not strictly forward |
    /// | [`ForestError::InvalidFeatureIndex`] | split feature out of range, or leaf feature != -2 |
    /// | [`ForestError::ValueWidthMismatch`] | a value row's width differs from the rest |
    pub fn from_arrays(arrays: &[TreeArrays], n_features: usize) -> Result<Self, ForestError> {
        let mut n_classes: Option<usize> = None;
        let mut trees = Vec::with_capacity(arrays.len());

        for (tree_index, t) in arrays.iter().enumerate() {
            let n_nodes = t.children_left.len();
            if n_nodes == 0 {
                return Err(ForestError::EmptyTree { tree_index });
            }
            for (array, len) in [
                ("children_right", t.children_right.len()),
                ("feature", t.feature.len()),
                ("threshold", t.threshold.len()),
                ("value", t.value.len()),
            ] {
                if len != n_nodes {
                    return Err(ForestError::ArrayLengthMismatch {
                        tree_index,
                        array,
                        expected: n_nodes,
                        got: len,
                    });
                }
            }

            let mut nodes = Vec::with_capacity(n_nodes);
            for node_index in 0..n_nodes {
                let counts = &t.value[node_index];
                let expected_classes = *n_classes.get_or_insert(counts.len());
                if counts.len() != expected_classes {
                    return Err(ForestError::ValueWidthMismatch {
                        tree_index,
                        node_index,
                        expected: expected_classes,
                        got: counts.len(),
                    });
                }

                let left = t.children_left[node_index];
                let right = t.children_right[node_index];
                let feature = t.feature[node_index];

                match (left == NO_CHILD, right == NO_CHILD) {
                    (true, true) => {
                        if feature != LEAF_FEATURE {
                            return Err(ForestError::InvalidFeatureIndex {
                                tree_index,
                                node_index,
                                feature,
                                n_features,
                            });
                        }
                        nodes.push(Node::Leaf {
                            prediction: argmax_lowest(counts),
                            class_counts: counts.clone(),
                        });
                    }
                    (false, false) => {
                        for child in [left, right] {
                            if child <= node_index as i64 || child >= n_nodes as i64 {
                                return Err(ForestError::InvalidChildIndex {
                                    tree_index,
                                    node_index,
                                    child,
                                    n_nodes,
                                });
                            }
                        }
                        if feature < 0 || feature >= n_features as i64 {
                            return Err(ForestError::InvalidFeatureIndex {
                                tree_index,
                                node_index,
                                feature,
                                n_features,
                            });
                        }
                        nodes.push(Node::Split {
                            feature: FeatureIndex::new(feature as usize),
                            threshold: t.threshold[node_index],
                            left: NodeIndex::new(left as usize),
                            right: NodeIndex::new(right as usize),
                            class_counts: counts.clone(),
                        });
                    }
                    _ => {
                        return Err(ForestError::MismatchedChildSentinels {
                            tree_index,
                            node_index,
                        });
                    }
                }
            }

            trees.push(DecisionTree {
                nodes,
                n_features,
                n_classes: n_classes.unwrap_or(0),
            });
        }

        debug!(n_trees = trees.len(), "forest reconstructed from arrays");

        Ok(RandomForest {
            trees,
            n_features,
            n_classes: n_classes.unwrap_or(0),
        })
    }

    /// Save the model to a JSON file.
    ///
    /// The document is the full flat-array structure: a top-level array
    /// with one record per tree. The bytes are written to a `.tmp` sibling
    /// and renamed into place, so a failed write leaves no partial model.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | JSON encoding failed |
    /// | [`ForestError::WriteModel`] | file write or rename failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();
        let arrays = self.to_arrays();

        let json = serde_json::to_string(&arrays)
            .map_err(|e| ForestError::SerializeModel { source: e })?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|e| ForestError::WriteModel {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, path).map_err(|e| ForestError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = json.len(),
            n_trees = self.trees.len(),
            "model saved"
        );

        Ok(())
    }

    /// Load a model from a JSON file written by [`RandomForest::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadModel`] | file read failed |
    /// | [`ForestError::DeserializeModel`] | JSON decoding failed |
    /// | validation variants | see [`RandomForest::from_arrays`] |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, n_features: usize) -> Result<Self, ForestError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| ForestError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let arrays: Vec<TreeArrays> =
            serde_json::from_slice(&bytes).map_err(|e| ForestError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        let forest = Self::from_arrays(&arrays, n_features)?;

        debug!(
            n_trees = forest.trees.len(),
            n_classes = forest.n_classes,
            "model loaded"
        );

        Ok(forest)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::forest::ForestConfig;

    fn train_simple_model() -> RandomForest {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 1.0],
            vec![3.0, 0.0],
            vec![10.0, 1.0],
            vec![11.0, 0.0],
            vec![12.0, 1.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        ForestConfig::new(3)
            .unwrap()
            .with_max_depth(Some(2))
            .with_seed(42)
            .fit(&features, &labels)
            .unwrap()
    }

    #[test]
    fn arrays_share_length_and_point_forward() {
        let forest = train_simple_model();
        for t in forest.to_arrays() {
            let n = t.children_left.len();
            assert_eq!(t.children_right.len(), n);
            assert_eq!(t.feature.len(), n);
            assert_eq!(t.threshold.len(), n);
            assert_eq!(t.value.len(), n);
            for i in 0..n {
                let (l, r) = (t.children_left[i], t.children_right[i]);
                if l == NO_CHILD {
                    assert_eq!(r, NO_CHILD);
                    assert_eq!(t.feature[i], LEAF_FEATURE);
                } else {
                    assert!(l > i as i64 && (l as usize) < n);
                    assert!(r > i as i64 && (r as usize) < n);
                    assert!(t.feature[i] >= 0 && t.feature[i] < 2);
                }
            }
        }
    }

    #[test]
    fn round_trip_identical_predictions() {
        let forest = train_simple_model();
        let restored = RandomForest::from_arrays(&forest.to_arrays(), 2).unwrap();

        let held_out = vec![
            vec![1.5, 0.0],
            vec![5.0, 1.0],
            vec![6.5, 0.5],
            vec![11.0, 0.0],
        ];
        for sample in &held_out {
            assert_eq!(
                forest.predict(sample).unwrap(),
                restored.predict(sample).unwrap(),
                "predictions differ for sample {sample:?}"
            );
        }
        // The re-export is byte-identical, not just behaviorally equal.
        assert_eq!(forest.to_arrays(), restored.to_arrays());
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rf_model.json");

        let forest = train_simple_model();
        forest.save(&path).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("rf_model.json.tmp").exists());

        let loaded = RandomForest::load(&path, 2).unwrap();
        assert_eq!(forest.to_arrays(), loaded.to_arrays());
    }

    #[test]
    fn saved_json_is_array_of_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rf_model.json");
        train_simple_model().save(&path).unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let trees = doc.as_array().unwrap();
        assert_eq!(trees.len(), 3);
        for t in trees {
            for key in ["children_left", "children_right", "feature", "threshold", "value"] {
                assert!(t[key].is_array(), "missing key {key}");
            }
        }
    }

    #[test]
    fn load_nonexistent_file_error() {
        let err = RandomForest::load("/tmp/nonexistent_model_abc123.json", 2).unwrap_err();
        assert!(matches!(err, ForestError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, b"not json at all").unwrap();
        let err = RandomForest::load(&path, 2).unwrap_err();
        assert!(matches!(err, ForestError::DeserializeModel { .. }));
    }

    fn leaf_only_arrays() -> TreeArrays {
        TreeArrays {
            children_left: vec![NO_CHILD],
            children_right: vec![NO_CHILD],
            feature: vec![LEAF_FEATURE],
            threshold: vec![LEAF_THRESHOLD],
            value: vec![vec![3.0, 1.0]],
        }
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut t = leaf_only_arrays();
        t.threshold.push(0.0);
        let err = RandomForest::from_arrays(&[t], 2).unwrap_err();
        assert!(matches!(
            err,
            ForestError::ArrayLengthMismatch { array: "threshold", .. }
        ));
    }

    #[test]
    fn rejects_empty_tree() {
        let t = TreeArrays {
            children_left: vec![],
            children_right: vec![],
            feature: vec![],
            threshold: vec![],
            value: vec![],
        };
        assert!(matches!(
            RandomForest::from_arrays(&[t], 2),
            Err(ForestError::EmptyTree { tree_index: 0 })
        ));
    }

    #[test]
    fn rejects_backward_child_index() {
        let t = TreeArrays {
            children_left: vec![0, NO_CHILD, NO_CHILD],
            children_right: vec![2, NO_CHILD, NO_CHILD],
            feature: vec![0, LEAF_FEATURE, LEAF_FEATURE],
            threshold: vec![0.5, LEAF_THRESHOLD, LEAF_THRESHOLD],
            value: vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]],
        };
        assert!(matches!(
            RandomForest::from_arrays(&[t], 2),
            Err(ForestError::InvalidChildIndex { child: 0, .. })
        ));
    }

    #[test]
    fn rejects_negative_non_sentinel_child() {
        let t = TreeArrays {
            children_left: vec![-5, NO_CHILD, NO_CHILD],
            children_right: vec![2, NO_CHILD, NO_CHILD],
            feature: vec![0, LEAF_FEATURE, LEAF_FEATURE],
            threshold: vec![0.5, LEAF_THRESHOLD, LEAF_THRESHOLD],
            value: vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]],
        };
        assert!(matches!(
            RandomForest::from_arrays(&[t], 2),
            Err(ForestError::InvalidChildIndex { child: -5, .. })
        ));
    }

    #[test]
    fn rejects_mismatched_sentinels() {
        let t = TreeArrays {
            children_left: vec![NO_CHILD, NO_CHILD, NO_CHILD],
            children_right: vec![2, NO_CHILD, NO_CHILD],
            feature: vec![0, LEAF_FEATURE, LEAF_FEATURE],
            threshold: vec![0.5, LEAF_THRESHOLD, LEAF_THRESHOLD],
            value: vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]],
        };
        assert!(matches!(
            RandomForest::from_arrays(&[t], 2),
            Err(ForestError::MismatchedChildSentinels { node_index: 0, .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_feature() {
        let t = TreeArrays {
            children_left: vec![1, NO_CHILD, NO_CHILD],
            children_right: vec![2, NO_CHILD, NO_CHILD],
            feature: vec![7, LEAF_FEATURE, LEAF_FEATURE],
            threshold: vec![0.5, LEAF_THRESHOLD, LEAF_THRESHOLD],
            value: vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]],
        };
        assert!(matches!(
            RandomForest::from_arrays(&[t], 2),
            Err(ForestError::InvalidFeatureIndex { feature: 7, .. })
        ));
    }

    #[test]
    fn rejects_leaf_with_split_feature() {
        let mut t = leaf_only_arrays();
        t.feature[0] = 1;
        assert!(matches!(
            RandomForest::from_arrays(&[t], 2),
            Err(ForestError::InvalidFeatureIndex { feature: 1, .. })
        ));
    }

    #[test]
    fn rejects_value_width_mismatch() {
        let t = TreeArrays {
            children_left: vec![1, NO_CHILD, NO_CHILD],
            children_right: vec![2, NO_CHILD, NO_CHILD],
            feature: vec![0, LEAF_FEATURE, LEAF_FEATURE],
            threshold: vec![0.5, LEAF_THRESHOLD, LEAF_THRESHOLD],
            value: vec![vec![1.0, 1.0], vec![1.0, 0.0, 0.0], vec![0.0, 1.0]],
        };
        assert!(matches!(
            RandomForest::from_arrays(&[t], 2),
            Err(ForestError::ValueWidthMismatch { node_index: 1, .. })
        ));
    }
}
