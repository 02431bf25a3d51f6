use crate::node::FeatureIndex;

/// Gini impurity of a node from its class counts: `1 - Σ(p_i²)`.
///
/// Returns 0.0 when `n_samples` is zero (treated as pure).
#[must_use]
pub fn gini(class_counts: &[usize], n_samples: usize) -> f64 {
    if n_samples == 0 {
        return 0.0;
    }
    let n = n_samples as f64;
    let sum_sq: f64 = class_counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum();
    1.0 - sum_sq
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value (midpoint between adjacent distinct sorted values).
    pub(crate) threshold: f64,
    /// Sample indices going to the left child (`value <= threshold`).
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Find the split minimizing weighted Gini impurity.
///
/// Every feature column is scanned in index order. For each feature the
/// `(value, label)` pairs are sorted and swept left-to-right with
/// incremental class count updates; candidate thresholds are the midpoints
/// between consecutive distinct sorted values. The split with the largest
/// impurity decrease wins; a candidate must strictly beat the incumbent,
/// so ties resolve to the lowest feature index and then the lowest
/// threshold. The scan is fully deterministic.
///
/// Returns `None` when no candidate split reduces impurity (all values
/// identical within every feature, or no boundary improves on the parent).
/// Callers resolve that by forcing a leaf.
///
/// # Column-major layout
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
/// `sample_indices` are indices into these inner Vecs.
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    n_classes: usize,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    // Parent class counts and impurity.
    let mut parent_counts = vec![0usize; n_classes];
    for &si in sample_indices {
        parent_counts[labels[si]] += 1;
    }
    let parent_impurity = gini(&parent_counts, n_samples);

    let mut best_decrease = 0.0f64;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for (feat_idx, feat_col) in features.iter().enumerate() {
        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        // Incremental scan: left grows from empty, right shrinks from full.
        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = parent_counts.clone();

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            let class_i = labels[si];

            // Move sample i from right to left.
            left_counts[class_i] += 1;
            right_counts[class_i] -= 1;

            // No candidate boundary between identical values.
            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;

            // Weighted impurity decrease; maximizing it is equivalent to
            // minimizing Σ (n_child / n_node) · gini(child).
            let decrease = parent_impurity
                - (n_left as f64 / n_samples as f64) * gini(&left_counts, n_left)
                - (n_right as f64 / n_samples as f64) * gini(&right_counts, n_right);

            if decrease > best_decrease {
                best_decrease = decrease;
                let threshold = (val_i + val_next) / 2.0;
                best = Some((FeatureIndex::new(feat_idx), threshold));
            }
        }
    }

    let (best_feature, threshold) = best?;

    // Partition sample_indices into left/right.
    let feat_col = &features[best_feature.index()];
    let mut left_indices = Vec::with_capacity(n_samples / 2);
    let mut right_indices = Vec::with_capacity(n_samples / 2);
    for &si in sample_indices {
        if feat_col[si] <= threshold {
            left_indices.push(si);
        } else {
            right_indices.push(si);
        }
    }

    Some(SplitResult {
        feature: best_feature,
        threshold,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::{find_best_split, gini};

    #[test]
    fn gini_pure() {
        assert!((gini(&[10, 0], 10) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_binary_balanced() {
        assert!((gini(&[5, 5], 10) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_empty_node_is_pure() {
        assert!((gini(&[0, 0], 0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn separable_data_finds_correct_split() {
        // Feature 0: [1.0, 2.0, 3.0, 10.0, 11.0, 12.0]
        // Labels:    [0,   0,   0,    1,    1,    1  ]
        let features = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let sample_indices: Vec<usize> = (0..6).collect();

        let split = find_best_split(&features, &labels, &sample_indices, 2)
            .expect("should find a split");
        assert_eq!(split.feature.index(), 0);
        assert!((split.threshold - 6.5).abs() < 1e-12);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
    }

    #[test]
    fn constant_feature_returns_none() {
        let features = vec![vec![5.0, 5.0, 5.0, 5.0]];
        let labels = vec![0, 0, 1, 1];
        let sample_indices: Vec<usize> = (0..4).collect();

        assert!(find_best_split(&features, &labels, &sample_indices, 2).is_none());
    }

    #[test]
    fn pure_node_returns_none() {
        // No split reduces impurity below zero.
        let features = vec![vec![1.0, 2.0, 3.0]];
        let labels = vec![1, 1, 1];
        let sample_indices: Vec<usize> = (0..3).collect();

        assert!(find_best_split(&features, &labels, &sample_indices, 2).is_none());
    }

    #[test]
    fn tie_broken_by_lowest_feature_index() {
        // Features 0 and 1 both separate the labels perfectly.
        let features = vec![vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 0.0, 1.0, 1.0]];
        let labels = vec![0, 0, 1, 1];
        let sample_indices: Vec<usize> = (0..4).collect();

        let split = find_best_split(&features, &labels, &sample_indices, 2).unwrap();
        assert_eq!(split.feature.index(), 0);
    }

    #[test]
    fn tie_broken_by_lowest_threshold() {
        // Labels [0, 1, 1, 0] on values [0, 1, 2, 3]: boundaries 0.5 and
        // 2.5 each isolate one pure sample with equal decrease (1/6).
        // The scan must keep the lower threshold.
        let features = vec![vec![0.0, 1.0, 2.0, 3.0]];
        let labels = vec![0, 1, 1, 0];
        let sample_indices: Vec<usize> = (0..4).collect();

        let split = find_best_split(&features, &labels, &sample_indices, 2).unwrap();
        assert!((split.threshold - 0.5).abs() < 1e-12);
    }

    #[test]
    fn single_sample_returns_none() {
        let features = vec![vec![1.0]];
        let labels = vec![0];
        assert!(find_best_split(&features, &labels, &[0], 2).is_none());
    }
}
