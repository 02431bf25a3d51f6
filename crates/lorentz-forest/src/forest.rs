//! Random forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::node::argmax_lowest;
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// Configuration for random forest training.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default |
/// |---------------------|---------|
/// | `max_depth`         | `None`  |
/// | `min_samples_split` | 2       |
/// | `seed`              | 42      |
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) seed: u64,
}

impl ForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        })
    }

    /// Set the maximum tree depth. `None` means unlimited.
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

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a random forest on the provided dataset.
    ///
    /// `features[sample_idx][feature_idx]` — row-major layout.
    /// `labels[sample_idx]` — class labels (zero-based).
    ///
    /// Each tree is grown from its own bootstrap sample (drawn with
    /// replacement, same size as the training set) using a `ChaCha8Rng`
    /// seeded with `seed + tree_index`. Trees share no mutable state, so
    /// training runs on rayon workers and the result is byte-identical
    /// regardless of execution order.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                            |
    /// |-----------------------------------------|---------------------------------|
    /// | [`ForestError::EmptyDataset`]           | `features` is empty             |
    /// | [`ForestError::ZeroFeatures`]           | rows have zero feature columns  |
    /// | [`ForestError::FeatureCountMismatch`]   | rows have inconsistent lengths  |
    /// | [`ForestError::NonFiniteValue`]         | any value is NaN or infinite    |
    /// | [`ForestError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`        |
    /// | [`ForestError::InvalidMinSamplesSplit`] | `min_samples_split` < 2         |
    #[instrument(skip_all, fields(n_trees = self.n_trees, n_samples = features.len()))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<RandomForest, ForestError> {
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

        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;

        info!(
            n_trees = self.n_trees,
            n_samples, n_features, n_classes, "training random forest"
        );

        let max_depth = self.max_depth;
        let min_samples_split = self.min_samples_split;
        let seed = self.seed;

        // Per-tree seeds derive from the tree index, not a shared RNG
        // stream, so parallel scheduling cannot affect reproducibility.
        let trees: Vec<DecisionTree> = (0..self.n_trees)
            .into_par_iter()
            .map(|tree_index| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(tree_index as u64));
                let bootstrap_indices = bootstrap_sample(n_samples, &mut rng);

                let boot_features: Vec<Vec<f64>> = bootstrap_indices
                    .iter()
                    .map(|&i| features[i].clone())
                    .collect();
                let boot_labels: Vec<usize> =
                    bootstrap_indices.iter().map(|&i| labels[i]).collect();

                DecisionTreeConfig::new()
                    .with_max_depth(max_depth)
                    .with_min_samples_split(min_samples_split)
                    .with_n_classes(Some(n_classes))
                    .fit(&boot_features, &boot_labels)
            })
            .collect::<Result<_, _>>()?;

        debug!(n_trees_trained = trees.len(), "tree training complete");

        Ok(RandomForest {
            trees,
            n_features,
            n_classes,
        })
    }
}

/// Draw a bootstrap sample: `n_samples` indices with replacement.
fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// A fitted random forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl RandomForest {
    /// Predict the class label for a single sample.
    ///
    /// Each tree casts a hard vote (the majority class at the leaf the
    /// sample lands on); the forest returns the class with the most votes,
    /// ties broken by lowest class index.
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

        let mut votes = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            votes[tree.predict(sample)?] += 1.0;
        }
        Ok(argmax_lowest(&votes))
    }

    /// Predict class labels for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any sample has
    /// the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ForestError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the trees in the ensemble.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}
