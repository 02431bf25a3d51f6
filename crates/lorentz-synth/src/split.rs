//! Seeded train/test partitioning.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::SynthError;
use crate::sample::Dataset;

/// Split a dataset into shuffled train and test partitions.
///
/// Indices are shuffled with a `ChaCha8Rng` seeded from `seed`, the first
/// `ceil(n * test_fraction)` shuffled rows become the test partition, and
/// the rest the train partition. Samples are copied, never mutated; the
/// same seed always yields the same partitions.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SynthError::InvalidTestFraction`] | `test_fraction` not in (0.0, 1.0) |
/// | [`SynthError::TooFewSamples`] | either partition would be empty |
#[instrument(skip(dataset), fields(n_samples = dataset.len()))]
pub fn train_test_split(
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
) -> Result<(Dataset, Dataset), SynthError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SynthError::InvalidTestFraction {
            fraction: test_fraction,
        });
    }

    let n_samples = dataset.len();
    let n_test = ((n_samples as f64) * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(SynthError::TooFewSamples { n_samples, n_test });
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let samples = dataset.samples();
    let test: Vec<_> = indices[..n_test].iter().map(|&i| samples[i]).collect();
    let train: Vec<_> = indices[n_test..].iter().map(|&i| samples[i]).collect();

    debug!(n_train = train.len(), n_test = test.len(), "dataset split");

    Ok((Dataset::new(train), Dataset::new(test)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorConfig;

    fn dataset(n: usize) -> Dataset {
        GeneratorConfig::new(n).unwrap().with_seed(42).generate()
    }

    #[test]
    fn partitions_cover_dataset() {
        let ds = dataset(100);
        let (train, test) = train_test_split(&ds, 0.2, 42).unwrap();
        assert_eq!(test.len(), 20);
        assert_eq!(train.len(), 80);
    }

    #[test]
    fn fraction_rounds_up() {
        let ds = dataset(10);
        let (train, test) = train_test_split(&ds, 0.25, 42).unwrap();
        // ceil(10 * 0.25) = 3
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 7);
    }

    #[test]
    fn deterministic_per_seed() {
        let ds = dataset(60);
        let (train1, test1) = train_test_split(&ds, 0.2, 9).unwrap();
        let (train2, test2) = train_test_split(&ds, 0.2, 9).unwrap();
        assert_eq!(train1.samples(), train2.samples());
        assert_eq!(test1.samples(), test2.samples());
    }

    #[test]
    fn partitions_are_disjoint_permutation() {
        let ds = dataset(40);
        let (train, test) = train_test_split(&ds, 0.2, 42).unwrap();
        let mut all: Vec<_> = train
            .samples()
            .iter()
            .chain(test.samples())
            .map(|s| s.features())
            .collect();
        let mut orig: Vec<_> = ds.samples().iter().map(|s| s.features()).collect();
        all.sort_by(|a, b| a.partial_cmp(b).unwrap());
        orig.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(all, orig);
    }

    #[test]
    fn rejects_bad_fraction() {
        let ds = dataset(10);
        assert!(matches!(
            train_test_split(&ds, 0.0, 42),
            Err(SynthError::InvalidTestFraction { .. })
        ));
        assert!(matches!(
            train_test_split(&ds, 1.0, 42),
            Err(SynthError::InvalidTestFraction { .. })
        ));
    }

    #[test]
    fn rejects_degenerate_split() {
        // ceil(2 * 0.9) = 2 would leave an empty train partition.
        let ds = dataset(2);
        assert!(matches!(
            train_test_split(&ds, 0.9, 42),
            Err(SynthError::TooFewSamples { .. })
        ));
    }
}
