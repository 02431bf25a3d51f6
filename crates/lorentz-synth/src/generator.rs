//! Balanced synthetic dataset generation via rejection sampling.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::SynthError;
use crate::sample::{Dataset, Sample};

/// The labeling rule applied to every candidate draw.
///
/// A deliberately simple placeholder signal: label 1 when the
/// magnetic-field/momentum product exceeds 0.05 and the electric field
/// exceeds 150 V/m. Consumers treat it as an opaque contract.
#[must_use]
pub fn label_rule(magnetic_field: f64, electric_field: f64, momentum: f64) -> usize {
    usize::from(magnetic_field * momentum > 0.05 && electric_field > 150.0)
}

/// Round to a fixed number of decimal places for reproducible textual I/O.
fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Configuration for the balanced dataset generator.
///
/// Construct via [`GeneratorConfig::new`], then chain `with_seed`.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    n_samples: usize,
    seed: u64,
}

impl GeneratorConfig {
    /// Create a new config for a dataset of `n_samples` rows.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::InvalidSampleCount`] if `n_samples` is zero.
    pub fn new(n_samples: usize) -> Result<Self, SynthError> {
        if n_samples == 0 {
            return Err(SynthError::InvalidSampleCount { n_samples });
        }
        Ok(Self { n_samples, seed: 42 })
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the configured dataset size.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Generate a label-balanced dataset.
    ///
    /// Candidates are drawn from fixed per-feature uniform ranges
    /// (magnetic field [-1, 1] T, electric field [0, 300] V/m, position
    /// [-10, 10], momentum [-2, 2]), labeled by [`label_rule`], and
    /// accepted only while their label's running count is below its
    /// target. Label 1 gets `n / 2` rows (rounded down) and label 0 the
    /// remainder, so the two counts differ by at most one and the total
    /// is exactly `n`. The half-based accept/reject is also what bounds
    /// the loop: once a half is full, every further draw of that label is
    /// discarded, and both labels are reachable by construction.
    ///
    /// Features are rounded for stable CSV round-trips: magnetic field
    /// and momentum to 3 decimals, electric field and position to 2.
    #[instrument(skip(self), fields(n_samples = self.n_samples, seed = self.seed))]
    #[must_use]
    pub fn generate(&self) -> Dataset {
        let target_ones = self.n_samples / 2;
        let target_zeros = self.n_samples - target_ones;
        let mut counts = [0usize, 0usize];
        let targets = [target_zeros, target_ones];

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut samples = Vec::with_capacity(self.n_samples);
        let mut rejected = 0usize;

        while counts[0] < targets[0] || counts[1] < targets[1] {
            let magnetic_field = round_to(rng.gen_range(-1.0..1.0), 3);
            let electric_field = round_to(rng.gen_range(0.0..300.0), 2);
            let position = round_to(rng.gen_range(-10.0..10.0), 2);
            let momentum = round_to(rng.gen_range(-2.0..2.0), 3);

            let label = label_rule(magnetic_field, electric_field, momentum);
            if counts[label] >= targets[label] {
                rejected += 1;
                continue;
            }
            counts[label] += 1;

            // Rounded uniform draws are always finite and the label is
            // 0 or 1 by construction.
            let sample = Sample::new(magnetic_field, electric_field, position, momentum, label)
                .expect("generated samples are always valid");
            samples.push(sample);
        }

        debug!(rejected, "rejection sampling complete");
        info!(
            n_samples = samples.len(),
            n_label0 = counts[0],
            n_label1 = counts[1],
            "dataset generated"
        );

        Dataset::new(samples)
    }
}
