//! Domain types for labeled charged-particle samples.

use crate::SynthError;

/// Feature column names in canonical order, matching the CSV header.
pub const FEATURE_NAMES: [&str; 4] = [
    "magnetic_field",
    "electric_field",
    "position",
    "momentum",
];

/// Number of feature columns per sample.
pub const N_FEATURES: usize = 4;

/// One labeled observation: four numeric features plus a binary label.
///
/// Immutable once constructed — fields are private and there are no
/// mutating methods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    magnetic_field: f64,
    electric_field: f64,
    position: f64,
    momentum: f64,
    label: usize,
}

impl Sample {
    /// Construct a validated sample.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SynthError::NonFiniteFeature`] | any feature is NaN or infinite |
    /// | [`SynthError::InvalidLabel`] | label is not 0 or 1 |
    pub fn new(
        magnetic_field: f64,
        electric_field: f64,
        position: f64,
        momentum: f64,
        label: usize,
    ) -> Result<Self, SynthError> {
        for (feature, value) in FEATURE_NAMES
            .iter()
            .zip([magnetic_field, electric_field, position, momentum])
        {
            if !value.is_finite() {
                return Err(SynthError::NonFiniteFeature { feature });
            }
        }
        if label > 1 {
            return Err(SynthError::InvalidLabel { label });
        }
        Ok(Self {
            magnetic_field,
            electric_field,
            position,
            momentum,
            label,
        })
    }

    /// Return the features as an array in [`FEATURE_NAMES`] order.
    #[must_use]
    pub fn features(&self) -> [f64; N_FEATURES] {
        [
            self.magnetic_field,
            self.electric_field,
            self.position,
            self.momentum,
        ]
    }

    /// Return the magnetic field strength (Tesla).
    #[must_use]
    pub fn magnetic_field(&self) -> f64 {
        self.magnetic_field
    }

    /// Return the electric field strength (V/m).
    #[must_use]
    pub fn electric_field(&self) -> f64 {
        self.electric_field
    }

    /// Return the particle position (arbitrary units).
    #[must_use]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Return the particle momentum (arbitrary units).
    #[must_use]
    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// Return the binary class label.
    #[must_use]
    pub fn label(&self) -> usize {
        self.label
    }
}

/// An ordered sequence of samples.
///
/// Datasets produced by the generator satisfy the balance invariant:
/// the two label counts differ by at most one.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    /// Create a dataset from pre-validated samples.
    #[must_use]
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Return the samples in order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Return the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Return `true` when the dataset has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Return `(count of label 0, count of label 1)`.
    #[must_use]
    pub fn label_counts(&self) -> (usize, usize) {
        let ones = self.samples.iter().filter(|s| s.label() == 1).count();
        (self.samples.len() - ones, ones)
    }

    /// Return the features as a row-major matrix.
    #[must_use]
    pub fn feature_matrix(&self) -> Vec<Vec<f64>> {
        self.samples.iter().map(|s| s.features().to_vec()).collect()
    }

    /// Return the labels in sample order.
    #[must_use]
    pub fn labels(&self) -> Vec<usize> {
        self.samples.iter().map(Sample::label).collect()
    }
}
