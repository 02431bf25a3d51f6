/// Errors from dataset generation and partitioning.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    /// Returned when a requested dataset size is zero.
    #[error("dataset size must be at least 1, got {n_samples}")]
    InvalidSampleCount {
        /// The invalid size provided.
        n_samples: usize,
    },

    /// Returned when a sample is constructed with a NaN or infinite feature.
    #[error("non-finite value for feature \"{feature}\"")]
    NonFiniteFeature {
        /// Name of the offending feature column.
        feature: &'static str,
    },

    /// Returned when a label is neither 0 nor 1.
    #[error("label must be 0 or 1, got {label}")]
    InvalidLabel {
        /// The offending label value.
        label: usize,
    },

    /// Returned when the test fraction is outside (0.0, 1.0).
    #[error("test_fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidTestFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when a split would leave either partition empty.
    #[error("cannot split {n_samples} samples into {n_test} test rows and a non-empty train set")]
    TooFewSamples {
        /// Total samples available.
        n_samples: usize,
        /// Requested test partition size.
        n_test: usize,
    },
}
