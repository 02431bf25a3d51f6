//! Synthetic charged-particle dataset generation.
//!
//! Produces label-balanced binary classification datasets with four
//! physical features (magnetic field, electric field, position, momentum)
//! via seeded rejection sampling, plus a seeded train/test split.
//!
//! All randomness flows through `ChaCha8Rng` seeded from an explicit
//! `u64`, so every dataset and split is reproducible.

mod error;
mod generator;
mod sample;
mod split;

pub use error::SynthError;
pub use generator::{GeneratorConfig, label_rule};
pub use sample::{Dataset, FEATURE_NAMES, N_FEATURES, Sample};
pub use split::train_test_split;
