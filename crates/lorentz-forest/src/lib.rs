//! Random forest classification with a portable flat-array model format.
//!
//! Provides a hand-rolled CART decision tree builder, bagged ensemble
//! training with per-tree seeded randomness and rayon parallelism, feature
//! standardization with persisted parameters, and JSON export/import of
//! the forest as per-node parallel arrays that downstream consumers can
//! evaluate without this crate.

mod error;
mod export;
mod forest;
mod node;
mod scaler;
mod split;
mod tree;

pub use error::ForestError;
pub use export::{LEAF_FEATURE, LEAF_THRESHOLD, NO_CHILD, TreeArrays};
pub use forest::{ForestConfig, RandomForest};
pub use node::{FeatureIndex, Node, NodeIndex};
pub use scaler::{ScalerParams, StandardScaler};
pub use split::gini;
pub use tree::{DecisionTree, DecisionTreeConfig};
