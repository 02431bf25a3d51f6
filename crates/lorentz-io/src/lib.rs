//! CSV and JSON artifact I/O for the training pipeline.
//!
//! Reads labeled sample CSVs with strict validation and writes pipeline
//! artifacts (dataset CSV, scaler parameters, test predictions) with
//! atomic tmp-then-rename replacement.

mod error;
mod reader;
mod writer;

pub use error::IoError;
pub use reader::SampleReader;
pub use writer::ArtifactWriter;
