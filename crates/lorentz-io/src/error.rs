//! I/O error types for lorentz-io.

use std::path::PathBuf;

/// Errors from CSV parsing and artifact serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the header row does not match the expected columns.
    #[error("header mismatch in {path}: expected \"{expected}\", got \"{got}\"")]
    HeaderMismatch {
        /// Path to the CSV file.
        path: PathBuf,
        /// The expected comma-joined header.
        expected: String,
        /// The header actually present.
        got: String,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a feature cell is NaN, Inf, or not a parseable float.
    #[error("malformed value in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    MalformedField {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Name of the offending column.
        column: &'static str,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a label cell is anything other than "0" or "1".
    #[error("invalid label in {path}: row {row_index}, raw value \"{raw}\" (expected 0 or 1)")]
    InvalidLabel {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The raw string value of the label cell.
        raw: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an artifact file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when predictions and samples disagree in length.
    #[error("prediction count mismatch: {n_samples} samples but {n_predictions} predictions")]
    PredictionCountMismatch {
        /// Number of samples to be written.
        n_samples: usize,
        /// Number of predictions supplied.
        n_predictions: usize,
    },
}
