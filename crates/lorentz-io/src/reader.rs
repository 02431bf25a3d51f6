//! CSV dataset reader with full input validation.

use std::path::{Path, PathBuf};

use lorentz_synth::{Dataset, FEATURE_NAMES, N_FEATURES, Sample};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads labeled samples from a CSV file.
///
/// Expected CSV format:
/// - Header row required, exactly
///   `magnetic_field,electric_field,position,momentum,label`
/// - One row per sample; features are finite floats, label is `0` or `1`
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::HeaderMismatch`] | Header differs from the expected columns |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::MalformedField`] | Feature cell is NaN, Inf, or unparseable |
/// | [`IoError::InvalidLabel`] | Label cell is not `0` or `1` |
pub struct SampleReader {
    path: PathBuf,
}

impl SampleReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn expected_header() -> String {
        let mut cols: Vec<&str> = FEATURE_NAMES.to_vec();
        cols.push("label");
        cols.join(",")
    }

    /// Read and validate the CSV file, returning a [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets rows with varying column counts through so
        // our own InconsistentRowLength check fires instead of a
        // low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;
        let got: Vec<&str> = header.iter().collect();
        let expected = Self::expected_header();
        if got.join(",") != expected {
            return Err(IoError::HeaderMismatch {
                path: self.path.clone(),
                expected,
                got: got.join(","),
            });
        }
        let expected_cols = N_FEATURES + 1;
        debug!(expected_cols, "read CSV header");

        let mut samples = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let mut features = [0.0f64; N_FEATURES];
            for (col_index, &column) in FEATURE_NAMES.iter().enumerate() {
                let raw = record.get(col_index).unwrap_or("");
                let value: f64 = raw.parse().map_err(|_| IoError::MalformedField {
                    path: self.path.clone(),
                    row_index,
                    column,
                    raw: raw.to_string(),
                })?;
                if !value.is_finite() {
                    return Err(IoError::MalformedField {
                        path: self.path.clone(),
                        row_index,
                        column,
                        raw: raw.to_string(),
                    });
                }
                features[col_index] = value;
            }

            let raw_label = record.get(N_FEATURES).unwrap_or("");
            let label = match raw_label.trim() {
                "0" => 0,
                "1" => 1,
                _ => {
                    return Err(IoError::InvalidLabel {
                        path: self.path.clone(),
                        row_index,
                        raw: raw_label.to_string(),
                    });
                }
            };

            // Features and label are already validated above.
            let sample = Sample::new(features[0], features[1], features[2], features[3], label)
                .expect("validated fields always construct");
            samples.push(sample);
        }

        if samples.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let dataset = Dataset::new(samples);
        let (n_label0, n_label1) = dataset.label_counts();
        info!(
            n_samples = dataset.len(),
            n_label0, n_label1, "dataset loaded"
        );

        Ok(dataset)
    }
}
