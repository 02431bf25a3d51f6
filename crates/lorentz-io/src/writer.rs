//! CSV and JSON artifact writer with atomic replacement.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use lorentz_synth::{Dataset, FEATURE_NAMES, Sample};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Writes pipeline artifacts into an output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Every file is written to a `.tmp` sibling first and renamed into
/// place, so a crash mid-write never leaves a truncated artifact.
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    /// Create a new writer targeting the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display()))]
    pub fn new(output_dir: &Path) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Write a labeled dataset to `input.csv`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_samples = dataset.len()))]
    pub fn write_dataset(&self, dataset: &Dataset) -> Result<PathBuf, IoError> {
        let path = self.output_dir.join("input.csv");

        let mut wtr = csv::Writer::from_writer(Vec::new());
        let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
        header.push("label");
        self.write_rows(&mut wtr, &header, dataset.samples(), None, &path)?;

        let bytes = wtr
            .into_inner()
            .expect("in-memory CSV writer cannot fail to flush");
        write_atomic(&path, &bytes)?;

        info!(path = %path.display(), "dataset written");
        Ok(path)
    }

    /// Write scaler parameters to `scaler.json`.
    ///
    /// The artifact holds two parallel arrays, `mean` and `scale`, in
    /// feature column order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_scaler(&self, mean: &[f64], scale: &[f64]) -> Result<PathBuf, IoError> {
        let path = self.output_dir.join("scaler.json");

        let artifact = ScalerArtifact { mean, scale };
        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        write_atomic(&path, json.as_bytes())?;

        info!(path = %path.display(), "scaler parameters written");
        Ok(path)
    }

    /// Write held-out samples and their predicted labels to `test.csv`.
    ///
    /// Rows carry the unscaled feature values, the true `label`, and the
    /// predicted `model_label`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::PredictionCountMismatch`] | `predictions.len() != samples.len()` |
    /// | [`IoError::WriteFile`] | File cannot be written |
    #[instrument(skip_all, fields(n_samples = samples.len()))]
    pub fn write_predictions(
        &self,
        samples: &[Sample],
        predictions: &[usize],
    ) -> Result<PathBuf, IoError> {
        let path = self.output_dir.join("test.csv");

        if samples.len() != predictions.len() {
            return Err(IoError::PredictionCountMismatch {
                n_samples: samples.len(),
                n_predictions: predictions.len(),
            });
        }

        let mut wtr = csv::Writer::from_writer(Vec::new());
        let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
        header.push("label");
        header.push("model_label");
        self.write_rows(&mut wtr, &header, samples, Some(predictions), &path)?;

        let bytes = wtr
            .into_inner()
            .expect("in-memory CSV writer cannot fail to flush");
        write_atomic(&path, &bytes)?;

        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Return the path where the forest model should be saved.
    ///
    /// Does not write anything, just computes `{output_dir}/rf_model.json`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.output_dir.join("rf_model.json")
    }

    fn write_rows(
        &self,
        wtr: &mut csv::Writer<Vec<u8>>,
        header: &[&str],
        samples: &[Sample],
        predictions: Option<&[usize]>,
        path: &Path,
    ) -> Result<(), IoError> {
        let map_err = |e: csv::Error| IoError::WriteFile {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        };

        wtr.write_record(header).map_err(map_err)?;
        for (i, sample) in samples.iter().enumerate() {
            let mut record: Vec<String> = sample
                .features()
                .iter()
                .map(ToString::to_string)
                .collect();
            record.push(sample.label().to_string());
            if let Some(preds) = predictions {
                record.push(preds[i].to_string());
            }
            wtr.write_record(&record).map_err(map_err)?;
        }
        Ok(())
    }
}

/// Write `bytes` to a `.tmp` sibling of `path`, then rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    fs::write(&tmp, bytes).map_err(|e| IoError::WriteFile {
        path: tmp.clone(),
        source: e,
    })?;
    fs::rename(&tmp, path).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

#[derive(Serialize)]
struct ScalerArtifact<'a> {
    mean: &'a [f64],
    scale: &'a [f64],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SampleReader;
    use lorentz_synth::GeneratorConfig;
    use tempfile::TempDir;

    fn test_dataset() -> Dataset {
        GeneratorConfig::new(20).unwrap().with_seed(42).generate()
    }

    #[test]
    fn dataset_round_trips_through_csv() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        let ds = test_dataset();

        let path = writer.write_dataset(&ds).unwrap();
        assert_eq!(path, dir.path().join("input.csv"));

        let restored = SampleReader::new(&path).read().unwrap();
        assert_eq!(restored.samples(), ds.samples());
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        writer.write_dataset(&test_dataset()).unwrap();

        assert!(dir.path().join("input.csv").exists());
        assert!(!dir.path().join("input.csv.tmp").exists());
    }

    #[test]
    fn scaler_json_structure() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();

        let path = writer
            .write_scaler(&[0.1, 150.0, 0.0, 0.0], &[0.5, 80.0, 5.0, 1.0])
            .unwrap();
        assert_eq!(path, dir.path().join("scaler.json"));

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(content["mean"].as_array().unwrap().len(), 4);
        assert_eq!(content["scale"].as_array().unwrap().len(), 4);
        assert_eq!(content["mean"][1], 150.0);
        assert_eq!(content["scale"][1], 80.0);
    }

    #[test]
    fn predictions_csv_has_both_label_columns() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        let ds = test_dataset();
        let predictions: Vec<usize> = ds.samples().iter().map(|s| 1 - s.label()).collect();

        let path = writer.write_predictions(ds.samples(), &predictions).unwrap();
        assert_eq!(path, dir.path().join("test.csv"));

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "magnetic_field,electric_field,position,momentum,label,model_label"
        );
        for (line, sample) in lines.zip(ds.samples()) {
            let cells: Vec<&str> = line.split(',').collect();
            assert_eq!(cells.len(), 6);
            assert_eq!(cells[4], sample.label().to_string());
            assert_eq!(cells[5], (1 - sample.label()).to_string());
        }
    }

    #[test]
    fn prediction_count_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        let ds = test_dataset();

        let result = writer.write_predictions(ds.samples(), &[0, 1]);
        assert!(matches!(
            result,
            Err(IoError::PredictionCountMismatch {
                n_samples: 20,
                n_predictions: 2,
            })
        ));
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let writer = ArtifactWriter::new(&nested).unwrap();
        writer.write_dataset(&test_dataset()).unwrap();
        assert!(nested.join("input.csv").exists());
    }

    #[test]
    fn model_path_is_stable() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        assert_eq!(writer.model_path(), dir.path().join("rf_model.json"));
    }
}
