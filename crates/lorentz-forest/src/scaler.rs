//! Per-column feature standardization with persisted parameters.

use tracing::{debug, warn};

use crate::error::ForestError;

/// Persisted standardization parameters, one entry per feature column.
///
/// `scale` is the population standard deviation with zero-variance columns
/// floored to 1.0, so `(x - mean) / scale` is always defined. Serialized as
/// `{"mean": [...], "scale": [...]}` in column order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScalerParams {
    /// Per-column arithmetic mean.
    pub mean: Vec<f64>,
    /// Per-column scale divisor (population std, floored to 1.0).
    pub scale: Vec<f64>,
}

/// A fitted standard scaler.
///
/// Fit once on the training partition; the same parameters transform both
/// train and test rows. Refitting on test data would leak its statistics
/// into the model, so there is deliberately no mutating API.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    params: ScalerParams,
}

impl StandardScaler {
    /// Fit per-column mean and population standard deviation.
    ///
    /// Columns with exactly zero variance get `scale = 1.0` (the
    /// standardization convention: the transform then just centers them)
    /// and a warning is logged.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | zero rows |
    /// | [`ForestError::ZeroFeatures`] | zero columns |
    /// | [`ForestError::FeatureCountMismatch`] | inconsistent row lengths |
    /// | [`ForestError::NonFiniteValue`] | NaN or infinite cell |
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ForestError> {
        if rows.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let n_features = rows[0].len();
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }
        for (sample_index, row) in rows.iter().enumerate() {
            if row.len() != n_features {
                return Err(ForestError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            for (feature_index, &val) in row.iter().enumerate() {
                if !val.is_finite() {
                    return Err(ForestError::NonFiniteValue {
                        sample_index,
                        feature_index,
                    });
                }
            }
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0f64; n_features];
        let mut scale = vec![0.0f64; n_features];

        for col in 0..n_features {
            let m = rows.iter().map(|row| row[col]).sum::<f64>() / n;
            let variance = rows.iter().map(|row| (row[col] - m).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            mean[col] = m;
            scale[col] = if std == 0.0 {
                warn!(column = col, "zero-variance feature column, scale floored to 1.0");
                1.0
            } else {
                std
            };
        }

        debug!(n_rows = rows.len(), n_features, "scaler fitted");

        Ok(Self {
            params: ScalerParams { mean, scale },
        })
    }

    /// Reconstruct a scaler from persisted parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidScalerParams`] when the vectors are
    /// empty, differ in length, or contain non-finite or non-positive
    /// scale entries.
    pub fn from_params(params: ScalerParams) -> Result<Self, ForestError> {
        if params.mean.is_empty() {
            return Err(ForestError::InvalidScalerParams {
                reason: "mean vector is empty".to_string(),
            });
        }
        if params.mean.len() != params.scale.len() {
            return Err(ForestError::InvalidScalerParams {
                reason: format!(
                    "mean has {} entries but scale has {}",
                    params.mean.len(),
                    params.scale.len()
                ),
            });
        }
        if params.mean.iter().any(|v| !v.is_finite()) {
            return Err(ForestError::InvalidScalerParams {
                reason: "mean contains a non-finite value".to_string(),
            });
        }
        if params.scale.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ForestError::InvalidScalerParams {
                reason: "scale contains a non-finite or non-positive value".to_string(),
            });
        }
        Ok(Self { params })
    }

    /// Apply `(value - mean) / scale` elementwise, per column.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::FeatureCountMismatch`] when a row's length
    /// differs from the fitted column count.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ForestError> {
        let n_features = self.params.mean.len();
        rows.iter()
            .enumerate()
            .map(|(sample_index, row)| {
                if row.len() != n_features {
                    return Err(ForestError::FeatureCountMismatch {
                        expected: n_features,
                        got: row.len(),
                        sample_index,
                    });
                }
                Ok(row
                    .iter()
                    .enumerate()
                    .map(|(col, &v)| (v - self.params.mean[col]) / self.params.scale[col])
                    .collect())
            })
            .collect()
    }

    /// Return the fitted parameters.
    #[must_use]
    pub fn params(&self) -> &ScalerParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 100.0],
            vec![2.0, 200.0],
            vec![3.0, 300.0],
            vec![4.0, 400.0],
        ]
    }

    #[test]
    fn transformed_training_set_is_standardized() {
        let data = rows();
        let scaler = StandardScaler::fit(&data).unwrap();
        let scaled = scaler.transform(&data).unwrap();

        for col in 0..2 {
            let n = scaled.len() as f64;
            let mean = scaled.iter().map(|r| r[col]).sum::<f64>() / n;
            let var = scaled.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
            assert!(mean.abs() < 1e-10, "col {col} mean = {mean}");
            assert!((var - 1.0).abs() < 1e-10, "col {col} var = {var}");
        }
    }

    #[test]
    fn uses_population_std() {
        let data = vec![vec![1.0], vec![3.0]];
        let scaler = StandardScaler::fit(&data).unwrap();
        // Population std of {1, 3} is 1.0 (sample std would be sqrt(2)).
        assert!((scaler.params().scale[0] - 1.0).abs() < 1e-12);
        assert!((scaler.params().mean[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_variance_column_floored() {
        let data = vec![vec![5.0, 1.0], vec![5.0, 2.0], vec![5.0, 3.0]];
        let scaler = StandardScaler::fit(&data).unwrap();
        assert!((scaler.params().scale[0] - 1.0).abs() < f64::EPSILON);
        // Transform centers the constant column without dividing by zero.
        let scaled = scaler.transform(&data).unwrap();
        for row in &scaled {
            assert!((row[0] - 0.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn params_round_trip() {
        let data = rows();
        let scaler = StandardScaler::fit(&data).unwrap();
        let restored = StandardScaler::from_params(scaler.params().clone()).unwrap();
        assert_eq!(
            scaler.transform(&data).unwrap(),
            restored.transform(&data).unwrap()
        );
    }

    #[test]
    fn test_rows_share_train_params() {
        let train = rows();
        let test = vec![vec![2.5, 250.0]];
        let scaler = StandardScaler::fit(&train).unwrap();
        let scaled = scaler.transform(&test).unwrap();
        // (2.5 - 2.5) / std = 0 exactly for the symmetric train set.
        assert!(scaled[0][0].abs() < 1e-12);
        assert!(scaled[0][1].abs() < 1e-12);
    }

    #[test]
    fn empty_rows_error() {
        assert!(matches!(
            StandardScaler::fit(&[]),
            Err(ForestError::EmptyDataset)
        ));
    }

    #[test]
    fn inconsistent_rows_error() {
        let data = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            StandardScaler::fit(&data),
            Err(ForestError::FeatureCountMismatch { .. })
        ));
    }

    #[test]
    fn non_finite_error() {
        let data = vec![vec![1.0], vec![f64::INFINITY]];
        assert!(matches!(
            StandardScaler::fit(&data),
            Err(ForestError::NonFiniteValue { .. })
        ));
    }

    #[test]
    fn from_params_rejects_mismatched_lengths() {
        let params = ScalerParams {
            mean: vec![0.0, 1.0],
            scale: vec![1.0],
        };
        assert!(matches!(
            StandardScaler::from_params(params),
            Err(ForestError::InvalidScalerParams { .. })
        ));
    }

    #[test]
    fn from_params_rejects_zero_scale() {
        let params = ScalerParams {
            mean: vec![0.0],
            scale: vec![0.0],
        };
        assert!(matches!(
            StandardScaler::from_params(params),
            Err(ForestError::InvalidScalerParams { .. })
        ));
    }

    #[test]
    fn transform_length_mismatch_error() {
        let scaler = StandardScaler::fit(&rows()).unwrap();
        let err = scaler.transform(&[vec![1.0]]).unwrap_err();
        assert!(matches!(err, ForestError::FeatureCountMismatch { .. }));
    }
}
