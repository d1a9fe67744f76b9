//! Standard Scaler (Z-score normalization).
//!
//! Transforms features by removing the mean and scaling to unit variance.
//!
//! The standard score of a sample `x` is calculated as:
//! ```text
//! z = (x - u) / s
//! ```
//! where `u` is the mean of the training samples, and `s` is the population
//! standard deviation. A constant column (`s == 0`) maps to exactly `0`.
//!
//! # Example
//! ```ignore
//! use stressmeter::preprocessing::{FittedTransformer, StandardScaler, Transformer};
//!
//! let fitted = StandardScaler::new().fit(data.view())?;
//! let scaled = fitted.transform(data.view())?;
//!
//! // Later, for inference:
//! fitted.save_to_file("scaler.bin")?;
//! let loaded = FittedStandardScaler::load_from_file("scaler.bin")?;
//! let row = loaded.transform_row(&answers)?;
//! ```

use crate::error::{Result, StressError};
use crate::features::{Feature, FeatureVector, N_FEATURES};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Serializable parameters for a fitted StandardScaler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScalerParams {
    /// Mean of each feature.
    pub mean: Vec<f64>,
    /// Population standard deviation of each feature; 0 marks a constant column.
    pub std: Vec<f64>,
    pub n_features: usize,
}

/// StandardScaler transformer (unfitted). Always centers and scales.
#[derive(Clone, Debug, Default)]
pub struct StandardScaler;

impl StandardScaler {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for StandardScaler {
    type Fitted = FittedStandardScaler;

    fn fit(&self, data: ArrayView2<'_, f64>) -> Result<Self::Fitted> {
        let (rows, cols) = data.dim();

        if rows == 0 {
            return Err(StressError::EmptyDataset(
                "cannot fit StandardScaler on zero rows".to_string(),
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(StressError::InvalidParameter(
                "StandardScaler input contains NaN or infinite values".to_string(),
            ));
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| StressError::EmptyDataset("no rows".to_string()))?;
        let std = data.std_axis(Axis(0), 0.0); // population std (ddof=0)

        let constant: Vec<&str> = std
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == 0.0)
            .map(|(j, _)| column_name(j, cols))
            .collect();
        if !constant.is_empty() {
            tracing::warn!(columns = ?constant, "constant columns will scale to 0");
        }

        tracing::info!(rows, cols, "fitted standard scaler");

        Ok(FittedStandardScaler {
            mean,
            std,
            n_features: cols,
        })
    }
}

fn column_name(j: usize, cols: usize) -> &'static str {
    if cols == N_FEATURES {
        Feature::ALL[j].name()
    } else {
        "<unnamed>"
    }
}

/// Fitted StandardScaler ready for inference.
///
/// Immutable once built; share it freely between threads.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedStandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
    n_features: usize,
}

impl FittedStandardScaler {
    /// Get the mean values for each feature.
    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    /// Get the standard deviation values for each feature.
    pub fn std(&self) -> ArrayView1<'_, f64> {
        self.std.view()
    }

    fn check_columns(&self, cols: usize) -> Result<()> {
        if cols != self.n_features {
            return Err(StressError::schema(
                format!("{} features", self.n_features),
                format!("{cols} features"),
            ));
        }
        Ok(())
    }

    fn scale_value(&self, j: usize, value: f64) -> f64 {
        let s = self.std[j];
        if s == 0.0 {
            0.0
        } else {
            (value - self.mean[j]) / s
        }
    }

    fn unscale_value(&self, j: usize, value: f64) -> f64 {
        let s = self.std[j];
        let unscaled = if s == 0.0 { 0.0 } else { value * s };
        unscaled + self.mean[j]
    }

    /// Scale one survey response.
    pub fn transform_row(&self, row: &FeatureVector) -> Result<Array1<f64>> {
        self.check_columns(N_FEATURES)?;
        Ok(Array1::from_iter(
            row.as_slice()
                .iter()
                .enumerate()
                .map(|(j, &v)| self.scale_value(j, v)),
        ))
    }
}

impl FittedTransformer for FittedStandardScaler {
    type Params = StandardScalerParams;

    fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_columns(data.ncols())?;
        let mut result = data.to_owned();
        for mut row in result.rows_mut() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = self.scale_value(j, *v);
            }
        }
        Ok(result)
    }

    fn inverse_transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_columns(data.ncols())?;
        let mut result = data.to_owned();
        for mut row in result.rows_mut() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = self.unscale_value(j, *v);
            }
        }
        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        StandardScalerParams {
            mean: self.mean.to_vec(),
            std: self.std.to_vec(),
            n_features: self.n_features,
        }
    }

    fn from_params(params: Self::Params) -> Result<Self> {
        if params.mean.len() != params.n_features || params.std.len() != params.n_features {
            return Err(StressError::schema(
                format!("{} mean/std entries", params.n_features),
                format!("{}/{}", params.mean.len(), params.std.len()),
            ));
        }
        Ok(Self {
            mean: Array1::from_vec(params.mean),
            std: Array1::from_vec(params.std),
            n_features: params.n_features,
        })
    }

    fn n_features_in(&self) -> usize {
        self.n_features
    }
}
