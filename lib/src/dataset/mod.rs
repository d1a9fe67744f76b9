//! Labeled survey data.
//!
//! A [`LabeledDataset`] holds a feature matrix of shape `(n_samples, 20)` in
//! [`Feature::ALL`](crate::features::Feature::ALL) column order and a label
//! vector of shape `(n_samples,)` with the continuous stress level.
//!
//! # Example
//!
//! ```rust
//! use stressmeter::dataset::{LabeledDataset, SplitRatios};
//! use ndarray::{Array1, Array2};
//!
//! let x = Array2::<f64>::zeros((20, 20));
//! let y = Array1::<f64>::zeros(20);
//! let dataset = LabeledDataset::new(x, y).unwrap();
//!
//! let split = dataset.split(SplitRatios::default(), 42).unwrap();
//! assert_eq!(split.train.len() + split.validation.len() + split.test.len(), 20);
//! ```

use crate::error::{Result, StressError};
use crate::features::N_FEATURES;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

pub mod loader;
pub mod split;
pub mod synthetic;

pub use self::loader::DEFAULT_LABEL_COLUMN;
pub use self::split::{DatasetSplit, KFold, SplitRatios, DEFAULT_SPLIT_SEED};
pub use self::synthetic::synthetic_survey;

/// Survey responses paired with their stress-level labels.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledDataset {
    features: Array2<f64>,
    labels: Array1<f64>,
}

impl LabeledDataset {
    /// Pair a feature matrix with its labels.
    ///
    /// Fails with [`StressError::SchemaMismatch`] when the matrix does not
    /// have 20 columns or the row and label counts differ. An empty dataset
    /// is allowed here; operations that need rows reject it themselves.
    pub fn new(features: Array2<f64>, labels: Array1<f64>) -> Result<Self> {
        if features.ncols() != N_FEATURES {
            return Err(StressError::schema(
                format!("{N_FEATURES} feature columns"),
                format!("{} columns", features.ncols()),
            ));
        }
        if features.nrows() != labels.len() {
            return Err(StressError::schema(
                format!("{} labels", features.nrows()),
                format!("{} labels", labels.len()),
            ));
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn labels(&self) -> ArrayView1<'_, f64> {
        self.labels.view()
    }

    /// Rows at `indices`, in the order given.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }

    /// Same labels, different (e.g. scaled) feature matrix.
    pub fn with_features(&self, features: Array2<f64>) -> Result<Self> {
        Self::new(features, self.labels.clone())
    }

    pub fn into_parts(self) -> (Array2<f64>, Array1<f64>) {
        (self.features, self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential(n: usize) -> LabeledDataset {
        let x = Array2::from_shape_fn((n, N_FEATURES), |(i, j)| (i * N_FEATURES + j) as f64);
        let y = Array1::from_iter((0..n).map(|i| (i % 3) as f64));
        LabeledDataset::new(x, y).unwrap()
    }

    #[test]
    fn test_dataset_len() {
        let ds = sequential(5);
        assert_eq!(ds.len(), 5);
        assert!(!ds.is_empty());
    }

    #[test]
    fn test_dataset_wrong_column_count() {
        let x = Array2::<f64>::zeros((3, 4));
        let y = Array1::<f64>::zeros(3);
        assert!(matches!(
            LabeledDataset::new(x, y),
            Err(StressError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_dataset_label_count_mismatch() {
        let x = Array2::<f64>::zeros((3, N_FEATURES));
        let y = Array1::<f64>::zeros(2);
        assert!(LabeledDataset::new(x, y).is_err());
    }

    #[test]
    fn test_select_keeps_rows_and_labels_aligned() {
        let ds = sequential(6);
        let subset = ds.select(&[4, 1]);
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.features()[[0, 0]], (4 * N_FEATURES) as f64);
        assert_eq!(subset.labels()[0], 1.0);
        assert_eq!(subset.labels()[1], 1.0);
        assert_eq!(subset.features()[[1, 0]], N_FEATURES as f64);
    }

    #[test]
    fn test_empty_dataset_allowed() {
        let ds = LabeledDataset::new(
            Array2::<f64>::zeros((0, N_FEATURES)),
            Array1::<f64>::zeros(0),
        )
        .unwrap();
        assert!(ds.is_empty());
    }
}
