//! Core traits for preprocessing transformers.
//!
//! This module defines the two central traits:
//! - [`Transformer`]: Used during fitting; has hyperparameters and can learn from data.
//! - [`FittedTransformer`]: After fitting; ready for inference and serialization.
//!
//! The split mirrors the model side of the crate: an unfitted transformer
//! cannot transform, so "transform before fit" is a type error rather than a
//! runtime surprise.

use crate::error::Result;
use crate::serialization::{self, SerializableParams};
use ndarray::{Array2, ArrayView2};
use std::path::Path;

/// Trait for unfitted transformers with hyperparameters.
///
/// # Example
/// ```ignore
/// use stressmeter::preprocessing::{Transformer, StandardScaler};
///
/// let scaler = StandardScaler::new();
/// let fitted = scaler.fit(data.view())?;
/// let transformed = fitted.transform(new_data.view())?;
/// ```
pub trait Transformer: Clone {
    /// The fitted transformer type ready for inference.
    type Fitted: FittedTransformer;

    /// Fit the transformer to the training data.
    ///
    /// # Errors
    /// Returns [`StressError`](crate::StressError) if:
    /// - Data is empty
    /// - Data contains invalid values (NaN, Inf)
    fn fit(&self, data: ArrayView2<'_, f64>) -> Result<Self::Fitted>;

    /// Fit the transformer and transform the data in one step.
    fn fit_transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let fitted = self.fit(data)?;
        fitted.transform(data)
    }
}

/// Trait for fitted transformers ready for inference.
///
/// # Guarantees
/// - `extract_params()` + `from_params()` is a round-trip.
/// - `save_to_file` / `load_from_file` store floats bit-exactly.
pub trait FittedTransformer: Clone {
    /// Serializable representation of learned parameters.
    type Params: SerializableParams;

    /// Transform data using learned parameters.
    ///
    /// # Errors
    /// Returns [`StressError::SchemaMismatch`](crate::StressError::SchemaMismatch)
    /// if the column count differs from the one seen during fit.
    fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// Reverse the transformation.
    fn inverse_transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// Extract learned parameters as a serializable representation.
    fn extract_params(&self) -> Self::Params;

    /// Reconstruct a fitted transformer from parameters.
    fn from_params(params: Self::Params) -> Result<Self>
    where
        Self: Sized;

    /// Returns the number of features seen during fit.
    fn n_features_in(&self) -> usize;

    /// Save the fitted transformer to a file.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        serialization::save_params(&self.extract_params(), path.as_ref())
    }

    /// Load a fitted transformer from a file.
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self>
    where
        Self: Sized,
    {
        let params = serialization::load_params::<Self::Params>(path.as_ref())?;
        Self::from_params(params)
    }
}
