//! Data preprocessing transformers.
//!
//! # Core Traits
//!
//! - [`Transformer`]: Unfitted transformer with hyperparameters
//! - [`FittedTransformer`]: Fitted transformer ready for inference
//!
//! # Example
//!
//! ```rust
//! use stressmeter::preprocessing::{FittedTransformer, StandardScaler, Transformer};
//! use ndarray::array;
//!
//! let training = array![[1.0, 10.0], [3.0, 30.0]];
//! let fitted = StandardScaler::new().fit(training.view()).unwrap();
//!
//! let scaled = fitted.transform(array![[2.0, 20.0]].view()).unwrap();
//! assert_eq!(scaled[[0, 0]], 0.0);
//! ```

pub mod scaling;
pub mod traits;

pub use scaling::{
    FittedStandardScaler, StandardScaler, StandardScalerParams,
};
pub use traits::{FittedTransformer, Transformer};
