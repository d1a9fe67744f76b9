//! Scaling transformers for feature normalization.
//!
//! Gradient boosting itself is scale-invariant, but the survey columns span
//! different ranges (0–30, 0–5, 0/1) and the scaled representation is part of
//! the persisted pipeline contract, so inference must reproduce it exactly.

pub mod standard;

pub use standard::{
    FittedStandardScaler, StandardScaler, StandardScalerParams,
};
