//! Gradient-boosted ensemble of oblivious regression trees.
//!
//! Training minimizes squared error. Each round fits one depth-limited
//! symmetric tree to the current residuals on a Bernoulli subsample of the
//! training rows, with an L2 penalty on leaf values. When a validation set
//! is supplied, the ensemble is cut back to the round with the lowest
//! validation RMSE once `early_stopping_rounds` rounds pass without
//! improvement.

mod binning;
mod booster;
pub mod params;
mod tree;

pub use booster::{FittedGbdt, GbdtModelParams, GbdtRegressor};
pub use params::BoostingParams;
pub use tree::{ObliviousTree, Split};
