//! Boosting hyperparameters.

use crate::error::{Result, StressError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ITERATIONS: usize = 1000;
pub const DEFAULT_LEARNING_RATE: f64 = 0.03;
pub const DEFAULT_DEPTH: usize = 6;
pub const DEFAULT_L2_LEAF_REG: f64 = 3.0;
pub const DEFAULT_SUBSAMPLE: f64 = 0.8;
pub const DEFAULT_EARLY_STOPPING_ROUNDS: usize = 50;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_MAX_BINS: usize = 254;

/// Deepest tree supported; a depth-`d` oblivious tree has `2^d` leaves.
pub const MAX_DEPTH: usize = 16;

/// Missing fields take their `DEFAULT_*` value when deserialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoostingParams {
    /// Upper bound on boosting rounds.
    pub iterations: usize,
    pub learning_rate: f64,
    /// Levels in every tree.
    pub depth: usize,
    /// L2 penalty added to every leaf's row count.
    pub l2_leaf_reg: f64,
    /// Probability that a row takes part in a given round.
    pub subsample: f64,
    /// Rounds without validation improvement before training stops.
    pub early_stopping_rounds: usize,
    pub seed: u64,
    /// Maximum number of split borders per feature.
    pub max_bins: usize,
    /// Emit per-round debug events.
    pub verbose: bool,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            learning_rate: DEFAULT_LEARNING_RATE,
            depth: DEFAULT_DEPTH,
            l2_leaf_reg: DEFAULT_L2_LEAF_REG,
            subsample: DEFAULT_SUBSAMPLE,
            early_stopping_rounds: DEFAULT_EARLY_STOPPING_ROUNDS,
            seed: DEFAULT_SEED,
            max_bins: DEFAULT_MAX_BINS,
            verbose: false,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(StressError::InvalidParameter(msg));
        if self.iterations == 0 {
            return invalid("iterations must be at least 1".to_string());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if self.depth == 0 || self.depth > MAX_DEPTH {
            return invalid(format!(
                "depth must be in 1..={MAX_DEPTH}, got {}",
                self.depth
            ));
        }
        if !(self.l2_leaf_reg.is_finite() && self.l2_leaf_reg >= 0.0) {
            return invalid(format!(
                "l2_leaf_reg must be non-negative, got {}",
                self.l2_leaf_reg
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return invalid(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            ));
        }
        if self.early_stopping_rounds == 0 {
            return invalid("early_stopping_rounds must be at least 1".to_string());
        }
        if self.max_bins == 0 {
            return invalid("max_bins must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = BoostingParams::default();
        assert_eq!(p.iterations, 1000);
        assert_eq!(p.learning_rate, 0.03);
        assert_eq!(p.depth, 6);
        assert_eq!(p.l2_leaf_reg, 3.0);
        assert_eq!(p.subsample, 0.8);
        assert_eq!(p.early_stopping_rounds, 50);
        assert_eq!(p.seed, 42);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = BoostingParams::default();
        let cases = [
            BoostingParams { iterations: 0, ..base.clone() },
            BoostingParams { learning_rate: 0.0, ..base.clone() },
            BoostingParams { learning_rate: f64::NAN, ..base.clone() },
            BoostingParams { depth: 0, ..base.clone() },
            BoostingParams { depth: MAX_DEPTH + 1, ..base.clone() },
            BoostingParams { l2_leaf_reg: -1.0, ..base.clone() },
            BoostingParams { subsample: 0.0, ..base.clone() },
            BoostingParams { subsample: 1.5, ..base.clone() },
            BoostingParams { early_stopping_rounds: 0, ..base.clone() },
            BoostingParams { max_bins: 0, ..base.clone() },
        ];
        for params in cases {
            assert!(
                matches!(params.validate(), Err(StressError::InvalidParameter(_))),
                "{params:?} should be rejected"
            );
        }
    }
}
