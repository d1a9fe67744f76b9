//! Oblivious (symmetric) regression trees.
//!
//! Every node on a given level tests the same `(feature, border)` pair, so a
//! tree of depth `d` is a list of `d` splits plus `2^d` leaf values. The leaf
//! index is the bit pattern of the split outcomes, level 0 in the lowest bit.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// One level of an oblivious tree: rows with `value > border` go right.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub feature: usize,
    pub border: f64,
    /// Loss reduction this split achieved when it was chosen.
    pub gain: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObliviousTree {
    pub splits: Vec<Split>,
    /// `2^splits.len()` values, already scaled by the learning rate.
    pub leaf_values: Vec<f64>,
}

impl ObliviousTree {
    pub fn depth(&self) -> usize {
        self.splits.len()
    }

    pub fn leaf_index(&self, row: ArrayView1<'_, f64>) -> usize {
        self.splits
            .iter()
            .enumerate()
            .fold(0, |leaf, (level, split)| {
                leaf | (usize::from(row[split.feature] > split.border) << level)
            })
    }

    /// `row` must hold at least `max(split.feature) + 1` values.
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.leaf_values[self.leaf_index(row)]
    }

    pub(crate) fn is_well_formed(&self, n_features: usize) -> bool {
        self.leaf_values.len() == 1usize << self.splits.len()
            && self.leaf_values.iter().all(|v| v.is_finite())
            && self
                .splits
                .iter()
                .all(|s| s.feature < n_features && s.border.is_finite() && s.gain.is_finite())
    }
}
