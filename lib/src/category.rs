//! Ordinal stress categories derived from a continuous score.
//!
//! Labels are encoded low=0, mid=1, high=2; the two thresholds sit at the
//! thirds between those integers. The same function categorizes single
//! predictions, whole evaluation batches and ground-truth labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scores below this are [`StressCategory::Low`].
pub const LOW_MID_THRESHOLD: f64 = 0.67;
/// Scores at or above this are [`StressCategory::High`].
pub const MID_HIGH_THRESHOLD: f64 = 1.33;

/// Stress level reported to the caller. Ordered `Low < Mid < High`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressCategory {
    Low,
    Mid,
    High,
}

/// Map a continuous stress score to its category.
///
/// NaN compares false against both thresholds and maps to `Low`; the model
/// never produces NaN for finite input.
pub fn categorize(score: f64) -> StressCategory {
    if score >= MID_HIGH_THRESHOLD {
        StressCategory::High
    } else if score >= LOW_MID_THRESHOLD {
        StressCategory::Mid
    } else {
        StressCategory::Low
    }
}

/// Categorize a batch of scores, preserving order.
pub fn categorize_all(scores: &[f64]) -> Vec<StressCategory> {
    scores.iter().copied().map(categorize).collect()
}

impl StressCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            StressCategory::Low => "low",
            StressCategory::Mid => "mid",
            StressCategory::High => "high",
        }
    }

    /// Category of a ground-truth label value.
    pub fn from_label(label: f64) -> Self {
        categorize(label)
    }

    pub fn description(self) -> &'static str {
        match self {
            StressCategory::Low => "Minimal stress levels, maintaining good mental health",
            StressCategory::Mid => "Moderate stress levels, may need some stress management",
            StressCategory::High => "High stress levels, consider seeking professional support",
        }
    }
}

impl fmt::Display for StressCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StressCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(StressCategory::Low),
            "mid" => Ok(StressCategory::Mid),
            "high" => Ok(StressCategory::High),
            other => Err(format!("unknown stress category `{other}`")),
        }
    }
}
