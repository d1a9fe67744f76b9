//! Seeded generator of survey-shaped data.
//!
//! Rows follow the declared feature ranges and labels take the values
//! 0, 1 and 2. Risk factors rise with the label and protective factors
//! fall, with enough noise that categories overlap. Used for demos,
//! benchmarks and tests when the real survey CSV is not at hand.

use super::LabeledDataset;
use crate::features::{Feature, N_FEATURES};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// `+1` when the feature grows with stress, `-1` when it shrinks.
fn direction(feature: Feature) -> f64 {
    match feature {
        Feature::SelfEsteem
        | Feature::SleepQuality
        | Feature::LivingConditions
        | Feature::Safety
        | Feature::BasicNeeds
        | Feature::AcademicPerformance
        | Feature::TeacherStudentRelationship
        | Feature::SocialSupport => -1.0,
        _ => 1.0,
    }
}

/// `n` labeled rows; the same `(n, seed)` always yields the same dataset.
pub fn synthetic_survey(n: usize, seed: u64) -> LabeledDataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Array2::<f64>::zeros((n, N_FEATURES));
    let mut labels = Array1::<f64>::zeros(n);

    for i in 0..n {
        let level = rng.gen_range(0..3u8);
        // Centered on the mid class.
        let shift = f64::from(level) - 1.0;
        labels[i] = f64::from(level);

        for feature in Feature::ALL {
            let range = feature.range();
            let value = if feature.is_binary() {
                let p = 0.15 + 0.3 * f64::from(level);
                f64::from(u8::from(rng.gen_bool(p)))
            } else {
                let span = range.max - range.min;
                let center = range.min + span / 2.0;
                let noise: f64 = rng.gen_range(-1.0..1.0);
                let raw = center + direction(feature) * shift * span * 0.25 + noise * span * 0.25;
                raw.round().clamp(range.min, range.max)
            };
            features[[i, feature.index()]] = value;
        }
    }

    // Shapes are fixed above, so construction cannot fail.
    LabeledDataset { features, labels }
}
