//! Feature quantization for split search.
//!
//! Each feature gets a sorted list of borders learned from the training
//! rows. A value's bin is the number of borders strictly below it, so
//! `value > borders[k]` holds exactly when `bin > k`. Split search works on
//! bins; prediction compares raw values against the stored border.

use ndarray::ArrayView2;

/// Candidate split thresholds for one feature.
///
/// Borders are midpoints between consecutive distinct training values,
/// thinned to at most `max_bins` evenly spaced picks.
pub(crate) fn feature_borders(values: impl Iterator<Item = f64>, max_bins: usize) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();

    let midpoints: Vec<f64> = sorted.windows(2).map(|w| w[0] + (w[1] - w[0]) / 2.0).collect();
    if midpoints.len() <= max_bins {
        return midpoints;
    }

    let len = midpoints.len();
    let mut picked: Vec<f64> = (0..max_bins)
        .map(|i| midpoints[(i * len + len / 2) / max_bins])
        .collect();
    picked.dedup();
    picked
}

#[inline]
pub(crate) fn bin_of(borders: &[f64], value: f64) -> u8 {
    borders.partition_point(|b| *b < value) as u8
}

/// Training matrix quantized column by column.
#[derive(Clone, Debug)]
pub(crate) struct BinnedFeatures {
    pub borders: Vec<Vec<f64>>,
    /// `bins[feature][row]`
    pub bins: Vec<Vec<u8>>,
}

impl BinnedFeatures {
    /// `max_bins` is capped at 254 so every bin index fits in a `u8`.
    pub fn build(features: ArrayView2<'_, f64>, max_bins: usize) -> Self {
        let max_bins = max_bins.min(u8::MAX as usize - 1);
        let (borders, bins) = features
            .columns()
            .into_iter()
            .map(|column| {
                let borders = feature_borders(column.iter().copied(), max_bins);
                let bins = column.iter().map(|&v| bin_of(&borders, v)).collect();
                (borders, bins)
            })
            .unzip();
        Self { borders, bins }
    }

    pub fn n_features(&self) -> usize {
        self.borders.len()
    }

    /// Bins per feature, one more than its border count.
    pub fn n_bins(&self, feature: usize) -> usize {
        self.borders[feature].len() + 1
    }
}
