//! Deterministic train/validation/test partitioning and k-fold indices.

use super::LabeledDataset;
use crate::error::{Result, StressError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Seed used when the caller does not pick one.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Fractions of the dataset assigned to each partition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub validation: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.70,
            validation: 0.15,
            test: 0.15,
        }
    }
}

impl SplitRatios {
    pub fn new(train: f64, validation: f64, test: f64) -> Result<Self> {
        let ratios = Self {
            train,
            validation,
            test,
        };
        ratios.validate()?;
        Ok(ratios)
    }

    pub fn validate(&self) -> Result<()> {
        let parts = [self.train, self.validation, self.test];
        if parts.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(StressError::InvalidParameter(format!(
                "split ratios must be non-negative, got {parts:?}"
            )));
        }
        if self.train <= 0.0 {
            return Err(StressError::InvalidParameter(
                "train ratio must be positive".to_string(),
            ));
        }
        let total: f64 = parts.iter().sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(StressError::InvalidParameter(format!(
                "split ratios must sum to 1, got {total}"
            )));
        }
        Ok(())
    }

    /// Partition sizes `(train, validation, test)` for `n` rows.
    pub fn sizes(&self, n: usize) -> (usize, usize, usize) {
        let n_val = ((n as f64) * self.validation).round() as usize;
        let n_test = ((n as f64) * self.test).round() as usize;
        let n_val = n_val.min(n);
        let n_test = n_test.min(n - n_val);
        (n - n_val - n_test, n_val, n_test)
    }
}

/// The three disjoint partitions of a dataset and the source row indices
/// each one was drawn from.
#[derive(Clone, Debug)]
pub struct DatasetSplit {
    pub train: LabeledDataset,
    pub validation: LabeledDataset,
    pub test: LabeledDataset,
    pub train_indices: Vec<usize>,
    pub validation_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl LabeledDataset {
    /// Shuffle row indices with a seeded ChaCha8 permutation, then cut them
    /// into train, validation and test partitions.
    ///
    /// The same dataset, ratios and seed always produce the same partitions.
    pub fn split(&self, ratios: SplitRatios, seed: u64) -> Result<DatasetSplit> {
        if self.is_empty() {
            return Err(StressError::EmptyDataset(
                "cannot split a dataset with no rows".to_string(),
            ));
        }
        ratios.validate()?;

        let n = self.len();
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let (n_train, n_val, _) = ratios.sizes(n);
        let train_indices = indices[..n_train].to_vec();
        let validation_indices = indices[n_train..n_train + n_val].to_vec();
        let test_indices = indices[n_train + n_val..].to_vec();

        tracing::info!(
            rows = n,
            train = train_indices.len(),
            validation = validation_indices.len(),
            test = test_indices.len(),
            seed,
            "dataset split"
        );

        Ok(DatasetSplit {
            train: self.select(&train_indices),
            validation: self.select(&validation_indices),
            test: self.select(&test_indices),
            train_indices,
            validation_indices,
            test_indices,
        })
    }
}

/// Contiguous, unshuffled k-fold partitioning.
///
/// The first `n % k` folds hold one extra row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KFold {
    k: usize,
}

impl KFold {
    pub fn new(k: usize) -> Result<Self> {
        if k < 2 {
            return Err(StressError::InvalidParameter(format!(
                "k-fold needs at least 2 folds, got {k}"
            )));
        }
        Ok(Self { k })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Held-out row range of every fold.
    pub fn fold_ranges(&self, n: usize) -> Result<Vec<Range<usize>>> {
        if self.k > n {
            return Err(StressError::InvalidParameter(format!(
                "cannot make {} folds from {n} rows",
                self.k
            )));
        }
        let base = n / self.k;
        let extra = n % self.k;
        let mut start = 0;
        Ok((0..self.k)
            .map(|fold| {
                let size = base + usize::from(fold < extra);
                let range = start..start + size;
                start += size;
                range
            })
            .collect())
    }

    /// `(train_indices, held_out_indices)` for every fold.
    pub fn splits(&self, n: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        Ok(self
            .fold_ranges(n)?
            .into_iter()
            .map(|held_out| {
                let train: Vec<usize> = (0..held_out.start).chain(held_out.end..n).collect();
                (train, held_out.collect::<Vec<usize>>())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::N_FEATURES;
    use ndarray::{Array1, Array2};
    use std::collections::HashSet;

    fn dataset(n: usize) -> LabeledDataset {
        let x = Array2::from_shape_fn((n, N_FEATURES), |(i, _)| i as f64);
        let y = Array1::from_iter((0..n).map(|i| (i % 3) as f64));
        LabeledDataset::new(x, y).unwrap()
    }

    #[test]
    fn test_default_ratios() {
        let r = SplitRatios::default();
        assert_eq!((r.train, r.validation, r.test), (0.70, 0.15, 0.15));
    }

    #[test]
    fn test_sizes_for_1100_rows() {
        assert_eq!(SplitRatios::default().sizes(1100), (770, 165, 165));
    }

    #[test]
    fn test_invalid_ratios() {
        assert!(SplitRatios::new(0.5, 0.5, 0.5).is_err());
        assert!(SplitRatios::new(1.2, -0.1, -0.1).is_err());
        assert!(SplitRatios::new(0.0, 0.5, 0.5).is_err());
        assert!(SplitRatios::new(0.8, 0.2, 0.0).is_ok());
    }

    #[test]
    fn test_split_exhaustive_and_disjoint() {
        for n in [1, 2, 7, 100, 333] {
            let split = dataset(n).split(SplitRatios::default(), 42).unwrap();
            assert_eq!(
                split.train.len() + split.validation.len() + split.test.len(),
                n
            );
            let mut seen = HashSet::new();
            for i in split
                .train_indices
                .iter()
                .chain(&split.validation_indices)
                .chain(&split.test_indices)
            {
                assert!(seen.insert(*i), "row {i} assigned twice");
            }
            assert_eq!(seen.len(), n);
        }
    }

    #[test]
    fn test_split_is_reproducible() {
        let ds = dataset(50);
        let a = ds.split(SplitRatios::default(), 7).unwrap();
        let b = ds.split(SplitRatios::default(), 7).unwrap();
        assert_eq!(a.train_indices, b.train_indices);
        assert_eq!(a.validation_indices, b.validation_indices);
        assert_eq!(a.test_indices, b.test_indices);
        assert_eq!(a.train, b.train);
    }

    #[test]
    fn test_split_seed_changes_partition() {
        let ds = dataset(50);
        let a = ds.split(SplitRatios::default(), 1).unwrap();
        let b = ds.split(SplitRatios::default(), 2).unwrap();
        assert_ne!(a.train_indices, b.train_indices);
    }

    #[test]
    fn test_split_rows_follow_indices() {
        let ds = dataset(30);
        let split = ds.split(SplitRatios::default(), 42).unwrap();
        for (row, &src) in split.test_indices.iter().enumerate() {
            assert_eq!(split.test.features()[[row, 0]], src as f64);
            assert_eq!(split.test.labels()[row], (src % 3) as f64);
        }
    }

    #[test]
    fn test_split_empty_dataset() {
        let ds = dataset(0);
        assert!(matches!(
            ds.split(SplitRatios::default(), 42),
            Err(StressError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_kfold_sizes() {
        let folds = KFold::new(3).unwrap().fold_ranges(10).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(folds[0], 0..4);
        assert_eq!(folds[2], 7..10);
    }

    #[test]
    fn test_kfold_partitions_without_overlap() {
        let splits = KFold::new(5).unwrap().splits(23).unwrap();
        let mut held_out = HashSet::new();
        for (train, test) in &splits {
            assert_eq!(train.len() + test.len(), 23);
            for i in test {
                assert!(!train.contains(i));
                assert!(held_out.insert(*i));
            }
        }
        assert_eq!(held_out.len(), 23);
    }

    #[test]
    fn test_kfold_invalid() {
        assert!(KFold::new(1).is_err());
        assert!(KFold::new(5).unwrap().fold_ranges(3).is_err());
    }
}
