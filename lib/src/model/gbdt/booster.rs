//! Gradient boosting over oblivious trees with squared-error loss.

use super::binning::BinnedFeatures;
use super::params::{BoostingParams, MAX_DEPTH};
use super::tree::{ObliviousTree, Split};
use crate::error::{Result, StressError};
use crate::model::{EvalSet, InferenceModel, TrainableModel, TrainingReport};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Splits that reduce the loss by less than this end tree growth.
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Unfitted boosting regressor. Holds hyperparameters only.
///
/// # Example
/// ```rust
/// use stressmeter::model::{GbdtRegressor, InferenceModel, TrainableModel};
/// use ndarray::{array, Array1};
///
/// let x = array![[0.0], [1.0], [2.0], [3.0]];
/// let y = array![0.0, 0.0, 1.0, 1.0];
/// let (model, report) = GbdtRegressor::new()
///     .iterations(50)
///     .depth(1)
///     .subsample(1.0)
///     .fit(x.view(), y.view(), None)
///     .unwrap();
/// assert_eq!(report.rounds_run, 50);
/// assert!(model.predict(array![3.0].view()).unwrap() > 0.5);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GbdtRegressor {
    params: BoostingParams,
}

impl GbdtRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: BoostingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.params.iterations = iterations;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.params.learning_rate = learning_rate;
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.params.depth = depth;
        self
    }

    pub fn l2_leaf_reg(mut self, l2_leaf_reg: f64) -> Self {
        self.params.l2_leaf_reg = l2_leaf_reg;
        self
    }

    pub fn subsample(mut self, subsample: f64) -> Self {
        self.params.subsample = subsample;
        self
    }

    pub fn early_stopping_rounds(mut self, rounds: usize) -> Self {
        self.params.early_stopping_rounds = rounds;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    pub fn max_bins(mut self, max_bins: usize) -> Self {
        self.params.max_bins = max_bins;
        self
    }

    /// Log the validation RMSE of every round at `debug` level.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.params.verbose = verbose;
        self
    }
}

fn check_rows(
    features: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, f64>,
    what: &str,
) -> Result<()> {
    if features.nrows() == 0 {
        return Err(StressError::EmptyDataset(format!("{what} set has no rows")));
    }
    if features.ncols() == 0 {
        return Err(StressError::InvalidParameter(format!(
            "{what} set has no feature columns"
        )));
    }
    if features.nrows() != labels.len() {
        return Err(StressError::schema(
            format!("{} {what} labels", features.nrows()),
            format!("{} labels", labels.len()),
        ));
    }
    if features.iter().chain(labels.iter()).any(|v| !v.is_finite()) {
        return Err(StressError::InvalidParameter(format!(
            "{what} set contains NaN or infinite values"
        )));
    }
    Ok(())
}

fn leaf_score(sum: f64, count: usize, lambda: f64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum * sum / (count as f64 + lambda)
    }
}

fn rmse(predictions: &[f64], labels: ArrayView1<'_, f64>) -> f64 {
    let sse: f64 = predictions
        .iter()
        .zip(labels.iter())
        .map(|(p, y)| (y - p).powi(2))
        .sum();
    (sse / labels.len() as f64).sqrt()
}

/// Rows taking part in one round. Each row is kept with probability
/// `subsample`; an empty draw falls back to every row.
fn draw_sample(rng: &mut ChaCha8Rng, n_rows: usize, subsample: f64) -> Vec<usize> {
    if subsample >= 1.0 {
        return (0..n_rows).collect();
    }
    let sample: Vec<usize> = (0..n_rows)
        .filter(|_| rng.gen::<f64>() < subsample)
        .collect();
    if sample.is_empty() {
        (0..n_rows).collect()
    } else {
        sample
    }
}

/// A chosen split expressed on bins: rows with `bin > border_bin` go right.
#[derive(Clone, Copy, Debug)]
struct BinSplit {
    feature: usize,
    border_bin: usize,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    score: f64,
    split: BinSplit,
}

fn binned_leaf(binned: &BinnedFeatures, levels: &[BinSplit], row: usize) -> usize {
    levels.iter().enumerate().fold(0, |leaf, (level, s)| {
        leaf | (usize::from(binned.bins[s.feature][row] as usize > s.border_bin) << level)
    })
}

/// Grow one tree level by level on the sampled rows.
///
/// At every level the single `(feature, border)` maximizing
/// `sum over leaves of L^2/(nL+lambda) + R^2/(nR+lambda)` is chosen; the first
/// candidate wins ties.
fn grow_tree(
    binned: &BinnedFeatures,
    residuals: &[f64],
    sample: &[usize],
    params: &BoostingParams,
) -> (ObliviousTree, Vec<BinSplit>) {
    let lambda = params.l2_leaf_reg;
    let mut leaf_of = vec![0usize; sample.len()];
    let mut splits = Vec::with_capacity(params.depth);
    let mut levels = Vec::with_capacity(params.depth);

    for level in 0..params.depth {
        let n_leaves = 1usize << level;
        let mut leaf_sum = vec![0.0; n_leaves];
        let mut leaf_cnt = vec![0usize; n_leaves];
        for (pos, &row) in sample.iter().enumerate() {
            leaf_sum[leaf_of[pos]] += residuals[row];
            leaf_cnt[leaf_of[pos]] += 1;
        }
        let parent: f64 = (0..n_leaves)
            .map(|l| leaf_score(leaf_sum[l], leaf_cnt[l], lambda))
            .sum();

        let mut best: Option<Candidate> = None;
        for feature in 0..binned.n_features() {
            let n_bins = binned.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let bins = &binned.bins[feature];
            let mut hist_sum = vec![0.0; n_leaves * n_bins];
            let mut hist_cnt = vec![0usize; n_leaves * n_bins];
            for (pos, &row) in sample.iter().enumerate() {
                let cell = leaf_of[pos] * n_bins + bins[row] as usize;
                hist_sum[cell] += residuals[row];
                hist_cnt[cell] += 1;
            }

            let mut left_sum = vec![0.0; n_leaves];
            let mut left_cnt = vec![0usize; n_leaves];
            for border_bin in 0..n_bins - 1 {
                let mut score = 0.0;
                for leaf in 0..n_leaves {
                    left_sum[leaf] += hist_sum[leaf * n_bins + border_bin];
                    left_cnt[leaf] += hist_cnt[leaf * n_bins + border_bin];
                    score += leaf_score(left_sum[leaf], left_cnt[leaf], lambda)
                        + leaf_score(
                            leaf_sum[leaf] - left_sum[leaf],
                            leaf_cnt[leaf] - left_cnt[leaf],
                            lambda,
                        );
                }
                if best.map_or(true, |b| score > b.score) {
                    best = Some(Candidate {
                        score,
                        split: BinSplit {
                            feature,
                            border_bin,
                        },
                    });
                }
            }
        }

        let Some(best) = best else { break };
        let gain = best.score - parent;
        if !(gain > MIN_SPLIT_GAIN) {
            break;
        }

        let BinSplit {
            feature,
            border_bin,
        } = best.split;
        for (pos, &row) in sample.iter().enumerate() {
            if binned.bins[feature][row] as usize > border_bin {
                leaf_of[pos] |= 1 << level;
            }
        }
        splits.push(Split {
            feature,
            border: binned.borders[feature][border_bin],
            gain,
        });
        levels.push(best.split);
    }

    let n_leaves = 1usize << splits.len();
    let mut sum = vec![0.0; n_leaves];
    let mut cnt = vec![0usize; n_leaves];
    for (pos, &row) in sample.iter().enumerate() {
        sum[leaf_of[pos]] += residuals[row];
        cnt[leaf_of[pos]] += 1;
    }
    let leaf_values = sum
        .iter()
        .zip(&cnt)
        .map(|(&s, &n)| {
            if n == 0 {
                0.0
            } else {
                params.learning_rate * s / (n as f64 + lambda)
            }
        })
        .collect();

    (
        ObliviousTree {
            splits,
            leaf_values,
        },
        levels,
    )
}

impl TrainableModel for GbdtRegressor {
    type Fitted = FittedGbdt;

    fn fit(
        &self,
        features: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, f64>,
        validation: Option<EvalSet<'_>>,
    ) -> Result<(FittedGbdt, TrainingReport)> {
        let params = &self.params;
        params.validate()?;
        check_rows(features, labels, "training")?;
        if let Some(eval) = &validation {
            check_rows(eval.features, eval.labels, "validation")?;
            if eval.features.ncols() != features.ncols() {
                return Err(StressError::schema(
                    format!("{} validation columns", features.ncols()),
                    format!("{} columns", eval.features.ncols()),
                ));
            }
        }

        let n_rows = features.nrows();
        let binned = BinnedFeatures::build(features, params.max_bins);
        let base_score = labels.mean().unwrap_or(0.0);

        let mut train_pred = vec![base_score; n_rows];
        let mut val_pred = validation
            .as_ref()
            .map(|eval| vec![base_score; eval.labels.len()]);
        let mut residuals = vec![0.0; n_rows];
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

        let mut trees = Vec::new();
        let mut best: Option<(usize, f64)> = None;
        let mut rounds_run = 0;
        let mut stopped_early = false;

        for round in 0..params.iterations {
            rounds_run = round + 1;
            for (r, (y, p)) in residuals.iter_mut().zip(labels.iter().zip(&train_pred)) {
                *r = y - p;
            }
            let sample = draw_sample(&mut rng, n_rows, params.subsample);
            let (tree, levels) = grow_tree(&binned, &residuals, &sample, params);

            for (row, pred) in train_pred.iter_mut().enumerate() {
                *pred += tree.leaf_values[binned_leaf(&binned, &levels, row)];
            }

            if let (Some(eval), Some(val_pred)) = (&validation, val_pred.as_mut()) {
                for (row, pred) in eval.features.rows().into_iter().zip(val_pred.iter_mut()) {
                    *pred += tree.predict(row);
                }
                let val_rmse = rmse(val_pred, eval.labels);
                if best.map_or(true, |(_, b)| val_rmse < b) {
                    best = Some((round, val_rmse));
                }
                if params.verbose {
                    tracing::debug!(round, val_rmse, depth = tree.depth(), "boosting round");
                }
                trees.push(tree);
                if let Some((best_round, _)) = best {
                    if round - best_round >= params.early_stopping_rounds {
                        stopped_early = true;
                        break;
                    }
                }
            } else {
                if params.verbose {
                    tracing::debug!(
                        round,
                        train_rmse = rmse(&train_pred, labels),
                        depth = tree.depth(),
                        "boosting round"
                    );
                }
                trees.push(tree);
            }
        }

        if let Some((best_round, _)) = best {
            trees.truncate(best_round + 1);
        }

        let model = FittedGbdt {
            base_score,
            trees,
            n_features: features.ncols(),
        };
        let train_scores = model.predict_batch(features)?;
        let report = TrainingReport {
            rounds_run,
            rounds_kept: model.trees.len(),
            best_round: best.map(|(round, _)| round),
            best_validation_rmse: best.map(|(_, score)| score),
            stopped_early,
            train_rmse: rmse(&train_scores.to_vec(), labels),
        };

        tracing::info!(
            rounds_run = report.rounds_run,
            rounds_kept = report.rounds_kept,
            best_validation_rmse = ?report.best_validation_rmse,
            train_rmse = report.train_rmse,
            stopped_early,
            "gradient boosting finished"
        );
        Ok((model, report))
    }
}

/// Serializable state of a fitted ensemble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GbdtModelParams {
    pub base_score: f64,
    pub n_features: usize,
    pub trees: Vec<ObliviousTree>,
}

/// Fitted ensemble: `score = base_score + sum of tree outputs`, summed in
/// tree order so repeated calls return identical bits.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedGbdt {
    base_score: f64,
    trees: Vec<ObliviousTree>,
    n_features: usize,
}

impl FittedGbdt {
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn trees(&self) -> &[ObliviousTree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn score(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + tree.predict(row))
    }
}

impl InferenceModel for FittedGbdt {
    type Params = GbdtModelParams;

    fn predict(&self, row: ArrayView1<'_, f64>) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(StressError::schema(
                format!("{} features", self.n_features),
                format!("{} features", row.len()),
            ));
        }
        Ok(self.score(row))
    }

    fn predict_batch(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if rows.ncols() != self.n_features {
            return Err(StressError::schema(
                format!("{} feature columns", self.n_features),
                format!("{} columns", rows.ncols()),
            ));
        }
        Ok(rows.rows().into_iter().map(|row| self.score(row)).collect())
    }

    fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn feature_importance(&self) -> Vec<f64> {
        let mut gains = vec![0.0; self.n_features];
        for split in self.trees.iter().flat_map(|t| &t.splits) {
            gains[split.feature] += split.gain;
        }
        let total: f64 = gains.iter().sum();
        if total > 0.0 {
            gains.iter_mut().for_each(|g| *g = *g * 100.0 / total);
        }
        gains
    }

    fn extract_params(&self) -> GbdtModelParams {
        GbdtModelParams {
            base_score: self.base_score,
            n_features: self.n_features,
            trees: self.trees.clone(),
        }
    }

    fn from_params(params: GbdtModelParams) -> Result<Self> {
        if params.n_features == 0 {
            return Err(StressError::InvalidParameter(
                "model must have at least one feature".to_string(),
            ));
        }
        if !params.base_score.is_finite() {
            return Err(StressError::InvalidParameter(format!(
                "base score must be finite, got {}",
                params.base_score
            )));
        }
        if let Some(i) = params
            .trees
            .iter()
            .position(|t| t.depth() > MAX_DEPTH || !t.is_well_formed(params.n_features))
        {
            return Err(StressError::InvalidParameter(format!(
                "tree {i} is malformed"
            )));
        }
        Ok(Self {
            base_score: params.base_score,
            trees: params.trees,
            n_features: params.n_features,
        })
    }
}
