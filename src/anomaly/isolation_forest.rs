//! Isolation forest training and scoring

use crate::anomaly::ScoreOutput;
use crate::error::{NetsenseError, Result};
use crate::traffic::{Dataset, FeatureSchema, TrafficRecord};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Euler-Mascheroni constant, used in the harmonic-number approximation
const EULER_GAMMA: f64 = 0.5772156649;

/// One randomized binary partition tree
///
/// `avg_path` on every node is the expected isolation depth of the
/// subtree over its own subsample slice, precomputed at build time;
/// the explainability engine reads it while walking decision paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IsolationTree {
    /// Internal node with a split
    Internal {
        /// Feature index for the split
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Subsample records reaching this node
        size: usize,
        /// Expected isolation depth over this node's slice
        avg_path: f64,
        /// Left subtree (values < threshold)
        left: Box<IsolationTree>,
        /// Right subtree (values >= threshold)
        right: Box<IsolationTree>,
    },
    /// Leaf node
    Leaf {
        /// Subsample records remaining at this leaf
        size: usize,
        /// Depth of this leaf
        depth: usize,
        /// Isolation depth estimate: depth + c(size)
        avg_path: f64,
    },
}

impl IsolationTree {
    /// Build a tree over the slice of `x` selected by `indices`
    pub fn build(
        x: &Array2<f64>,
        indices: &[usize],
        depth: usize,
        max_depth: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let n_samples = indices.len();

        if depth >= max_depth || n_samples <= 1 {
            return Self::leaf(n_samples, depth);
        }

        let n_features = x.ncols();
        let feature = rng.gen_range(0..n_features);

        let values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
        let min_val = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        // Constant slice on the chosen feature cannot be split
        if (max_val - min_val).abs() < 1e-10 {
            return Self::leaf(n_samples, depth);
        }

        let threshold = rng.gen_range(min_val..max_val);

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] < threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return Self::leaf(n_samples, depth);
        }

        let left = Box::new(Self::build(x, &left_indices, depth + 1, max_depth, rng));
        let right = Box::new(Self::build(x, &right_indices, depth + 1, max_depth, rng));

        let n_left = left_indices.len() as f64;
        let n_right = right_indices.len() as f64;
        let avg_path =
            (n_left * left.avg_path() + n_right * right.avg_path()) / n_samples as f64;

        IsolationTree::Internal {
            feature,
            threshold,
            size: n_samples,
            avg_path,
            left,
            right,
        }
    }

    fn leaf(size: usize, depth: usize) -> Self {
        IsolationTree::Leaf {
            size,
            depth,
            avg_path: depth as f64 + Self::c(size),
        }
    }

    /// Expected isolation depth of this subtree over its subsample slice
    pub fn avg_path(&self) -> f64 {
        match self {
            IsolationTree::Internal { avg_path, .. } => *avg_path,
            IsolationTree::Leaf { avg_path, .. } => *avg_path,
        }
    }

    /// Path length for a sample: leaf depth plus the residual-size adjustment
    pub fn path_length(&self, sample: &[f64]) -> f64 {
        match self {
            IsolationTree::Leaf { size, depth, .. } => *depth as f64 + Self::c(*size),
            IsolationTree::Internal {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature] < *threshold {
                    left.path_length(sample)
                } else {
                    right.path_length(sample)
                }
            }
        }
    }

    /// Average path length of an unsuccessful BST search:
    /// c(k) = 2 * H(k-1) - 2(k-1)/k with H(i) ~ ln(i) + gamma
    pub fn c(k: usize) -> f64 {
        if k <= 1 {
            0.0
        } else if k == 2 {
            1.0
        } else {
            let k_f = k as f64;
            2.0 * ((k_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (k_f - 1.0) / k_f
        }
    }
}

/// Training configuration for an isolation forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForestConfig {
    /// Number of trees in the ensemble
    pub n_estimators: usize,
    /// Records subsampled (without replacement) per tree
    pub subsample_size: usize,
    /// Assumed anomalous fraction, sets the decision threshold
    pub contamination: f64,
    /// Base random seed; tree i uses seed + i
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            subsample_size: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

impl IsolationForestConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Set the per-tree subsample size
    pub fn with_subsample_size(mut self, n: usize) -> Self {
        self.subsample_size = n;
        self
    }

    /// Set the contamination fraction
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c;
        self
    }

    /// Set the base random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(NetsenseError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        if self.subsample_size < 2 {
            return Err(NetsenseError::InvalidParameter(format!(
                "subsample_size must be at least 2, got {}",
                self.subsample_size
            )));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(NetsenseError::InvalidParameter(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        Ok(())
    }
}

/// Trained isolation-forest ensemble
///
/// Created once by training, then read-only: scoring and explanation
/// never mutate it, so a loaded model is safe to share across callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForestModel {
    trees: Vec<IsolationTree>,
    schema: FeatureSchema,
    n_estimators: usize,
    subsample_size: usize,
    contamination: f64,
    threshold: f64,
    baseline_score: Option<f64>,
    trained_at: DateTime<Utc>,
}

impl IsolationForestModel {
    /// Train an ensemble on `dataset`
    ///
    /// Tree construction is parallel across estimators; tree `i` draws
    /// its subsample and splits from a rng seeded with `seed + i`, so
    /// the result is independent of worker count and schedule.
    pub fn train(dataset: &Dataset, config: &IsolationForestConfig) -> Result<Self> {
        config.validate()?;
        if dataset.is_empty() {
            return Err(NetsenseError::InvalidParameter(
                "training dataset is empty".to_string(),
            ));
        }

        let x = dataset.to_matrix();
        let n = x.nrows();
        let samples_per_tree = config.subsample_size.min(n);
        let max_depth = (samples_per_tree as f64).log2().ceil() as usize;

        info!(
            n_records = n,
            n_estimators = config.n_estimators,
            subsample_size = samples_per_tree,
            "training isolation forest"
        );

        let trees: Vec<IsolationTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = config.seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                // Subsample without replacement
                let mut all: Vec<usize> = (0..n).collect();
                let (drawn, _) = all.partial_shuffle(&mut rng, samples_per_tree);

                IsolationTree::build(&x, drawn, 0, max_depth, &mut rng)
            })
            .collect();

        let mut model = Self {
            trees,
            schema: dataset.schema().clone(),
            n_estimators: config.n_estimators,
            subsample_size: samples_per_tree,
            contamination: config.contamination,
            threshold: 0.5,
            baseline_score: None,
            trained_at: Utc::now(),
        };

        // Decision threshold: score at the contamination quantile of the
        // training set's own scores, counted from the top
        let scores = model.compute_scores(&x)?;
        let mut sorted: Vec<f64> = scores.iter().copied().collect();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let cut = ((config.contamination * n as f64).round() as usize).clamp(1, n) - 1;
        model.threshold = sorted[cut];

        // Baseline for explanations: mean ensemble score over training data
        let baseline = scores.iter().sum::<f64>() / n as f64;
        model.baseline_score = Some(baseline);

        debug!(
            threshold = model.threshold,
            baseline = baseline,
            "derived decision threshold"
        );

        Ok(model)
    }

    /// Score a dataset, one (score, decision) pair per record
    pub fn score(&self, dataset: &Dataset) -> Result<ScoreOutput> {
        self.schema.validate(dataset.schema())?;
        let scores = self.compute_scores(&dataset.to_matrix())?;
        let decisions = scores.iter().map(|&s| s >= self.threshold).collect();
        Ok(ScoreOutput {
            scores: scores.to_vec(),
            decisions,
        })
    }

    /// Score a single record
    pub fn score_record(&self, record: &TrafficRecord) -> Result<(f64, bool)> {
        let score = self.score_sample(&record.features())?;
        Ok((score, score >= self.threshold))
    }

    /// Score a record supplied as named feature values
    ///
    /// Fails with `SchemaMismatch` when a trained feature is missing or
    /// an unknown feature is present.
    pub fn score_named(&self, features: &HashMap<String, f64>) -> Result<(f64, bool)> {
        let mut sample = Vec::with_capacity(self.schema.len());
        for name in self.schema.names() {
            let value = features.get(name).ok_or_else(|| {
                NetsenseError::SchemaMismatch(format!("missing feature: {}", name))
            })?;
            sample.push(*value);
        }
        for name in features.keys() {
            if !self.schema.names().iter().any(|n| n == name) {
                return Err(NetsenseError::SchemaMismatch(format!(
                    "unexpected feature: {}",
                    name
                )));
            }
        }
        let score = self.score_sample(&sample)?;
        Ok((score, score >= self.threshold))
    }

    /// Anomaly score for one feature vector in schema order
    pub(crate) fn score_sample(&self, sample: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(NetsenseError::ModelNotReady(
                "model has no trees".to_string(),
            ));
        }
        if sample.len() != self.schema.len() {
            return Err(NetsenseError::SchemaMismatch(format!(
                "expected {} features, got {}",
                self.schema.len(),
                sample.len()
            )));
        }

        let avg_path: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(sample))
            .sum::<f64>()
            / self.trees.len() as f64;

        // s(x, n) = 2^(-E[h(x)] / c(n))
        Ok(2.0_f64.powf(-avg_path / IsolationTree::c(self.subsample_size)))
    }

    fn compute_scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores: Result<Vec<f64>> = x
            .rows()
            .into_iter()
            .map(|row| {
                let sample: Vec<f64> = row.iter().copied().collect();
                self.score_sample(&sample)
            })
            .collect();
        Ok(Array1::from_vec(scores?))
    }

    /// The trained trees
    pub fn trees(&self) -> &[IsolationTree] {
        &self.trees
    }

    /// Feature schema the model was trained on
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Number of trees in the ensemble
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Records subsampled per tree
    pub fn subsample_size(&self) -> usize {
        self.subsample_size
    }

    /// Contamination fraction the threshold was derived from
    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    /// Decision threshold on the anomaly score
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Mean ensemble score over the training set, if stored
    pub fn baseline_score(&self) -> Option<f64> {
        self.baseline_score
    }

    /// Training time of this model
    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}
