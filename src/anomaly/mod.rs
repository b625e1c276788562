//! Isolation-forest anomaly detection
//!
//! Training builds an ensemble of randomized binary partition trees
//! over subsamples of a dataset; scoring converts a record's average
//! isolation depth across the ensemble into a score in (0, 1], with
//! the decision threshold derived from the training scores at the
//! model's contamination quantile.

mod isolation_forest;

pub use isolation_forest::{IsolationForestConfig, IsolationForestModel, IsolationTree};

use serde::{Deserialize, Serialize};

/// Scores and decisions for a batch of records, one pair per input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreOutput {
    /// Continuous anomaly scores in (0, 1]
    pub scores: Vec<f64>,
    /// True where the score meets the model's decision threshold
    pub decisions: Vec<bool>,
}

impl ScoreOutput {
    /// Number of anomalous decisions
    pub fn n_anomalous(&self) -> usize {
        self.decisions.iter().filter(|&&d| d).count()
    }
}
