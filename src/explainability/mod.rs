//! Feature attribution for flagged records
//!
//! Attributes the deviation of a record's anomaly score from the
//! model's training baseline to individual features by walking each
//! tree's decision path and charging every split's change in expected
//! isolation depth to the split feature.

mod attribution;

pub use attribution::explain;

use serde::{Deserialize, Serialize};

/// Signed contribution of one feature to a score deviation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAttribution {
    /// Feature name
    pub feature: String,
    /// Feature value for the explained record
    pub value: f64,
    /// Signed share of `final_score - baseline_score`
    pub contribution: f64,
}

/// Explanation for one scored record
///
/// Invariant: contributions sum to `final_score - baseline_score`
/// within floating tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyExplanation {
    /// Ensemble mean score over the training data
    pub baseline_score: f64,
    /// Score of the explained record
    pub final_score: f64,
    /// Per-feature contributions in schema order
    pub attributions: Vec<FeatureAttribution>,
}

impl AnomalyExplanation {
    /// Sum of all contributions
    pub fn sum_contributions(&self) -> f64 {
        self.attributions.iter().map(|a| a.contribution).sum()
    }

    /// Attributions ranked by absolute contribution, descending
    pub fn ranked(&self) -> Vec<&FeatureAttribution> {
        let mut sorted: Vec<&FeatureAttribution> = self.attributions.iter().collect();
        sorted.sort_by(|a, b| {
            b.contribution
                .abs()
                .partial_cmp(&a.contribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    /// Top k contributors by absolute contribution
    pub fn top_k(&self, k: usize) -> Vec<&FeatureAttribution> {
        self.ranked().into_iter().take(k).collect()
    }
}
