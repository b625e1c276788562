//! Decision-path attribution over a trained forest

use crate::anomaly::{IsolationForestModel, IsolationTree};
use crate::error::{NetsenseError, Result};
use crate::explainability::{AnomalyExplanation, FeatureAttribution};
use crate::traffic::TrafficRecord;

/// Explain a record's score against the model's training baseline
///
/// For each tree the record's decision path is walked; at every
/// internal node the split feature is charged the change in expected
/// isolation depth between the node and the child the record is routed
/// to (child expectations are size-weighted over the training
/// subsample). Per tree these charges telescope exactly to the
/// record's path length minus the tree's own expectation. The averaged
/// per-feature sums are then rescaled so the attributions sum to
/// `final_score - baseline_score`.
pub fn explain(model: &IsolationForestModel, record: &TrafficRecord) -> Result<AnomalyExplanation> {
    let baseline_score = model.baseline_score().ok_or_else(|| {
        NetsenseError::ExplainUnavailable("model has no stored training baseline".to_string())
    })?;

    let sample = record.features();
    let (final_score, _) = model.score_record(record)?;

    let n_features = model.schema().len();
    let mut raw = vec![0.0; n_features];

    for tree in model.trees() {
        let mut node = tree;
        while let IsolationTree::Internal {
            feature,
            threshold,
            avg_path,
            left,
            right,
            ..
        } = node
        {
            let child: &IsolationTree = if sample[*feature] < *threshold {
                left
            } else {
                right
            };
            raw[*feature] += child.avg_path() - avg_path;
            node = child;
        }
    }

    let n_trees = model.trees().len() as f64;
    for r in &mut raw {
        *r /= n_trees;
    }

    // Map path-length deviations into score space. A shorter-than-expected
    // path (negative raw sum) means a higher-than-baseline score, so the
    // shared scale factor carries the sign flip.
    let delta = final_score - baseline_score;
    let raw_total: f64 = raw.iter().sum();
    let contributions: Vec<f64> = if raw_total.abs() > 1e-12 {
        let scale = delta / raw_total;
        raw.iter().map(|&r| r * scale).collect()
    } else {
        // Degenerate path deviation; split the delta evenly
        vec![delta / n_features as f64; n_features]
    };

    let attributions = model
        .schema()
        .names()
        .iter()
        .zip(sample.iter())
        .zip(contributions)
        .map(|((name, &value), contribution)| FeatureAttribution {
            feature: name.clone(),
            value,
            contribution,
        })
        .collect();

    Ok(AnomalyExplanation {
        baseline_score,
        final_score,
        attributions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::IsolationForestConfig;
    use crate::traffic::{Protocol, TrafficGenerator};
    use chrono::Utc;

    fn trained_model() -> IsolationForestModel {
        let mut gen = TrafficGenerator::new().with_seed(42);
        let dataset = gen.generate(600, 0.05).unwrap();
        IsolationForestModel::train(&dataset, &IsolationForestConfig::default()).unwrap()
    }

    fn flood_record() -> TrafficRecord {
        TrafficRecord {
            packet_size: 1500.0,
            time_interval: 0.001,
            protocol: Protocol::Unknown3,
            dest_port: 60000,
            label: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_contributions_sum_to_score_delta() {
        let model = trained_model();
        let explanation = explain(&model, &flood_record()).unwrap();

        let delta = explanation.final_score - explanation.baseline_score;
        assert!((explanation.sum_contributions() - delta).abs() < 1e-6);
        assert_eq!(explanation.attributions.len(), 4);
    }

    #[test]
    fn test_flagged_record_has_positive_delta() {
        let model = trained_model();
        let explanation = explain(&model, &flood_record()).unwrap();
        assert!(explanation.final_score > explanation.baseline_score);
    }

    #[test]
    fn test_ranking_is_by_absolute_contribution() {
        let model = trained_model();
        let explanation = explain(&model, &flood_record()).unwrap();
        let ranked = explanation.ranked();
        for pair in ranked.windows(2) {
            assert!(pair[0].contribution.abs() >= pair[1].contribution.abs());
        }
        assert_eq!(explanation.top_k(2).len(), 2);
    }

    #[test]
    fn test_attribution_values_echo_record() {
        let model = trained_model();
        let record = flood_record();
        let explanation = explain(&model, &record).unwrap();

        assert_eq!(explanation.attributions[0].feature, "packet_size");
        assert_eq!(explanation.attributions[0].value, 1500.0);
        assert_eq!(explanation.attributions[3].feature, "dest_port");
        assert_eq!(explanation.attributions[3].value, 60000.0);
    }

    #[test]
    fn test_normal_record_explainable() {
        // Explaining an unflagged record is permitted and keeps the invariant
        let model = trained_model();
        let record = TrafficRecord {
            packet_size: 50.0,
            time_interval: 1.0,
            protocol: Protocol::Mqtt,
            dest_port: 443,
            label: None,
            timestamp: Utc::now(),
        };
        let explanation = explain(&model, &record).unwrap();
        let delta = explanation.final_score - explanation.baseline_score;
        assert!((explanation.sum_contributions() - delta).abs() < 1e-6);
    }
}
