//! Synthetic traffic generation
//!
//! Draws packet records from two statistical regimes: a normal regime
//! (small sensor packets at regular intervals on well-known ports) and
//! an anomalous regime (flood-sized packets at scan-like intervals on
//! ephemeral ports, over unknown protocol codes).

use crate::error::{NetsenseError, Result};
use crate::traffic::{Dataset, Label, Protocol, TrafficRecord};
use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

// Normal regime: small regular packets on well-known ports
const NORMAL_SIZE_MEAN: f64 = 50.0;
const NORMAL_SIZE_SD: f64 = 10.0;
const NORMAL_INTERVAL_SCALE: f64 = 1.0;
const NORMAL_PORTS: [u16; 3] = [80, 443, 8080];

// Anomalous regime: flood-sized packets, scan-like gaps, random high ports
const ANOMALY_SIZE_MEAN: f64 = 1500.0;
const ANOMALY_SIZE_SD: f64 = 200.0;
const ANOMALY_INTERVAL_SCALE: f64 = 0.01;
const ANOMALY_PORT_LOW: u16 = 1024;
const ANOMALY_PORT_HIGH: u16 = 65535; // exclusive

/// Synthetic traffic generator with an explicit, seedable random source
pub struct TrafficGenerator {
    rng: ChaCha8Rng,
    start_time: Option<DateTime<Utc>>,
}

impl TrafficGenerator {
    /// Create a generator seeded from entropy
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
            start_time: None,
        }
    }

    /// Fix the random seed for reproducible sequences
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Fix the timestamp of the first generated record
    pub fn with_start_time(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Generate `n_samples` records, `round(n_samples * anomaly_ratio)`
    /// of them drawn from the anomalous regime, randomly permuted so
    /// record order carries no label signal
    pub fn generate(&mut self, n_samples: usize, anomaly_ratio: f64) -> Result<Dataset> {
        if !(0.0..=1.0).contains(&anomaly_ratio) || anomaly_ratio.is_nan() {
            return Err(NetsenseError::InvalidParameter(format!(
                "anomaly_ratio must be in [0, 1], got {}",
                anomaly_ratio
            )));
        }

        let n_anomalous = ((n_samples as f64 * anomaly_ratio).round() as usize).min(n_samples);
        let n_normal = n_samples - n_anomalous;

        let mut records = Vec::with_capacity(n_samples);
        for _ in 0..n_normal {
            records.push(self.normal_record());
        }
        for _ in 0..n_anomalous {
            records.push(self.anomalous_record());
        }

        records.shuffle(&mut self.rng);

        // Timestamps are one second apart in display order, independent of label
        let start = self.start_time.unwrap_or_else(Utc::now);
        for (i, record) in records.iter_mut().enumerate() {
            record.timestamp = start + Duration::seconds(i as i64);
        }

        Ok(Dataset::new(records))
    }

    /// Draw one packet, anomalous with probability `anomaly_probability`
    ///
    /// Live-simulation entry point: the batch `generate` contract rounds
    /// the anomalous count, which pins a single-record draw to one
    /// regime; a per-draw Bernoulli gives the live stream its expected
    /// anomalous fraction instead.
    pub fn generate_one(&mut self, anomaly_probability: f64) -> Result<TrafficRecord> {
        if !(0.0..=1.0).contains(&anomaly_probability) || anomaly_probability.is_nan() {
            return Err(NetsenseError::InvalidParameter(format!(
                "anomaly_probability must be in [0, 1], got {}",
                anomaly_probability
            )));
        }
        let mut record = if self.rng.gen_bool(anomaly_probability) {
            self.anomalous_record()
        } else {
            self.normal_record()
        };
        record.timestamp = Utc::now();
        Ok(record)
    }

    fn normal_record(&mut self) -> TrafficRecord {
        let protocol = if self.rng.gen_bool(0.5) {
            Protocol::Mqtt
        } else {
            Protocol::Coap
        };
        TrafficRecord {
            packet_size: self.sample_normal(NORMAL_SIZE_MEAN, NORMAL_SIZE_SD),
            time_interval: self.sample_exponential(NORMAL_INTERVAL_SCALE),
            protocol,
            dest_port: *NORMAL_PORTS.choose(&mut self.rng).unwrap_or(&NORMAL_PORTS[0]),
            label: Some(Label::Normal),
            timestamp: Utc::now(),
        }
    }

    fn anomalous_record(&mut self) -> TrafficRecord {
        let protocol = if self.rng.gen_bool(0.5) {
            Protocol::Unknown2
        } else {
            Protocol::Unknown3
        };
        TrafficRecord {
            packet_size: self.sample_normal(ANOMALY_SIZE_MEAN, ANOMALY_SIZE_SD),
            time_interval: self.sample_exponential(ANOMALY_INTERVAL_SCALE),
            protocol,
            dest_port: self.rng.gen_range(ANOMALY_PORT_LOW..ANOMALY_PORT_HIGH),
            label: Some(Label::Attack),
            timestamp: Utc::now(),
        }
    }

    /// Gaussian variate via Box-Muller
    fn sample_normal(&mut self, mean: f64, sd: f64) -> f64 {
        let u1: f64 = 1.0 - self.rng.gen::<f64>(); // in (0, 1]
        let u2: f64 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + sd * z
    }

    /// Exponential variate via inverse CDF
    fn sample_exponential(&mut self, scale: f64) -> f64 {
        let u: f64 = 1.0 - self.rng.gen::<f64>(); // in (0, 1]
        -scale * u.ln()
    }
}

impl Default for TrafficGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_counts() {
        let mut gen = TrafficGenerator::new().with_seed(42);
        let dataset = gen.generate(200, 0.1).unwrap();

        assert_eq!(dataset.len(), 200);
        assert_eq!(dataset.count_label(Label::Attack), 20);
        assert_eq!(dataset.count_label(Label::Normal), 180);
    }

    #[test]
    fn test_generate_rounds_anomaly_count() {
        let mut gen = TrafficGenerator::new().with_seed(42);
        // 0.05 * 10 = 0.5 rounds to 1
        let dataset = gen.generate(10, 0.05).unwrap();
        assert_eq!(dataset.count_label(Label::Attack), 1);

        // 0.04 * 10 = 0.4 rounds to 0
        let dataset = gen.generate(10, 0.04).unwrap();
        assert_eq!(dataset.count_label(Label::Attack), 0);
    }

    #[test]
    fn test_single_sample_is_valid() {
        let mut gen = TrafficGenerator::new().with_seed(7);
        let dataset = gen.generate(1, 0.05).unwrap();
        assert_eq!(dataset.len(), 1);
        // 0.05 rounds the anomalous count to zero
        assert_eq!(dataset.count_label(Label::Attack), 0);
    }

    #[test]
    fn test_generate_one_mixes_regimes() {
        let mut gen = TrafficGenerator::new().with_seed(21);
        let mut attacks = 0;
        for _ in 0..500 {
            let record = gen.generate_one(0.2).unwrap();
            if record.label == Some(Label::Attack) {
                attacks += 1;
            }
        }
        assert!(attacks > 50 && attacks < 150, "attacks = {}", attacks);
        assert!(gen.generate_one(1.5).is_err());
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let mut gen = TrafficGenerator::new().with_seed(1);
        assert!(gen.generate(10, -0.1).is_err());
        assert!(gen.generate(10, 1.5).is_err());
        assert!(gen.generate(10, f64::NAN).is_err());
    }

    #[test]
    fn test_timestamps_strictly_increasing() {
        let mut gen = TrafficGenerator::new().with_seed(3);
        let dataset = gen.generate(50, 0.2).unwrap();
        for pair in dataset.records().windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
    }

    #[test]
    fn test_regime_parameters() {
        let mut gen = TrafficGenerator::new().with_seed(11);
        let dataset = gen.generate(2000, 0.5).unwrap();

        let mut normal_sizes = Vec::new();
        for record in dataset.records() {
            match record.label {
                Some(Label::Normal) => {
                    normal_sizes.push(record.packet_size);
                    assert!(matches!(record.protocol, Protocol::Mqtt | Protocol::Coap));
                    assert!(NORMAL_PORTS.contains(&record.dest_port));
                }
                Some(Label::Attack) => {
                    assert!(matches!(
                        record.protocol,
                        Protocol::Unknown2 | Protocol::Unknown3
                    ));
                    assert!(record.dest_port >= ANOMALY_PORT_LOW);
                    assert!(record.time_interval >= 0.0);
                }
                None => panic!("synthesized record missing label"),
            }
        }

        let mean: f64 = normal_sizes.iter().sum::<f64>() / normal_sizes.len() as f64;
        assert!((mean - NORMAL_SIZE_MEAN).abs() < 2.0, "mean was {}", mean);
    }

    #[test]
    fn test_fixed_seed_reproducible() {
        let mut a = TrafficGenerator::new()
            .with_seed(99)
            .with_start_time(Utc::now());
        let start = a.start_time.unwrap();
        let mut b = TrafficGenerator::new().with_seed(99).with_start_time(start);

        let da = a.generate(100, 0.1).unwrap();
        let db = b.generate(100, 0.1).unwrap();
        assert_eq!(da.records(), db.records());
    }
}
