//! Traffic data model and synthesis
//!
//! Defines the per-packet observation type and the synthetic traffic
//! generator used for both offline training and live simulation.

mod generator;

pub use generator::TrafficGenerator;

use crate::error::{NetsenseError, Result};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Number of features in the packet schema
pub const N_FEATURES: usize = 4;

/// Canonical feature order for the packet schema
pub const FEATURE_NAMES: [&str; N_FEATURES] =
    ["packet_size", "time_interval", "protocol", "dest_port"];

/// Application protocol observed on a packet
///
/// Codes 0 and 1 are the protocols expected on the monitored network;
/// 2 and 3 only appear in anomalous traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Mqtt,
    Coap,
    Unknown2,
    Unknown3,
}

impl Protocol {
    /// Numeric protocol code
    pub fn code(&self) -> u8 {
        match self {
            Protocol::Mqtt => 0,
            Protocol::Coap => 1,
            Protocol::Unknown2 => 2,
            Protocol::Unknown3 => 3,
        }
    }

    /// Protocol for a numeric code
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Protocol::Mqtt),
            1 => Ok(Protocol::Coap),
            2 => Ok(Protocol::Unknown2),
            3 => Ok(Protocol::Unknown3),
            other => Err(NetsenseError::InvalidParameter(format!(
                "unknown protocol code: {}",
                other
            ))),
        }
    }

    /// Code as a feature value
    pub fn as_f64(&self) -> f64 {
        self.code() as f64
    }
}

/// Ground-truth tag on synthesized records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Normal,
    Attack,
}

impl Label {
    /// Numeric form used in the dataset export (0 = normal, 1 = attack)
    pub fn as_u8(&self) -> u8 {
        match self {
            Label::Normal => 0,
            Label::Attack => 1,
        }
    }
}

/// One packet observation
///
/// Immutable once generated. `label` is only present on synthesized
/// data and is never consulted at inference time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRecord {
    /// Packet size in bytes
    pub packet_size: f64,
    /// Milliseconds since the previous packet
    pub time_interval: f64,
    /// Observed protocol
    pub protocol: Protocol,
    /// Destination port
    pub dest_port: u16,
    /// Ground-truth tag (synthesized data only)
    pub label: Option<Label>,
    /// Observation time, strictly increasing per generated sequence
    pub timestamp: DateTime<Utc>,
}

impl TrafficRecord {
    /// Feature vector in canonical schema order
    pub fn features(&self) -> [f64; N_FEATURES] {
        [
            self.packet_size,
            self.time_interval,
            self.protocol.as_f64(),
            self.dest_port as f64,
        ]
    }
}

/// Ordered feature-name schema a model is trained against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// The canonical packet-feature schema
    pub fn canonical() -> Self {
        Self {
            names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Feature names in order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if the schema has no features
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Check another schema against this one
    pub fn validate(&self, other: &FeatureSchema) -> Result<()> {
        if self != other {
            return Err(NetsenseError::SchemaMismatch(format!(
                "expected features {:?}, got {:?}",
                self.names, other.names
            )));
        }
        Ok(())
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Ordered sequence of traffic records with a fixed feature schema
///
/// Order is irrelevant to training but preserved for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    records: Vec<TrafficRecord>,
    schema: FeatureSchema,
}

impl Dataset {
    /// Create a dataset over the canonical schema
    pub fn new(records: Vec<TrafficRecord>) -> Self {
        Self {
            records,
            schema: FeatureSchema::canonical(),
        }
    }

    /// Records in generation order
    pub fn records(&self) -> &[TrafficRecord] {
        &self.records
    }

    /// The dataset's feature schema
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the dataset holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count of records tagged with `label`
    pub fn count_label(&self, label: Label) -> usize {
        self.records
            .iter()
            .filter(|r| r.label == Some(label))
            .count()
    }

    /// Feature matrix, one row per record, columns in schema order
    pub fn to_matrix(&self) -> Array2<f64> {
        let mut x = Array2::zeros((self.records.len(), N_FEATURES));
        for (i, record) in self.records.iter().enumerate() {
            let features = record.features();
            for (j, &v) in features.iter().enumerate() {
                x[[i, j]] = v;
            }
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_codes_round_trip() {
        for code in 0..4u8 {
            let p = Protocol::from_code(code).unwrap();
            assert_eq!(p.code(), code);
        }
        assert!(Protocol::from_code(7).is_err());
    }

    #[test]
    fn test_schema_validation() {
        let canonical = FeatureSchema::canonical();
        assert!(canonical.validate(&FeatureSchema::canonical()).is_ok());

        let wrong = FeatureSchema {
            names: vec!["packet_size".into(), "time_interval".into()],
        };
        let err = canonical.validate(&wrong).unwrap_err();
        assert!(matches!(err, NetsenseError::SchemaMismatch(_)));
    }

    #[test]
    fn test_feature_order_matches_schema() {
        let record = TrafficRecord {
            packet_size: 50.0,
            time_interval: 1.0,
            protocol: Protocol::Coap,
            dest_port: 443,
            label: None,
            timestamp: Utc::now(),
        };
        let f = record.features();
        assert_eq!(f[0], 50.0);
        assert_eq!(f[1], 1.0);
        assert_eq!(f[2], 1.0);
        assert_eq!(f[3], 443.0);
    }
}
