//! netsense - IoT network-traffic anomaly detection
//!
//! Detects anomalous network traffic from a small set of per-packet
//! features with an isolation-forest ensemble, and explains flagged
//! packets by attributing the score deviation to individual features.
//!
//! # Modules
//!
//! ## Core engine
//! - [`traffic`] - Packet data model and synthetic traffic generation
//! - [`anomaly`] - Isolation-forest training and scoring
//! - [`explainability`] - Decision-path feature attribution
//!
//! ## Infrastructure
//! - [`export`] - Model artifact persistence, shared model handle, CSV export
//! - [`monitor`] - Live draw-score-explain tick loop
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core engine
pub mod traffic;
pub mod anomaly;
pub mod explainability;

// Infrastructure
pub mod export;
pub mod monitor;

// Services
pub mod cli;

pub use error::{NetsenseError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{NetsenseError, Result};

    // Traffic model and synthesis
    pub use crate::traffic::{
        Dataset, FeatureSchema, Label, Protocol, TrafficGenerator, TrafficRecord,
    };

    // Detection
    pub use crate::anomaly::{
        IsolationForestConfig, IsolationForestModel, IsolationTree, ScoreOutput,
    };

    // Explainability
    pub use crate::explainability::{explain, AnomalyExplanation, FeatureAttribution};

    // Persistence
    pub use crate::export::{load_model, save_model, ModelStore};

    // Live monitoring
    pub use crate::monitor::{LiveMonitor, MonitorTick};
}
