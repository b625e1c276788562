//! Persistence and export
//!
//! Covers the model artifact (JSON on disk, loaded read-only through
//! the process-wide [`ModelStore`]) and the tabular dataset export
//! consumed by offline tooling.

mod artifact;
mod dataset;

pub use artifact::{load_model, save_model, ModelStore, DEFAULT_MODEL_PATH};
pub use dataset::{write_csv, DEFAULT_DATASET_PATH};
