//! Model artifact persistence and the shared model handle

use crate::anomaly::IsolationForestModel;
use crate::error::{NetsenseError, Result};
use parking_lot::RwLock;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Well-known artifact location
pub const DEFAULT_MODEL_PATH: &str = "models/isolation_forest.json";

/// Persist a trained model as a JSON artifact
pub fn save_model(model: &IsolationForestModel, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| NetsenseError::DataError(e.to_string()))?;
        }
    }

    let file = File::create(path).map_err(|e| NetsenseError::DataError(e.to_string()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, model)
        .map_err(|e| NetsenseError::SerializationError(e.to_string()))?;

    info!(path = %path.display(), n_estimators = model.n_estimators(), "saved model artifact");
    Ok(())
}

/// Load a model artifact
///
/// A missing or corrupt artifact is surfaced as an error; callers must
/// refuse to score until a model is actually available.
pub fn load_model(path: impl AsRef<Path>) -> Result<IsolationForestModel> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        NetsenseError::DataError(format!("cannot open model artifact {}: {}", path.display(), e))
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| NetsenseError::SerializationError(e.to_string()))
}

/// Process-wide, read-only model handle
///
/// Populated lazily by the first `load` (or explicitly by `replace`
/// after a retrain) and then shared via `Arc` for the life of the
/// process. The model behind the handle is never mutated; retraining
/// swaps the whole `Arc`.
#[derive(Debug, Default)]
pub struct ModelStore {
    inner: RwLock<Option<Arc<IsolationForestModel>>>,
}

impl ModelStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// The current model, or `ModelNotReady` when none is loaded
    pub fn get(&self) -> Result<Arc<IsolationForestModel>> {
        self.inner.read().clone().ok_or_else(|| {
            NetsenseError::ModelNotReady(
                "no model loaded; train one or load an artifact first".to_string(),
            )
        })
    }

    /// True when a model is loaded
    pub fn is_ready(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Load the artifact at `path` unless a model is already cached
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<IsolationForestModel>> {
        if let Some(model) = self.inner.read().clone() {
            return Ok(model);
        }
        let model = Arc::new(load_model(path)?);
        *self.inner.write() = Some(model.clone());
        Ok(model)
    }

    /// Replace the cached model (retrain-and-reload)
    pub fn replace(&self, model: IsolationForestModel) -> Arc<IsolationForestModel> {
        let model = Arc::new(model);
        *self.inner.write() = Some(model.clone());
        model
    }

    /// Drop the cached model
    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::IsolationForestConfig;
    use crate::traffic::TrafficGenerator;

    fn trained_model() -> IsolationForestModel {
        let mut gen = TrafficGenerator::new().with_seed(42);
        let dataset = gen.generate(300, 0.05).unwrap();
        let config = IsolationForestConfig::new().with_n_estimators(20);
        IsolationForestModel::train(&dataset, &config).unwrap()
    }

    #[test]
    fn test_artifact_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let model = trained_model();
        save_model(&model, &path).unwrap();
        let loaded = load_model(&path).unwrap();

        assert_eq!(loaded.n_estimators(), model.n_estimators());
        assert_eq!(loaded.threshold(), model.threshold());
        assert_eq!(loaded.baseline_score(), model.baseline_score());
        assert_eq!(loaded.schema(), model.schema());
    }

    #[test]
    fn test_loaded_model_scores_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let model = trained_model();
        save_model(&model, &path).unwrap();
        let loaded = load_model(&path).unwrap();

        let mut gen = TrafficGenerator::new().with_seed(9);
        let dataset = gen.generate(50, 0.2).unwrap();
        let before = model.score(&dataset).unwrap();
        let after = loaded.score(&dataset).unwrap();
        assert_eq!(before.scores, after.scores);
    }

    #[test]
    fn test_missing_artifact_is_an_error() {
        let err = load_model("does/not/exist.json").unwrap_err();
        assert!(matches!(err, NetsenseError::DataError(_)));
    }

    #[test]
    fn test_corrupt_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "not json at all").unwrap();
        let err = load_model(&path).unwrap_err();
        assert!(matches!(err, NetsenseError::SerializationError(_)));
    }

    #[test]
    fn test_store_empty_then_loaded() {
        let store = ModelStore::new();
        assert!(!store.is_ready());
        assert!(matches!(
            store.get().unwrap_err(),
            NetsenseError::ModelNotReady(_)
        ));

        let model = trained_model();
        store.replace(model);
        assert!(store.is_ready());
        assert!(store.get().is_ok());
    }

    #[test]
    fn test_store_lazy_load_caches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save_model(&trained_model(), &path).unwrap();

        let store = ModelStore::new();
        let first = store.load(&path).unwrap();
        // Second load with a bogus path must hit the cache
        let second = store.load("does/not/exist.json").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
