//! Artifact cache, per-slot serialization and the predict entry points.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use quizsense_ml::sanitize::sanitize_matrix;
use quizsense_ml::{argmax, MlError};
use serde::Serialize;

use super::artifact::{list_artifact_files, ArtifactError, Estimator, ModelArtifact};
use super::training::{self, TrainingParams, TrainingReport};
use super::ModelSlot;
use crate::features::{FeatureMatrix, SchemaMismatch};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("model {0} is not available, train it first")]
    ModelNotAvailable(ModelSlot),
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),
    #[error("target column {0} not found in training matrix")]
    MissingTarget(String),
    #[error("artifact for {slot} holds a {found} estimator")]
    UnexpectedEstimator { slot: ModelSlot, found: &'static str },
    #[error("artifact file for {expected} holds the {found} model")]
    ForeignArtifact { expected: ModelSlot, found: ModelSlot },
    #[error(transparent)]
    Ml(#[from] MlError),
    #[error("artifact io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ArtifactError> for RegistryError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Io(e) => RegistryError::Io(e),
            ArtifactError::Serialization(e) => RegistryError::Serialization(e),
            ArtifactError::SlotMismatch { expected, found } => {
                RegistryError::ForeignArtifact { expected, found }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyPrediction {
    pub predicted_difficulty: String,
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComprehensionPrediction {
    pub comprehension_cluster: usize,
    pub cluster_confidence: f64,
    pub cluster_distances: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadedModel {
    pub estimator: &'static str,
    pub n_features: usize,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_dir: String,
    pub loaded_models: BTreeMap<String, LoadedModel>,
    pub available_model_files: Vec<String>,
    pub training_in_progress: BTreeMap<String, bool>,
}

/// Owns the artifacts of every slot.
///
/// Reads of cached artifacts only take the shared cache lock. Loading from
/// disk, replacing after a fit, and evicting take the slot's mutex, so a load
/// never interleaves with a replace or a clear of the same slot.
pub struct ModelRegistry {
    model_dir: PathBuf,
    params: TrainingParams,
    cache: RwLock<HashMap<ModelSlot, Arc<ModelArtifact>>>,
    slot_locks: [Mutex<()>; 3],
    training: [AtomicBool; 3],
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("model_dir", &self.model_dir)
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

impl ModelRegistry {
    pub fn new(model_dir: impl Into<PathBuf>, params: TrainingParams) -> Self {
        Self {
            model_dir: model_dir.into(),
            params,
            cache: RwLock::new(HashMap::new()),
            slot_locks: Default::default(),
            training: Default::default(),
        }
    }

    /// Cached artifact, or the one on disk loaded into the cache.
    pub fn get(&self, slot: ModelSlot) -> Result<Arc<ModelArtifact>, RegistryError> {
        if let Some(artifact) = self.cache.read().get(&slot) {
            return Ok(Arc::clone(artifact));
        }

        let _slot = self.slot_locks[slot.index()].lock();
        if let Some(artifact) = self.cache.read().get(&slot) {
            return Ok(Arc::clone(artifact));
        }

        let artifact = ModelArtifact::read_from(&self.model_dir, slot)?
            .map(Arc::new)
            .ok_or(RegistryError::ModelNotAvailable(slot))?;
        tracing::info!(slot = %slot, features = artifact.n_features(), "model artifact loaded");
        self.cache.write().insert(slot, Arc::clone(&artifact));
        Ok(artifact)
    }

    /// True when the slot is cached or has an artifact on disk.
    pub fn is_available(&self, slot: ModelSlot) -> bool {
        self.cache.read().contains_key(&slot)
            || ModelArtifact::path_in(&self.model_dir, slot).is_file()
    }

    pub fn is_cached(&self, slot: ModelSlot) -> bool {
        self.cache.read().contains_key(&slot)
    }

    pub fn evict(&self, slot: ModelSlot) -> bool {
        let _slot = self.slot_locks[slot.index()].lock();
        self.cache.write().remove(&slot).is_some()
    }

    /// Drops every cached artifact; files on disk are kept. Returns how many were dropped.
    pub fn clear_cache(&self) -> usize {
        let cleared = ModelSlot::ALL
            .into_iter()
            .filter(|slot| self.evict(*slot))
            .count();
        tracing::info!(cleared, "model cache cleared");
        cleared
    }

    /// Fits the slot's estimator on `matrix`, persists it and swaps it into the cache.
    ///
    /// The fit runs without holding any registry lock. Callers enforce their
    /// own minimum sample counts.
    pub fn train(
        &self,
        slot: ModelSlot,
        matrix: &FeatureMatrix,
        target_column: &str,
    ) -> Result<TrainingReport, RegistryError> {
        tracing::info!(slot = %slot, samples = matrix.n_rows(), target_column, "training model");
        let fitted = match slot {
            ModelSlot::DifficultyPredictor => {
                training::fit_classifier(matrix, target_column, &self.params)?
            }
            ModelSlot::ScorePredictor => training::fit_regressor(matrix, target_column, &self.params)?,
            ModelSlot::ComprehensionAnalyzer => {
                training::fit_clusterer(matrix, target_column, &self.params)?
            }
        };

        let artifact = ModelArtifact {
            slot,
            estimator: fitted.estimator,
            scaler: fitted.scaler,
            label_encoder: fitted.label_encoder,
            columns: fitted.columns,
            target: Some(target_column.to_string()),
            trained_at: Utc::now(),
            report: fitted.report,
        };
        let report = artifact.report.clone();
        self.replace(artifact)?;
        Ok(report)
    }

    fn replace(&self, artifact: ModelArtifact) -> Result<(), RegistryError> {
        let slot = artifact.slot;
        let _slot = self.slot_locks[slot.index()].lock();
        let path = artifact.write_to(&self.model_dir)?;
        tracing::info!(slot = %slot, path = %path.display(), "model artifact saved");
        self.cache.write().insert(slot, Arc::new(artifact));
        Ok(())
    }

    /// Rows aligned to the artifact's schema, sanitized and scaled with the persisted scaler.
    fn prepare(artifact: &ModelArtifact, matrix: &FeatureMatrix) -> Result<Vec<Vec<f64>>, RegistryError> {
        let ignore: Vec<&str> = artifact.target.as_deref().into_iter().collect();
        let mut rows = matrix.align_to(&artifact.columns, &ignore)?;
        sanitize_matrix(&mut rows);
        Ok(artifact.scaler.transform(&rows)?)
    }

    pub fn predict_difficulty(
        &self,
        matrix: &FeatureMatrix,
    ) -> Result<Vec<DifficultyPrediction>, RegistryError> {
        let slot = ModelSlot::DifficultyPredictor;
        let artifact = self.get(slot)?;
        let (Estimator::Classifier(model), Some(encoder)) =
            (&artifact.estimator, artifact.label_encoder.as_ref())
        else {
            return Err(RegistryError::UnexpectedEstimator {
                slot,
                found: artifact.estimator.kind(),
            });
        };

        let rows = Self::prepare(&artifact, matrix)?;
        let probabilities = model.predict_proba(&rows)?;
        Ok(probabilities
            .into_iter()
            .map(|probs| {
                let best = argmax(&probs);
                DifficultyPrediction {
                    predicted_difficulty: encoder.decode(best).unwrap_or_default().to_string(),
                    confidence: probs.get(best).copied().unwrap_or(0.0),
                    probabilities: encoder.classes.iter().cloned().zip(probs).collect(),
                }
            })
            .collect())
    }

    /// Predicted score ratios, always within [0, 1].
    pub fn predict_score(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>, RegistryError> {
        let slot = ModelSlot::ScorePredictor;
        let artifact = self.get(slot)?;
        let Estimator::Regressor(model) = &artifact.estimator else {
            return Err(RegistryError::UnexpectedEstimator {
                slot,
                found: artifact.estimator.kind(),
            });
        };

        let rows = Self::prepare(&artifact, matrix)?;
        Ok(model
            .predict(&rows)?
            .into_iter()
            .map(|p| if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 })
            .collect())
    }

    pub fn analyze_comprehension(
        &self,
        matrix: &FeatureMatrix,
    ) -> Result<Vec<ComprehensionPrediction>, RegistryError> {
        let slot = ModelSlot::ComprehensionAnalyzer;
        let artifact = self.get(slot)?;
        let Estimator::Clusterer(model) = &artifact.estimator else {
            return Err(RegistryError::UnexpectedEstimator {
                slot,
                found: artifact.estimator.kind(),
            });
        };

        let rows = Self::prepare(&artifact, matrix)?;
        let clusters = model.predict(&rows)?;
        let distances = model.transform(&rows)?;
        Ok(clusters
            .into_iter()
            .zip(distances)
            .map(|(cluster, distances)| ComprehensionPrediction {
                comprehension_cluster: cluster,
                cluster_confidence: 1.0 / (1.0 + distances.get(cluster).copied().unwrap_or(0.0)),
                cluster_distances: distances,
            })
            .collect())
    }

    /// Marks the slot as training; `None` when a fit is already in flight.
    pub fn try_begin_training(self: &Arc<Self>, slot: ModelSlot) -> Option<TrainingGuard> {
        self.training[slot.index()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TrainingGuard {
                registry: Arc::clone(self),
                slot,
            })
    }

    pub fn is_training(&self, slot: ModelSlot) -> bool {
        self.training[slot.index()].load(Ordering::Acquire)
    }

    pub fn training_status(&self) -> BTreeMap<String, bool> {
        ModelSlot::ALL
            .into_iter()
            .map(|slot| (slot.key().to_string(), self.is_training(slot)))
            .collect()
    }

    pub fn model_info(&self) -> ModelInfo {
        let available_model_files = list_artifact_files(&self.model_dir).unwrap_or_else(|err| {
            tracing::warn!(error = %err, dir = %self.model_dir.display(), "failed to list model directory");
            Vec::new()
        });
        let loaded_models = self
            .cache
            .read()
            .iter()
            .map(|(slot, artifact)| {
                (
                    slot.key().to_string(),
                    LoadedModel {
                        estimator: artifact.estimator.kind(),
                        n_features: artifact.n_features(),
                        trained_at: artifact.trained_at,
                    },
                )
            })
            .collect();

        ModelInfo {
            model_dir: self.model_dir.display().to_string(),
            loaded_models,
            available_model_files,
            training_in_progress: self.training_status(),
        }
    }
}

/// Clears the slot's training flag when dropped.
pub struct TrainingGuard {
    registry: Arc<ModelRegistry>,
    slot: ModelSlot,
}

impl TrainingGuard {
    pub fn slot(&self) -> ModelSlot {
        self.slot
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }
}

impl Drop for TrainingGuard {
    fn drop(&mut self) {
        self.registry.training[self.slot.index()].store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_slot_is_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path(), TrainingParams::default());
        assert!(!registry.is_available(ModelSlot::ScorePredictor));
        assert!(matches!(
            registry.predict_score(&FeatureMatrix::default()),
            Err(RegistryError::ModelNotAvailable(ModelSlot::ScorePredictor))
        ));
    }

    #[test]
    fn test_training_flag_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ModelRegistry::new(dir.path(), TrainingParams::default()));
        let guard = registry.try_begin_training(ModelSlot::DifficultyPredictor);
        assert!(guard.is_some());
        assert!(registry.try_begin_training(ModelSlot::DifficultyPredictor).is_none());
        assert!(registry.try_begin_training(ModelSlot::ScorePredictor).is_some());
        assert!(registry.is_training(ModelSlot::DifficultyPredictor));
        drop(guard);
        assert!(!registry.is_training(ModelSlot::DifficultyPredictor));
    }
}
