use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use quizsense_ml::{KMeans, LabelEncoder, RandomForestClassifier, RandomForestRegressor, StandardScaler};
use serde::{Deserialize, Serialize};

use super::training::TrainingReport;
use super::ModelSlot;

pub const ARTIFACT_SUFFIX: &str = ".model.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Classifier(RandomForestClassifier),
    Regressor(RandomForestRegressor),
    Clusterer(KMeans),
}

impl Estimator {
    pub fn kind(&self) -> &'static str {
        match self {
            Estimator::Classifier(_) => "RandomForestClassifier",
            Estimator::Regressor(_) => "RandomForestRegressor",
            Estimator::Clusterer(_) => "KMeans",
        }
    }
}

/// Everything needed to predict with a slot without refitting anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub slot: ModelSlot,
    pub estimator: Estimator,
    pub scaler: StandardScaler,
    pub label_encoder: Option<LabelEncoder>,
    /// Feature columns in fit order.
    pub columns: Vec<String>,
    /// Column the model was trained against; ignored when checking prediction schemas.
    pub target: Option<String>,
    pub trained_at: DateTime<Utc>,
    pub report: TrainingReport,
}

impl ModelArtifact {
    pub fn file_name(slot: ModelSlot) -> String {
        format!("{}{}", slot.key(), ARTIFACT_SUFFIX)
    }

    pub fn path_in(dir: &Path, slot: ModelSlot) -> PathBuf {
        dir.join(Self::file_name(slot))
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Writes next to the final path first and renames over it, so a reader
    /// never sees a half-written bundle.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ArtifactError> {
        fs::create_dir_all(dir)?;
        let path = Self::path_in(dir, self.slot);
        let staging = dir.join(format!(".{}.tmp", self.slot.key()));
        let bytes = serde_json::to_vec(self)?;
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &path)?;
        Ok(path)
    }

    /// `Ok(None)` when no artifact has been written for the slot.
    pub fn read_from(dir: &Path, slot: ModelSlot) -> Result<Option<Self>, ArtifactError> {
        let path = Self::path_in(dir, slot);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let artifact: Self = serde_json::from_slice(&bytes)?;
        if artifact.slot != slot {
            return Err(ArtifactError::SlotMismatch {
                expected: slot,
                found: artifact.slot,
            });
        }
        Ok(Some(artifact))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("artifact file for {expected} holds {found}")]
    SlotMismatch { expected: ModelSlot, found: ModelSlot },
}

/// Artifact file names in `dir`, sorted; a missing directory lists as empty.
pub fn list_artifact_files(dir: &Path) -> io::Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut files = Vec::new();
    for entry in entries {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.ends_with(ARTIFACT_SUFFIX) {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizsense_ml::{KMeansParams, StandardScaler};

    fn artifact(slot: ModelSlot) -> ModelArtifact {
        let rows = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![5.0, 5.0]];
        let (kmeans, _) = KMeans::fit(
            &rows,
            KMeansParams {
                n_clusters: 2,
                ..Default::default()
            },
        )
        .unwrap();
        ModelArtifact {
            slot,
            estimator: Estimator::Clusterer(kmeans),
            scaler: StandardScaler::fit(&rows).unwrap(),
            label_encoder: None,
            columns: vec!["a".into(), "b".into()],
            target: None,
            trained_at: Utc::now(),
            report: TrainingReport::Clustering {
                n_samples: 3,
                n_clusters: 2,
                inertia: 0.0,
                clusters: Vec::new(),
            },
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let written = artifact(ModelSlot::ComprehensionAnalyzer);
        let path = written.write_to(dir.path()).unwrap();
        assert!(path.ends_with("comprehension_analyzer.model.json"));

        let read = ModelArtifact::read_from(dir.path(), ModelSlot::ComprehensionAnalyzer)
            .unwrap()
            .unwrap();
        assert_eq!(read.columns, written.columns);
        assert_eq!(read.estimator.kind(), "KMeans");
    }

    #[test]
    fn test_missing_artifact_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ModelArtifact::read_from(dir.path(), ModelSlot::ScorePredictor)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_listing_filters_by_suffix() {
        let dir = tempfile::tempdir().unwrap();
        artifact(ModelSlot::ScorePredictor).write_to(dir.path()).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(
            list_artifact_files(dir.path()).unwrap(),
            vec!["score_predictor.model.json"]
        );
        assert!(list_artifact_files(&dir.path().join("absent")).unwrap().is_empty());
    }
}
