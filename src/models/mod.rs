//! Trained estimators behind three named slots.
//!
//! Each slot owns one artifact on disk (estimator, scaler, optional label
//! encoder and the column schema it was fitted on). Retraining overwrites
//! the artifact; there is no versioning.

pub mod artifact;
pub mod registry;
pub mod training;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use artifact::{Estimator, ModelArtifact, ARTIFACT_SUFFIX};
pub use registry::{
    ComprehensionPrediction, DifficultyPrediction, ModelInfo, ModelRegistry, RegistryError,
    TrainingGuard,
};
pub use training::{ClusterSummary, FeatureImportance, TrainingParams, TrainingReport};

/// Label column holding the difficulty tier of each question-only row.
pub const DIFFICULTY_LABEL: &str = "difficulty_level";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSlot {
    DifficultyPredictor,
    ScorePredictor,
    ComprehensionAnalyzer,
}

impl ModelSlot {
    pub const ALL: [ModelSlot; 3] = [
        ModelSlot::DifficultyPredictor,
        ModelSlot::ScorePredictor,
        ModelSlot::ComprehensionAnalyzer,
    ];

    /// Stable artifact key.
    pub fn key(&self) -> &'static str {
        match self {
            ModelSlot::DifficultyPredictor => "difficulty_predictor",
            ModelSlot::ScorePredictor => "score_predictor",
            ModelSlot::ComprehensionAnalyzer => "comprehension_analyzer",
        }
    }

    /// Name used by the training trigger (`difficulty`, `score`, `comprehension`).
    pub fn short_name(&self) -> &'static str {
        match self {
            ModelSlot::DifficultyPredictor => "difficulty",
            ModelSlot::ScorePredictor => "score",
            ModelSlot::ComprehensionAnalyzer => "comprehension",
        }
    }

    /// Accepts either the short name or the artifact key.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|slot| slot.short_name() == value || slot.key() == value)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ModelSlot::DifficultyPredictor => 0,
            ModelSlot::ScorePredictor => 1,
            ModelSlot::ComprehensionAnalyzer => 2,
        }
    }

    /// Column the slot learns from: a label column for the classifier, the
    /// numeric score ratio otherwise.
    pub fn default_target(&self) -> &'static str {
        match self {
            ModelSlot::DifficultyPredictor => DIFFICULTY_LABEL,
            ModelSlot::ScorePredictor | ModelSlot::ComprehensionAnalyzer => {
                crate::features::matrix::SCORE_RATIO
            }
        }
    }
}

impl fmt::Display for ModelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_both_names() {
        assert_eq!(ModelSlot::parse("score"), Some(ModelSlot::ScorePredictor));
        assert_eq!(
            ModelSlot::parse("comprehension_analyzer"),
            Some(ModelSlot::ComprehensionAnalyzer)
        );
        assert_eq!(ModelSlot::parse("regression"), None);
    }

    #[test]
    fn test_indices_are_distinct() {
        let mut seen: Vec<usize> = ModelSlot::ALL.iter().map(ModelSlot::index).collect();
        seen.dedup();
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
