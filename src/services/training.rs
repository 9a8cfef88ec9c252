//! Background training of the three model slots from stored answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::{answer_training_matrix, difficulty_training_matrix, MIN_ATTEMPTS_PER_QUESTION};
use super::AnalysisError;
use crate::features::TextFeatureExtractor;
use crate::models::{ModelRegistry, ModelSlot, TrainingGuard, TrainingReport};
use crate::records::AnsweredQuestion;
use crate::state::AppState;
use crate::store::AnswerFilter;

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("training already in progress for {0}")]
    AlreadyInProgress(ModelSlot),
    #[error("{0} is already trained; pass retrain=true to replace it")]
    AlreadyTrained(ModelSlot),
    #[error("unknown model type: {0}")]
    UnknownSlot(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingRequest {
    #[serde(default)]
    pub min_samples: Option<usize>,
    #[serde(default)]
    pub retrain: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingAccepted {
    pub job_id: Uuid,
    pub model_type: ModelSlot,
    pub min_samples: usize,
    pub status: &'static str,
    pub message: String,
    pub started_at: DateTime<Utc>,
}

/// How many stored answers each slot pulls per required sample.
fn answer_limit(slot: ModelSlot, min_samples: usize) -> Option<usize> {
    match slot {
        ModelSlot::DifficultyPredictor => None,
        ModelSlot::ScorePredictor => Some(min_samples.saturating_mul(10)),
        ModelSlot::ComprehensionAnalyzer => Some(min_samples.saturating_mul(5)),
    }
}

/// Validates the request and spawns the fit; returns as soon as the job is queued.
pub fn start_training(
    state: &AppState,
    model_type: &str,
    request: &TrainingRequest,
) -> Result<TrainingAccepted, AnalysisError> {
    let slot = ModelSlot::parse(model_type)
        .ok_or_else(|| TrainingError::UnknownSlot(model_type.to_string()))?;
    let min_samples = request
        .min_samples
        .unwrap_or(state.config().default_min_samples)
        .max(1);
    let registry = state.registry();

    if !request.retrain.unwrap_or(false) && registry.is_available(slot) {
        return Err(TrainingError::AlreadyTrained(slot).into());
    }
    let guard = registry
        .try_begin_training(slot)
        .ok_or(TrainingError::AlreadyInProgress(slot))?;

    let job_id = Uuid::new_v4();
    let task_state = state.clone();
    tokio::spawn(async move {
        match run_training(task_state, guard, min_samples).await {
            Ok(Some(report)) => {
                tracing::info!(%job_id, slot = %slot, summary = %report.headline(), "training finished")
            }
            Ok(None) => {}
            Err(err) => tracing::error!(%job_id, slot = %slot, error = %err, "training failed"),
        }
    });

    tracing::info!(%job_id, slot = %slot, min_samples, "training scheduled");
    Ok(TrainingAccepted {
        job_id,
        model_type: slot,
        min_samples,
        status: "started",
        message: format!("Training started for {}", slot.short_name()),
        started_at: Utc::now(),
    })
}

/// Loads the slot's training rows and fits on the blocking pool.
///
/// The guard is held until the fit completes or fails.
pub async fn run_training(
    state: AppState,
    guard: TrainingGuard,
    min_samples: usize,
) -> Result<Option<TrainingReport>, AnalysisError> {
    let slot = guard.slot();
    let filter = AnswerFilter {
        limit: answer_limit(slot, min_samples),
        ..Default::default()
    };
    let answered = state.store().answered_questions(&filter).await?;
    let extractor = state.extractor();

    tokio::task::spawn_blocking(move || {
        let registry = guard.registry();
        train_slot(&extractor, registry, slot, &answered, min_samples)
    })
    .await?
}

/// Builds the slot's training matrix and fits it when enough rows exist.
///
/// Returns `Ok(None)` when there are fewer than `min_samples` rows.
pub fn train_slot(
    extractor: &TextFeatureExtractor,
    registry: &ModelRegistry,
    slot: ModelSlot,
    answered: &[AnsweredQuestion],
    min_samples: usize,
) -> Result<Option<TrainingReport>, AnalysisError> {
    let matrix = match slot {
        ModelSlot::DifficultyPredictor => {
            difficulty_training_matrix(extractor, answered, MIN_ATTEMPTS_PER_QUESTION)
        }
        ModelSlot::ScorePredictor | ModelSlot::ComprehensionAnalyzer => {
            answer_training_matrix(extractor, answered)
        }
    };

    if matrix.n_rows() < min_samples {
        tracing::warn!(
            slot = %slot,
            rows = matrix.n_rows(),
            min_samples,
            "insufficient training data"
        );
        return Ok(None);
    }

    let report = registry.train(slot, &matrix, slot.default_target())?;
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_limits() {
        assert_eq!(answer_limit(ModelSlot::DifficultyPredictor, 50), None);
        assert_eq!(answer_limit(ModelSlot::ScorePredictor, 50), Some(500));
        assert_eq!(answer_limit(ModelSlot::ComprehensionAnalyzer, 50), Some(250));
    }

    #[test]
    fn test_too_few_rows_skips_fit() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path(), Default::default());
        let report = train_slot(
            &TextFeatureExtractor::default(),
            &registry,
            ModelSlot::ScorePredictor,
            &[],
            10,
        )
        .unwrap();
        assert!(report.is_none());
        assert!(!registry.is_available(ModelSlot::ScorePredictor));
    }
}
