use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde::Serialize;

use crate::response::AppError;
use crate::services::analysis::{
    self, AnswerAnalysisRequest, BatchAnalysisRequest, QuestionAnalysisRequest,
};
use crate::services::AnalysisError;
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/question", post(analyze_question))
        .route("/answer", post(analyze_answer))
        .route("/question/:id/performance", get(question_performance))
}

async fn analyze_question(
    State(state): State<AppState>,
    Json(payload): Json<QuestionAnalysisRequest>,
) -> Result<impl IntoResponse, AppError> {
    let extractor = state.extractor();
    let registry = state.registry();
    let result = tokio::task::spawn_blocking(move || {
        analysis::analyze_question(&extractor, &registry, &payload)
    })
    .await
    .map_err(AnalysisError::from)??;

    Ok(Json(SuccessResponse {
        success: true,
        data: result,
    }))
}

async fn analyze_answer(
    State(state): State<AppState>,
    Json(payload): Json<AnswerAnalysisRequest>,
) -> Result<impl IntoResponse, AppError> {
    let extractor = state.extractor();
    let registry = state.registry();
    let result = tokio::task::spawn_blocking(move || {
        analysis::analyze_answer(&extractor, &registry, &payload)
    })
    .await
    .map_err(AnalysisError::from)??;

    Ok(Json(SuccessResponse {
        success: true,
        data: result,
    }))
}

async fn question_performance(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = analysis::question_performance(
        state.store(),
        id,
        state.config().min_performance_samples,
        state.config().mistake_min_frequency,
    )
    .await?;

    Ok(Json(SuccessResponse {
        success: true,
        data: result,
    }))
}

pub async fn batch_analyze_questions(
    State(state): State<AppState>,
    Json(payload): Json<BatchAnalysisRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.questions.is_empty() {
        return Err(AppError::validation("questions must not be empty"));
    }

    let extractor = state.extractor();
    let registry = state.registry();
    let result = tokio::task::spawn_blocking(move || {
        analysis::analyze_questions(&extractor, &registry, &payload.questions)
    })
    .await
    .map_err(AnalysisError::from)?;

    Ok(Json(SuccessResponse {
        success: true,
        data: result,
    }))
}
