use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde::Serialize;

use crate::response::AppError;
use crate::services::analysis::{self, QuestionSetRequest};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/questions/difficulty", post(question_set_difficulty))
        .route("/subject/:subject", get(subject_performance))
}

async fn question_set_difficulty(
    State(state): State<AppState>,
    payload: Option<Json<QuestionSetRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let result = analysis::analyze_question_set(state.store(), &request).await?;

    Ok(Json(SuccessResponse {
        success: true,
        data: result,
    }))
}

async fn subject_performance(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = analysis::subject_performance(
        state.store(),
        &subject,
        state.config().min_performance_samples,
    )
    .await?;

    Ok(Json(SuccessResponse {
        success: true,
        data: result,
    }))
}
