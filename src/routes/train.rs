use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde::Serialize;

use crate::response::AppError;
use crate::services::training::{self, TrainingRequest};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct TrainingStatusResponse {
    training_in_progress: BTreeMap<String, bool>,
    loaded_models: Vec<String>,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/status", get(status))
        .route("/:model_type", post(start))
}

async fn start(
    State(state): State<AppState>,
    Path(model_type): Path<String>,
    payload: Option<Json<TrainingRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let accepted = training::start_training(&state, &model_type, &request)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SuccessResponse {
            success: true,
            data: accepted,
        }),
    ))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let info = state.registry().model_info();

    Json(SuccessResponse {
        success: true,
        data: TrainingStatusResponse {
            training_in_progress: info.training_in_progress,
            loaded_models: info.loaded_models.into_keys().collect(),
        },
    })
}
