use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct CacheClearResponse {
    cleared: usize,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(model_info))
        .route("/cache/clear", post(clear_cache))
}

async fn model_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(SuccessResponse {
        success: true,
        data: state.registry().model_info(),
    })
}

async fn clear_cache(State(state): State<AppState>) -> impl IntoResponse {
    let cleared = state.registry().clear_cache();

    Json(SuccessResponse {
        success: true,
        data: CacheClearResponse { cleared },
    })
}
