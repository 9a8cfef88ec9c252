mod analytics;
mod analyze;
mod health;
mod models;
mod train;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/batch/analyze/questions", post(analyze::batch_analyze_questions))
        .nest("/analyze", analyze::router())
        .nest("/train", train::router())
        .nest("/analytics", analytics::router())
        .nest("/models", models::router())
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Endpoint not found").into_response()
}
