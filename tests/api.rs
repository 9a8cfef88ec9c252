use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use quizsense_backend::models::ModelSlot;
use quizsense_backend::services::training::train_slot;
use quizsense_backend::store::AnswerFilter;

mod common;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = common::create_test_app().await;

    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["backend"], "memory");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = common::create_test_app().await;

    let (status, body) = send(app, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_analyze_question_without_model() {
    let (app, _state, _dir) = common::seeded_app();

    let (status, body) = send(
        app,
        post_json("/analyze/question", json!({ "question_text": "What is a cell?" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MODEL_NOT_AVAILABLE");
}

#[tokio::test]
async fn test_analyze_loads_evicted_models_from_disk() {
    let (app, state, _dir) = common::seeded_app();
    let answered = state
        .store()
        .answered_questions(&AnswerFilter::default())
        .await
        .unwrap();
    for slot in ModelSlot::ALL {
        train_slot(&state.extractor(), &state.registry(), slot, &answered, 3).unwrap();
    }
    assert_eq!(state.registry().clear_cache(), 3);

    let (status, body) = send(
        app.clone(),
        post_json("/analyze/question", json!({ "question_text": "What is a cell?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["difficulty_prediction"]["predicted_difficulty"].is_string());
    assert!(state.registry().is_cached(ModelSlot::DifficultyPredictor));

    let (status, body) = send(
        app,
        post_json(
            "/analyze/answer",
            json!({ "question_text": "What is a cell?", "answer_text": "The unit of life.", "time_taken": 30.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let score = body["data"]["score_prediction"]["predicted_score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));
    assert!(state.registry().is_cached(ModelSlot::ComprehensionAnalyzer));
}

#[tokio::test]
async fn test_analyze_answer_rejects_blank_text() {
    let (app, _state, _dir) = common::seeded_app();

    let (status, body) = send(
        app,
        post_json(
            "/analyze/answer",
            json!({ "question_text": "What is a cell?", "answer_text": "   " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_question_performance() {
    let (app, _state, _dir) = common::seeded_app();

    let (status, body) = send(app.clone(), get("/analyze/question/1/performance")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["performance_metrics"]["total_attempts"], 6);
    assert_eq!(body["data"]["difficulty_analysis"]["calculated_difficulty"], "easy");

    let (status, _) = send(app, get("/analyze/question/42/performance")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_question_set_and_subject() {
    let (app, _state, _dir) = common::seeded_app();

    let (status, body) = send(
        app.clone(),
        post_json(
            "/analytics/questions/difficulty",
            json!({ "subject_filter": "math", "min_attempts": 5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_questions_analyzed"], 2);

    let (status, body) = send(app.clone(), get("/analytics/subject/biology")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["question_count"], 2);

    let (status, _) = send(app, get("/analytics/subject/history")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_train_is_accepted_then_conflicts() {
    let (app, state, _dir) = common::seeded_app();

    let (status, _) = send(app.clone(), post_json("/train/unknown", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let guard = state
        .registry()
        .try_begin_training(quizsense_backend::models::ModelSlot::ScorePredictor)
        .unwrap();
    let (status, body) = send(app.clone(), post_json("/train/score", json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = send(app.clone(), get("/train/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["training_in_progress"]["score_predictor"], true);
    drop(guard);

    let (status, body) = send(
        app,
        post_json("/train/difficulty", json!({ "min_samples": 2, "retrain": true })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["model_type"], "difficulty_predictor");
    assert_eq!(body["data"]["min_samples"], 2);
}

#[tokio::test]
async fn test_batch_counts_failures() {
    let (app, _state, _dir) = common::seeded_app();

    let (status, body) = send(
        app,
        post_json(
            "/batch/analyze/questions",
            json!({ "questions": [
                { "question_text": "What is a cell?" },
                { "question_text": "" }
            ] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_questions"], 2);
    assert_eq!(body["data"]["processed_questions"], 0);
    assert_eq!(body["data"]["failed_questions"], 2);
}

#[tokio::test]
async fn test_models_inventory_and_cache_clear() {
    let (app, _state, _dir) = common::seeded_app();

    let (status, body) = send(app.clone(), get("/models")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available_model_files"], json!([]));

    let (status, body) = send(app, post_json("/models/cache/clear", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cleared"], 0);
}
