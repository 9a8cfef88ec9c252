#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use chrono::{Duration, Utc};
use tempfile::TempDir;

use quizsense_backend::config::Config;
use quizsense_backend::records::{QuestionType, RawAnswerRecord, RawQuestionRecord};
use quizsense_backend::state::AppState;
use quizsense_backend::store::{memory::MemoryStore, AnswerStore};

pub async fn create_test_app() -> Router {
    std::env::set_var("DATABASE_URL", "");
    std::env::set_var(
        "MODEL_DIR",
        std::env::temp_dir().join(format!("quizsense-test-{}", uuid::Uuid::new_v4())),
    );

    quizsense_backend::create_app().await
}

pub fn question(
    id: i64,
    text: &str,
    question_type: QuestionType,
    subject: &str,
    correct_answer: &str,
) -> RawQuestionRecord {
    RawQuestionRecord {
        question_id: id,
        question_text: text.to_string(),
        question_type: Some(question_type),
        subject: Some(subject.to_string()),
        correct_answer: Some(correct_answer.to_string()),
        points: Some(10),
    }
}

pub fn answer(
    student_id: i64,
    question_id: i64,
    text: &str,
    score: f64,
    time_taken_seconds: f64,
    age_days: i64,
) -> RawAnswerRecord {
    RawAnswerRecord {
        student_id,
        question_id,
        answer_text: text.to_string(),
        score,
        max_score: 10.0,
        time_taken_seconds,
        attempt_number: 1,
        created_at: Utc::now() - Duration::days(age_days),
    }
}

/// Four questions over two subjects, six students each, spread from easy to hard.
pub fn seeded_memory() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.insert_question(question(
        1,
        "What is photosynthesis?",
        QuestionType::ShortAnswer,
        "biology",
        "Plants convert light energy into chemical energy.",
    ));
    store.insert_question(question(
        2,
        "Explain how osmosis moves water across the semipermeable membranes of plant cells and why turgor pressure matters.",
        QuestionType::Essay,
        "biology",
        "Water diffuses toward higher solute concentration, building turgor pressure.",
    ));
    store.insert_question(question(
        3,
        "Which of these numbers is prime?",
        QuestionType::MultipleChoice,
        "math",
        "7",
    ));
    store.insert_question(question(
        4,
        "True or false: the sum of angles in a triangle is 180 degrees.",
        QuestionType::TrueFalse,
        "math",
        "true",
    ));

    let easy = [10.0, 9.5, 9.0, 10.0, 8.5, 9.0];
    let hard = [1.0, 2.0, 0.5, 3.0, 1.5, 0.0];
    let mixed = [10.0, 2.0, 9.0, 1.0, 8.0, 3.0];
    let middling = [6.0, 7.0, 5.5, 6.5, 7.0, 6.0];

    for student in 0..6i64 {
        let s = student as usize;
        store.extend_answers([
            answer(
                student + 1,
                1,
                "Plants convert light energy into chemical energy.",
                easy[s],
                40.0 + student as f64 * 5.0,
                student,
            ),
            answer(
                student + 1,
                2,
                "water moves",
                hard[s],
                420.0 + student as f64 * 30.0,
                student + 2,
            ),
            answer(student + 1, 3, if s % 2 == 0 { "7" } else { "9" }, mixed[s], 30.0, student),
            answer(student + 1, 4, "true", middling[s], 20.0, 40 + student),
        ]);
    }
    Arc::new(store)
}

pub fn test_state() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        model_dir: dir.path().to_path_buf(),
        default_min_samples: 3,
        comprehension_clusters: 3,
        ..Config::default()
    };
    let state = AppState::new(config, AnswerStore::Memory(seeded_memory()));
    (state, dir)
}

pub fn seeded_app() -> (Router, AppState, TempDir) {
    let (state, dir) = test_state();
    (quizsense_backend::build_router(state.clone()), state, dir)
}
