//! Read-only access to the `questions` and `student_answers` tables.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::{AnswerFilter, StoreError};
use crate::records::{AnsweredQuestion, QuestionType, RawAnswerRecord, RawQuestionRecord};

const QUESTION_COLUMNS: &str = r#"
    q.id AS question_id,
    q.question_text AS question_text,
    q.question_type AS question_type,
    q.subject AS subject,
    q.correct_answer AS correct_answer,
    q.points AS points"#;

const ANSWER_COLUMNS: &str = r#"
    a.student_id AS student_id,
    a.question_id AS answer_question_id,
    a.answer_text AS answer_text,
    CAST(a.score AS REAL) AS score,
    CAST(a.max_score AS REAL) AS max_score,
    CAST(a.time_taken AS REAL) AS time_taken,
    a.attempt_number AS attempt_number,
    a.created_at AS created_at"#;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .read_only(true)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        tracing::info!("sqlite answer store connected");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn question(&self, question_id: i64) -> Result<Option<RawQuestionRecord>, StoreError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions q WHERE q.id = ?");
        let row = sqlx::query(&sql)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_question).transpose()
    }

    pub async fn answers(&self, filter: &AnswerFilter) -> Result<Vec<RawAnswerRecord>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ANSWER_COLUMNS} FROM student_answers a JOIN questions q ON q.id = a.question_id"
        ));
        push_filter(&mut qb, filter);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_answer).collect()
    }

    pub async fn answered_questions(
        &self,
        filter: &AnswerFilter,
    ) -> Result<Vec<AnsweredQuestion>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {QUESTION_COLUMNS}, {ANSWER_COLUMNS} FROM student_answers a JOIN questions q ON q.id = a.question_id"
        ));
        push_filter(&mut qb, filter);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(AnsweredQuestion {
                    question: map_question(row)?,
                    answer: map_answer(row)?,
                })
            })
            .collect()
    }
}

fn push_filter<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a AnswerFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(question_id) = filter.question_id {
        qb.push(" AND a.question_id = ").push_bind(question_id);
    }
    if let Some(subject) = filter.subject.as_deref() {
        qb.push(" AND q.subject = ").push_bind(subject);
    }
    if let Some(cutoff) = filter.created_after {
        qb.push(" AND a.created_at >= ").push_bind(cutoff);
    }
    qb.push(" ORDER BY a.created_at DESC, a.id DESC");
    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ").push_bind(limit as i64);
    }
}

fn map_question(row: &SqliteRow) -> Result<RawQuestionRecord, StoreError> {
    let question_type: Option<String> = row.try_get("question_type")?;
    Ok(RawQuestionRecord {
        question_id: row.try_get("question_id")?,
        question_text: row
            .try_get::<Option<String>, _>("question_text")?
            .unwrap_or_default(),
        question_type: question_type.as_deref().and_then(QuestionType::parse),
        subject: row.try_get("subject")?,
        correct_answer: row.try_get("correct_answer")?,
        points: row.try_get("points")?,
    })
}

fn map_answer(row: &SqliteRow) -> Result<RawAnswerRecord, StoreError> {
    Ok(RawAnswerRecord {
        student_id: row.try_get::<Option<i64>, _>("student_id")?.unwrap_or_default(),
        question_id: row.try_get("answer_question_id")?,
        answer_text: row
            .try_get::<Option<String>, _>("answer_text")?
            .unwrap_or_default(),
        score: row.try_get::<Option<f64>, _>("score")?.unwrap_or(0.0),
        max_score: row.try_get::<Option<f64>, _>("max_score")?.unwrap_or(0.0),
        time_taken_seconds: row.try_get::<Option<f64>, _>("time_taken")?.unwrap_or(0.0),
        attempt_number: row
            .try_get::<Option<i64>, _>("attempt_number")?
            .unwrap_or(1),
        created_at: row
            .try_get::<Option<DateTime<Utc>>, _>("created_at")?
            .unwrap_or_default(),
    })
}
