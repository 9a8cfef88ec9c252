//! Read access to questions and student answers.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::records::{AnsweredQuestion, RawAnswerRecord, RawQuestionRecord};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// Answer selection. Every field narrows the result; `limit` keeps the most recent rows.
#[derive(Debug, Clone, Default)]
pub struct AnswerFilter {
    pub question_id: Option<i64>,
    pub subject: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl AnswerFilter {
    pub fn for_question(question_id: i64) -> Self {
        Self {
            question_id: Some(question_id),
            ..Default::default()
        }
    }

    pub fn for_subject(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..Default::default()
        }
    }

    pub fn since(mut self, cutoff: DateTime<Utc>) -> Self {
        self.created_after = Some(cutoff);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Clone)]
pub enum AnswerStore {
    Memory(Arc<MemoryStore>),
    Sqlite(SqliteStore),
}

impl std::fmt::Debug for AnswerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AnswerStore").field(&self.backend()).finish()
    }
}

impl AnswerStore {
    /// SQLite when a URL is configured, otherwise an empty in-memory store.
    pub async fn connect(database_url: Option<&str>) -> Result<Self, StoreError> {
        match database_url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => Ok(AnswerStore::Sqlite(SqliteStore::connect(url).await?)),
            None => {
                tracing::info!("no DATABASE_URL configured, using in-memory answer store");
                Ok(AnswerStore::Memory(Arc::new(MemoryStore::new())))
            }
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            AnswerStore::Memory(_) => "memory",
            AnswerStore::Sqlite(_) => "sqlite",
        }
    }

    pub fn memory(&self) -> Option<&Arc<MemoryStore>> {
        match self {
            AnswerStore::Memory(store) => Some(store),
            AnswerStore::Sqlite(_) => None,
        }
    }

    pub async fn ping(&self) -> bool {
        match self {
            AnswerStore::Memory(_) => true,
            AnswerStore::Sqlite(store) => store.ping().await,
        }
    }

    pub async fn question(&self, question_id: i64) -> Result<Option<RawQuestionRecord>, StoreError> {
        match self {
            AnswerStore::Memory(store) => Ok(store.question(question_id)),
            AnswerStore::Sqlite(store) => store.question(question_id).await,
        }
    }

    /// Matching answers, newest first.
    pub async fn answers(&self, filter: &AnswerFilter) -> Result<Vec<RawAnswerRecord>, StoreError> {
        match self {
            AnswerStore::Memory(store) => Ok(store.answers(filter)),
            AnswerStore::Sqlite(store) => store.answers(filter).await,
        }
    }

    /// Matching answers joined with their questions, newest first. Answers
    /// whose question is unknown are skipped.
    pub async fn answered_questions(
        &self,
        filter: &AnswerFilter,
    ) -> Result<Vec<AnsweredQuestion>, StoreError> {
        match self {
            AnswerStore::Memory(store) => Ok(store.answered_questions(filter)),
            AnswerStore::Sqlite(store) => store.answered_questions(filter).await,
        }
    }
}
