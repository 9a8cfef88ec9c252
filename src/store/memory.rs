use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::AnswerFilter;
use crate::records::{AnsweredQuestion, RawAnswerRecord, RawQuestionRecord};

/// Process-local store used by tests and when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    questions: RwLock<BTreeMap<i64, RawQuestionRecord>>,
    answers: RwLock<Vec<RawAnswerRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_question(&self, question: RawQuestionRecord) {
        self.questions.write().insert(question.question_id, question);
    }

    pub fn insert_answer(&self, answer: RawAnswerRecord) {
        self.answers.write().push(answer);
    }

    pub fn extend_answers(&self, answers: impl IntoIterator<Item = RawAnswerRecord>) {
        self.answers.write().extend(answers);
    }

    pub fn question(&self, question_id: i64) -> Option<RawQuestionRecord> {
        self.questions.read().get(&question_id).cloned()
    }

    pub fn answers(&self, filter: &AnswerFilter) -> Vec<RawAnswerRecord> {
        self.answered_questions(filter)
            .into_iter()
            .map(|joined| joined.answer)
            .collect()
    }

    pub fn answered_questions(&self, filter: &AnswerFilter) -> Vec<AnsweredQuestion> {
        let questions = self.questions.read();
        let mut matched: Vec<AnsweredQuestion> = self
            .answers
            .read()
            .iter()
            .filter(|a| filter.question_id.map_or(true, |id| a.question_id == id))
            .filter(|a| filter.created_after.map_or(true, |cutoff| a.created_at >= cutoff))
            .filter_map(|a| {
                let question = questions.get(&a.question_id)?;
                if let Some(subject) = filter.subject.as_deref() {
                    if question.subject.as_deref() != Some(subject) {
                        return None;
                    }
                }
                Some(AnsweredQuestion {
                    question: question.clone(),
                    answer: a.clone(),
                })
            })
            .collect();

        matched.sort_by(|a, b| b.answer.created_at.cmp(&a.answer.created_at));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn question(id: i64, subject: &str) -> RawQuestionRecord {
        RawQuestionRecord {
            question_id: id,
            question_text: format!("Question {id}?"),
            question_type: None,
            subject: Some(subject.to_string()),
            correct_answer: None,
            points: None,
        }
    }

    fn answer(question_id: i64, age_days: i64) -> RawAnswerRecord {
        RawAnswerRecord {
            student_id: 1,
            question_id,
            answer_text: "x".into(),
            score: 1.0,
            max_score: 1.0,
            time_taken_seconds: 10.0,
            attempt_number: 1,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[test]
    fn test_filters_compose() {
        let store = MemoryStore::new();
        store.insert_question(question(1, "math"));
        store.insert_question(question(2, "biology"));
        store.extend_answers([answer(1, 1), answer(1, 40), answer(2, 2), answer(3, 1)]);

        assert_eq!(store.answers(&AnswerFilter::default()).len(), 3);
        assert_eq!(store.answers(&AnswerFilter::for_subject("math")).len(), 2);
        let recent = AnswerFilter::for_question(1).since(Utc::now() - Duration::days(30));
        assert_eq!(store.answers(&recent).len(), 1);
        let newest = store.answers(&AnswerFilter::default().limit(1));
        assert_eq!(newest[0].question_id, 1);
        assert!(store.question(2).is_some());
    }
}
