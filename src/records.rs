use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    Essay,
    TrueFalse,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::MultipleChoice,
        QuestionType::ShortAnswer,
        QuestionType::Essay,
        QuestionType::TrueFalse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Essay => "essay",
            QuestionType::TrueFalse => "true_false",
        }
    }

    /// Lenient parse: unknown or blank values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawQuestionRecord {
    pub question_id: i64,
    pub question_text: String,
    pub question_type: Option<QuestionType>,
    pub subject: Option<String>,
    pub correct_answer: Option<String>,
    pub points: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAnswerRecord {
    pub student_id: i64,
    pub question_id: i64,
    pub answer_text: String,
    pub score: f64,
    pub max_score: f64,
    pub time_taken_seconds: f64,
    pub attempt_number: i64,
    pub created_at: DateTime<Utc>,
}

impl RawAnswerRecord {
    /// Score over max score clamped to [0, 1]; `None` when max score is not positive.
    pub fn score_ratio(&self) -> Option<f64> {
        if self.max_score > 0.0 && self.score.is_finite() {
            Some((self.score / self.max_score).clamp(0.0, 1.0))
        } else {
            None
        }
    }
}

/// Answer joined with its question, the unit the training sets are built from.
#[derive(Debug, Clone)]
pub struct AnsweredQuestion {
    pub question: RawQuestionRecord,
    pub answer: RawAnswerRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_parse() {
        assert_eq!(
            QuestionType::parse("Multiple Choice"),
            Some(QuestionType::MultipleChoice)
        );
        assert_eq!(QuestionType::parse("true-false"), Some(QuestionType::TrueFalse));
        assert_eq!(QuestionType::parse("oral"), None);
    }

    #[test]
    fn test_score_ratio_clamps_and_guards() {
        let mut answer = RawAnswerRecord {
            student_id: 1,
            question_id: 1,
            answer_text: String::new(),
            score: 12.0,
            max_score: 10.0,
            time_taken_seconds: 30.0,
            attempt_number: 1,
            created_at: Utc::now(),
        };
        assert_eq!(answer.score_ratio(), Some(1.0));
        answer.max_score = 0.0;
        assert_eq!(answer.score_ratio(), None);
    }
}
