use crate::records::QuestionType;

use super::text::word_set;
use super::{FeatureVector, TextFeatureExtractor};

pub const QUESTION_WORDS: [&str; 9] = [
    "what", "when", "where", "who", "why", "how", "which", "whom", "whose",
];

pub const QUESTION_KEYS: [&str; 6] = [
    "question_word_count",
    "has_question_mark",
    "is_multiple_choice",
    "is_short_answer",
    "is_essay",
    "is_true_false",
];

pub const ANSWER_KEYS: [&str; 5] = [
    "answer_question_overlap",
    "correct_answer_similarity",
    "starts_with_capital",
    "ends_with_period",
    "contains_numbers",
];

/// Jaccard similarity of the lowercased whitespace word sets; 0 when the union is empty.
pub fn jaccard_overlap(a: &str, b: &str) -> f64 {
    let left = word_set(a);
    let right = word_set(b);
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl TextFeatureExtractor {
    /// Text features plus question-word, question-mark and one-hot type flags.
    pub fn extract_question(&self, text: &str, question_type: Option<QuestionType>) -> FeatureVector {
        let mut features = self.extract(text);

        let words = word_set(text);
        let question_words = QUESTION_WORDS
            .iter()
            .filter(|qw| {
                words
                    .iter()
                    .any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == **qw)
            })
            .count();

        features.insert("question_word_count".into(), question_words as f64);
        features.insert("has_question_mark".into(), flag(text.contains('?')));
        for qt in QuestionType::ALL {
            features.insert(format!("is_{}", qt.as_str()), flag(question_type == Some(qt)));
        }
        features
    }

    /// Text features of the answer plus overlap and surface-form flags.
    ///
    /// Overlap keys are always present; they are 0 when the reference text is absent.
    pub fn extract_answer(
        &self,
        answer_text: &str,
        question_text: Option<&str>,
        correct_answer: Option<&str>,
    ) -> FeatureVector {
        let mut features = self.extract(answer_text);

        features.insert(
            "answer_question_overlap".into(),
            question_text
                .map(|q| jaccard_overlap(answer_text, q))
                .unwrap_or(0.0),
        );
        features.insert(
            "correct_answer_similarity".into(),
            correct_answer
                .map(|c| jaccard_overlap(answer_text, c))
                .unwrap_or(0.0),
        );

        let starts_upper = answer_text
            .chars()
            .next()
            .map(char::is_uppercase)
            .unwrap_or(false);
        features.insert("starts_with_capital".into(), flag(starts_upper));
        features.insert("ends_with_period".into(), flag(answer_text.ends_with('.')));
        features.insert(
            "contains_numbers".into(),
            flag(answer_text.chars().any(|c| c.is_ascii_digit())),
        );
        features
    }
}
