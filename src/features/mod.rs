//! Text feature extraction.
//!
//! Every non-empty text yields the base keys plus the five syntax keys. The
//! syntax keys are zero when no analyzer is configured or the analyzer gives
//! up. Empty or whitespace-only text yields the base keys only, all zero.

pub mod matrix;
pub mod question;
pub mod readability;
pub mod sentiment;
pub mod syntax;
pub mod text;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use matrix::{FeatureMatrix, SchemaMismatch};
pub use question::{jaccard_overlap, ANSWER_KEYS, QUESTION_KEYS, QUESTION_WORDS};
pub use syntax::{HeuristicTagger, SyntacticAnalyzer, SyntaxCounts};

/// Feature name to value, ordered by name.
pub type FeatureVector = BTreeMap<String, f64>;

pub const BASE_FEATURES: [&str; 21] = [
    "char_count",
    "word_count",
    "sentence_count",
    "paragraph_count",
    "avg_word_length",
    "avg_sentence_length",
    "flesch_reading_ease",
    "flesch_kincaid_grade",
    "gunning_fog",
    "automated_readability_index",
    "syllable_count",
    "polysyllable_count",
    "difficult_words",
    "unique_word_ratio",
    "punctuation_count",
    "uppercase_ratio",
    "digit_count",
    "sentiment_positive",
    "sentiment_negative",
    "sentiment_neutral",
    "sentiment_compound",
];

pub const SYNTAX_FEATURES: [&str; 5] = [
    "noun_count",
    "verb_count",
    "adj_count",
    "adv_count",
    "entity_count",
];

pub fn empty_features() -> FeatureVector {
    BASE_FEATURES.iter().map(|k| (k.to_string(), 0.0)).collect()
}

#[derive(Clone)]
pub struct TextFeatureExtractor {
    syntax: Option<Arc<dyn SyntacticAnalyzer>>,
}

impl std::fmt::Debug for TextFeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextFeatureExtractor")
            .field("syntax", &self.syntax.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl Default for TextFeatureExtractor {
    fn default() -> Self {
        Self::with_analyzer(Arc::new(HeuristicTagger))
    }
}

impl TextFeatureExtractor {
    pub fn with_analyzer(analyzer: Arc<dyn SyntacticAnalyzer>) -> Self {
        Self {
            syntax: Some(analyzer),
        }
    }

    pub fn without_syntax() -> Self {
        Self { syntax: None }
    }

    pub fn from_flag(syntax_enabled: bool) -> Self {
        if syntax_enabled {
            Self::default()
        } else {
            tracing::info!("syntactic analysis disabled, syntax features will be zero");
            Self::without_syntax()
        }
    }

    pub fn has_syntax(&self) -> bool {
        self.syntax.is_some()
    }

    pub fn extract(&self, text: &str) -> FeatureVector {
        if text.trim().is_empty() {
            return empty_features();
        }

        let mut features = FeatureVector::new();
        text::lexical_features(text, &mut features);
        readability::readability_features(text, &mut features);
        sentiment::sentiment_features(text, &mut features);
        self.syntax_features(text, &mut features);
        features
    }

    fn syntax_features(&self, text: &str, out: &mut FeatureVector) {
        let counts = match &self.syntax {
            Some(analyzer) => analyzer.analyze(text).unwrap_or_else(|| {
                tracing::debug!(analyzer = analyzer.name(), "syntactic analysis skipped");
                SyntaxCounts::default()
            }),
            None => SyntaxCounts::default(),
        };
        out.insert("noun_count".into(), counts.nouns as f64);
        out.insert("verb_count".into(), counts.verbs as f64);
        out.insert("adj_count".into(), counts.adjectives as f64);
        out.insert("adv_count".into(), counts.adverbs as f64);
        out.insert("entity_count".into(), counts.entities as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unavailable;

    impl SyntacticAnalyzer for Unavailable {
        fn name(&self) -> &'static str {
            "unavailable"
        }

        fn analyze(&self, _text: &str) -> Option<SyntaxCounts> {
            None
        }
    }

    #[test]
    fn test_empty_and_blank_text_match() {
        let extractor = TextFeatureExtractor::default();
        let empty = extractor.extract("");
        let blank = extractor.extract("   \n\t");
        assert_eq!(empty, blank);
        assert_eq!(empty.len(), BASE_FEATURES.len());
        assert!(empty.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_non_empty_text_has_full_schema() {
        let f = TextFeatureExtractor::default().extract("Explain how plants make food.");
        for key in BASE_FEATURES.iter().chain(SYNTAX_FEATURES.iter()) {
            assert!(f.contains_key(*key), "missing {key}");
        }
        assert_eq!(f.len(), BASE_FEATURES.len() + SYNTAX_FEATURES.len());
    }

    #[test]
    fn test_unavailable_analyzer_zeroes_syntax() {
        let extractor = TextFeatureExtractor::with_analyzer(Arc::new(Unavailable));
        let f = extractor.extract("Marie Curie studied radioactivity in Paris.");
        for key in SYNTAX_FEATURES {
            assert_eq!(f[key], 0.0);
        }
        assert!(f["word_count"] > 0.0);
    }

    #[test]
    fn test_without_syntax_keeps_keys() {
        let f = TextFeatureExtractor::without_syntax().extract("Some words here.");
        assert_eq!(f["noun_count"], 0.0);
    }
}
