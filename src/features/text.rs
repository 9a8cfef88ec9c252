//! Tokenizing and lexical counts.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::FeatureVector;

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9]+(?:'[A-Za-z]+)?").expect("valid word regex"));
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("valid sentence regex"));
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph regex"));

pub const PUNCTUATION: &str = ".,;:!?";

/// Alphanumeric word tokens with their original casing.
pub fn word_tokens(text: &str) -> Vec<&str> {
    WORD.find_iter(text).map(|m| m.as_str()).collect()
}

/// Sentences containing at least one word token.
pub fn sentences(text: &str) -> Vec<&str> {
    SENTENCE_END
        .split(text)
        .filter(|s| WORD.is_match(s))
        .collect()
}

pub fn sentence_count(text: &str) -> usize {
    let n = sentences(text).len();
    if n == 0 && !text.trim().is_empty() {
        1
    } else {
        n
    }
}

pub fn paragraph_count(text: &str) -> usize {
    PARAGRAPH_BREAK
        .split(text)
        .filter(|p| !p.trim().is_empty())
        .count()
}

/// Lowercased whitespace-separated words as a set.
pub fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Inserts the count, length, ratio and character-class features.
pub(crate) fn lexical_features(text: &str, out: &mut FeatureVector) {
    let char_count = text.chars().count();
    let words: Vec<&str> = text.split_whitespace().collect();
    let sentence_count = sentence_count(text);

    let avg_word_length = if words.is_empty() {
        0.0
    } else {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64
    };

    let avg_sentence_length = {
        let per_sentence: Vec<usize> = sentences(text)
            .iter()
            .map(|s| s.split_whitespace().count())
            .collect();
        if per_sentence.is_empty() {
            words.len() as f64
        } else {
            per_sentence.iter().sum::<usize>() as f64 / per_sentence.len() as f64
        }
    };

    let unique: HashSet<String> = words
        .iter()
        .filter(|w| w.chars().all(char::is_alphabetic))
        .map(|w| w.to_lowercase())
        .collect();
    let unique_word_ratio = if words.is_empty() {
        0.0
    } else {
        unique.len() as f64 / words.len() as f64
    };

    let punctuation = text.chars().filter(|c| PUNCTUATION.contains(*c)).count();
    let uppercase = text.chars().filter(|c| c.is_uppercase()).count();
    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();

    out.insert("char_count".into(), char_count as f64);
    out.insert("word_count".into(), words.len() as f64);
    out.insert("sentence_count".into(), sentence_count as f64);
    out.insert("paragraph_count".into(), paragraph_count(text) as f64);
    out.insert("avg_word_length".into(), avg_word_length);
    out.insert("avg_sentence_length".into(), avg_sentence_length);
    out.insert("unique_word_ratio".into(), unique_word_ratio);
    out.insert("punctuation_count".into(), punctuation as f64);
    out.insert(
        "uppercase_ratio".into(),
        if char_count == 0 {
            0.0
        } else {
            uppercase as f64 / char_count as f64
        },
    );
    out.insert("digit_count".into(), digits as f64);
}
