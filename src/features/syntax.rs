//! Part-of-speech and named-entity counts as an optional capability.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::text::sentences;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyntaxCounts {
    pub nouns: usize,
    pub verbs: usize,
    pub adjectives: usize,
    pub adverbs: usize,
    pub entities: usize,
}

/// A syntactic analyzer the extractor may be configured with.
///
/// Returning `None` means the analyzer could not process the text; the
/// extractor then reports zero counts.
pub trait SyntacticAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;
    fn analyze(&self, text: &str) -> Option<SyntaxCounts>;
}

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]+(?:'[A-Za-z]+)?").expect("valid token regex"));

static FUNCTION_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "this", "that", "these", "those", "i", "you", "he", "she", "it", "we",
        "they", "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their",
        "in", "on", "at", "by", "for", "with", "about", "from", "to", "of", "into", "over",
        "under", "between", "through", "during", "and", "or", "but", "if", "because", "so",
        "than", "as", "what", "when", "where", "who", "whom", "whose", "which", "why", "how",
        "not", "no", "yes", "there", "here", "all", "any", "some", "each", "every", "both",
    ]
    .into_iter()
    .collect()
});

static COMMON_VERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "is", "are", "was", "were", "be", "been", "am", "has", "have", "had", "do", "does",
        "did", "can", "could", "will", "would", "should", "may", "might", "must", "shall",
        "make", "made", "take", "took", "give", "gave", "get", "got", "go", "went", "know",
        "knew", "think", "thought", "see", "saw", "find", "found", "explain", "describe",
        "calculate", "compare", "identify", "list", "name", "define", "solve", "show", "write",
        "use", "choose", "select", "discuss", "evaluate", "analyze", "determine", "state",
    ]
    .into_iter()
    .collect()
});

static COMMON_ADVERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "very", "often", "never", "always", "sometimes", "also", "too", "quite", "almost",
        "already", "still", "soon", "then", "now", "again", "rather", "just", "well",
    ]
    .into_iter()
    .collect()
});

const ADJECTIVE_SUFFIXES: &[&str] = &[
    "able", "ible", "al", "ful", "ous", "ive", "less", "ic", "ish", "ary", "ent", "ant",
];
const VERB_SUFFIXES: &[&str] = &["ize", "ise", "ify", "ate", "ing", "ed"];

/// Suffix and word-list tagger for English text.
///
/// Entities are runs of capitalized tokens that do not open a sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTagger;

impl HeuristicTagger {
    fn tag(word: &str) -> Option<Tag> {
        let lower = word.to_lowercase();
        let w = lower.as_str();
        if FUNCTION_WORDS.contains(w) {
            return None;
        }
        if COMMON_VERBS.contains(w) {
            return Some(Tag::Verb);
        }
        if COMMON_ADVERBS.contains(w) || (w.len() > 4 && w.ends_with("ly")) {
            return Some(Tag::Adverb);
        }
        if w.len() > 4 && VERB_SUFFIXES.iter().any(|s| w.ends_with(s)) {
            return Some(Tag::Verb);
        }
        if w.len() > 4 && ADJECTIVE_SUFFIXES.iter().any(|s| w.ends_with(s)) {
            return Some(Tag::Adjective);
        }
        Some(Tag::Noun)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Noun,
    Verb,
    Adjective,
    Adverb,
}

impl SyntacticAnalyzer for HeuristicTagger {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn analyze(&self, text: &str) -> Option<SyntaxCounts> {
        let mut counts = SyntaxCounts::default();
        for sentence in sentences(text) {
            let mut in_entity = false;
            for (i, m) in TOKEN.find_iter(sentence).enumerate() {
                let word = m.as_str();
                match Self::tag(word) {
                    Some(Tag::Noun) => counts.nouns += 1,
                    Some(Tag::Verb) => counts.verbs += 1,
                    Some(Tag::Adjective) => counts.adjectives += 1,
                    Some(Tag::Adverb) => counts.adverbs += 1,
                    None => {}
                }

                let capitalized = word.chars().next().map(char::is_uppercase).unwrap_or(false);
                let candidate = i > 0 && capitalized && Self::tag(word).is_some();
                if candidate && !in_entity {
                    counts.entities += 1;
                }
                in_entity = candidate;
            }
        }
        Some(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_common_parts_of_speech() {
        let counts = HeuristicTagger
            .analyze("Students quickly explain the beautiful theorem.")
            .unwrap();
        assert_eq!(counts.adverbs, 1);
        assert_eq!(counts.verbs, 1);
        assert_eq!(counts.adjectives, 1);
        assert_eq!(counts.nouns, 2);
    }

    #[test]
    fn test_entity_runs_skip_sentence_start() {
        let counts = HeuristicTagger
            .analyze("Where did Albert Einstein work? He moved to Princeton.")
            .unwrap();
        assert_eq!(counts.entities, 2);
    }
}
