//! Syllable heuristics and the four readability indices.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use super::text::{sentence_count, word_tokens};
use super::FeatureVector;

/// Common short words never counted as difficult.
static FAMILIAR_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "about", "above", "after", "again", "against", "also", "always", "another", "answer",
        "any", "anything", "around", "away", "because", "become", "before", "begin", "being",
        "below", "better", "between", "body", "city", "color", "country", "different", "during",
        "early", "easy", "every", "example", "family", "father", "female", "follow", "many",
        "money", "morning", "mother", "never", "number", "open", "other", "over", "paper",
        "people", "person", "picture", "problem", "question", "ready", "really", "river",
        "second", "seven", "several", "simple", "something", "story", "table", "teacher",
        "today", "together", "under", "until", "very", "water", "whatever", "window", "woman",
        "women", "yellow", "zero", "little", "even", "only", "into", "later", "happy", "pretty",
        "student", "students",
    ]
    .into_iter()
    .collect()
});

/// Vowel-group syllable estimate with silent-`e` handling; at least one per word.
pub fn syllables(word: &str) -> usize {
    let lower: Vec<char> = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();
    if lower.is_empty() {
        return 0;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut prev_vowel = false;
    for &c in &lower {
        let v = is_vowel(c);
        if v && !prev_vowel {
            count += 1;
        }
        prev_vowel = v;
    }

    let n = lower.len();
    if n > 2 && lower[n - 1] == 'e' && !is_vowel(lower[n - 2]) {
        let le_ending = lower[n - 2] == 'l' && n > 3 && !is_vowel(lower[n - 3]);
        if !le_ending && count > 1 {
            count -= 1;
        }
    }

    count.max(1)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReadabilityStats {
    pub words: usize,
    pub sentences: usize,
    pub letters: usize,
    pub syllables: usize,
    pub polysyllables: usize,
    pub difficult_words: usize,
}

impl ReadabilityStats {
    pub fn from_text(text: &str) -> Self {
        let tokens = word_tokens(text);
        let mut stats = Self {
            words: tokens.len(),
            sentences: sentence_count(text),
            ..Default::default()
        };
        let mut difficult: HashSet<String> = HashSet::new();
        for token in &tokens {
            let s = syllables(token);
            stats.syllables += s;
            stats.letters += token.chars().filter(|c| c.is_alphanumeric()).count();
            if s >= 3 {
                stats.polysyllables += 1;
            }
            let lower = token.to_lowercase();
            if s >= 2 && !FAMILIAR_WORDS.contains(lower.as_str()) {
                difficult.insert(lower);
            }
        }
        stats.difficult_words = difficult.len();
        stats
    }

    fn words_per_sentence(&self) -> f64 {
        self.words as f64 / self.sentences.max(1) as f64
    }

    fn per_word(&self, value: usize) -> f64 {
        value as f64 / self.words.max(1) as f64
    }

    pub fn flesch_reading_ease(&self) -> f64 {
        if self.words == 0 {
            return 0.0;
        }
        206.835 - 1.015 * self.words_per_sentence() - 84.6 * self.per_word(self.syllables)
    }

    pub fn flesch_kincaid_grade(&self) -> f64 {
        if self.words == 0 {
            return 0.0;
        }
        0.39 * self.words_per_sentence() + 11.8 * self.per_word(self.syllables) - 15.59
    }

    pub fn gunning_fog(&self) -> f64 {
        if self.words == 0 {
            return 0.0;
        }
        0.4 * (self.words_per_sentence() + 100.0 * self.per_word(self.polysyllables))
    }

    pub fn automated_readability_index(&self) -> f64 {
        if self.words == 0 {
            return 0.0;
        }
        4.71 * self.per_word(self.letters) + 0.5 * self.words_per_sentence() - 21.43
    }
}

pub(crate) fn readability_features(text: &str, out: &mut FeatureVector) {
    let stats = ReadabilityStats::from_text(text);
    out.insert("flesch_reading_ease".into(), stats.flesch_reading_ease());
    out.insert("flesch_kincaid_grade".into(), stats.flesch_kincaid_grade());
    out.insert("gunning_fog".into(), stats.gunning_fog());
    out.insert(
        "automated_readability_index".into(),
        stats.automated_readability_index(),
    );
    out.insert("syllable_count".into(), stats.syllables as f64);
    out.insert("polysyllable_count".into(), stats.polysyllables as f64);
    out.insert("difficult_words".into(), stats.difficult_words as f64);
}
