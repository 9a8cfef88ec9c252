//! Lexicon-based sentiment scoring.
//!
//! Valences follow the usual -4..=4 scale. A negator within the three
//! preceding tokens flips and dampens a valence, and an intensifier directly
//! before a word scales it. The compound score is normalized as
//! `sum / sqrt(sum^2 + 15)`.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::text::word_tokens;
use super::FeatureVector;

const NORMALIZATION_ALPHA: f64 = 15.0;
const NEGATION_SCALAR: f64 = -0.74;
const BOOSTER_INCREMENT: f64 = 0.293;

static LEXICON: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("good", 1.9), ("great", 3.1), ("excellent", 3.2), ("best", 3.2), ("better", 1.9),
        ("correct", 1.7), ("right", 1.4), ("clear", 1.6), ("easy", 1.9), ("simple", 1.2),
        ("helpful", 1.8), ("happy", 2.7), ("love", 3.2), ("like", 1.5), ("nice", 1.8),
        ("well", 1.1), ("success", 2.7), ("successful", 2.8), ("win", 2.8), ("positive", 2.3),
        ("benefit", 2.0), ("improve", 1.9), ("improved", 2.1), ("interesting", 1.7),
        ("perfect", 2.7), ("strong", 2.3), ("safe", 1.9), ("useful", 1.9), ("accurate", 1.6),
        ("support", 1.7), ("agree", 1.5), ("fun", 2.3), ("enjoy", 2.2), ("true", 1.7),
        ("bad", -2.5), ("poor", -2.1), ("wrong", -2.1), ("incorrect", -1.9), ("difficult", -1.5),
        ("hard", -0.4), ("confusing", -1.3), ("confused", -1.5), ("unclear", -1.2),
        ("fail", -2.5), ("failed", -2.3), ("failure", -2.3), ("error", -1.7), ("mistake", -1.6),
        ("problem", -1.7), ("hate", -2.7), ("sad", -2.1), ("angry", -2.3), ("terrible", -2.1),
        ("awful", -2.0), ("worst", -3.1), ("worse", -2.1), ("negative", -2.7), ("loss", -1.3),
        ("lose", -1.7), ("weak", -1.9), ("danger", -2.4), ("dangerous", -2.1), ("false", -1.4),
        ("boring", -1.3), ("impossible", -1.7), ("death", -2.9), ("kill", -3.7), ("war", -2.9),
        ("pain", -2.3), ("disease", -2.0), ("stress", -1.8), ("risk", -1.1), ("crisis", -3.1),
    ]
    .into_iter()
    .collect()
});

static NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "cannot", "without",
];

static BOOSTERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("very", BOOSTER_INCREMENT),
        ("really", BOOSTER_INCREMENT),
        ("extremely", BOOSTER_INCREMENT),
        ("highly", BOOSTER_INCREMENT),
        ("so", BOOSTER_INCREMENT),
        ("incredibly", BOOSTER_INCREMENT),
        ("slightly", -BOOSTER_INCREMENT),
        ("somewhat", -BOOSTER_INCREMENT),
        ("barely", -BOOSTER_INCREMENT),
        ("hardly", -BOOSTER_INCREMENT),
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SentimentScores {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub compound: f64,
}

fn is_negation(token: &str) -> bool {
    NEGATIONS.contains(&token) || token.ends_with("n't")
}

pub fn polarity_scores(text: &str) -> SentimentScores {
    let tokens: Vec<String> = word_tokens(text).iter().map(|t| t.to_lowercase()).collect();
    if tokens.is_empty() {
        return SentimentScores::default();
    }

    let mut valences = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        if BOOSTERS.contains_key(token.as_str()) {
            valences.push(0.0);
            continue;
        }
        let Some(&base) = LEXICON.get(token.as_str()) else {
            valences.push(0.0);
            continue;
        };

        let mut valence = base;
        if i > 0 {
            if let Some(&boost) = BOOSTERS.get(tokens[i - 1].as_str()) {
                valence += if valence > 0.0 { boost } else { -boost };
            }
        }
        let window = i.saturating_sub(3)..i;
        if tokens[window].iter().any(|t| is_negation(t)) {
            valence *= NEGATION_SCALAR;
        }
        valences.push(valence);
    }

    let sum: f64 = valences.iter().sum();
    let compound = if sum == 0.0 {
        0.0
    } else {
        (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
    };

    let mut pos_sum = 0.0;
    let mut neg_sum = 0.0;
    let mut neutral_count = 0.0;
    for v in &valences {
        if *v > 0.0 {
            pos_sum += v + 1.0;
        } else if *v < 0.0 {
            neg_sum += v - 1.0;
        } else {
            neutral_count += 1.0;
        }
    }
    let total = pos_sum + neg_sum.abs() + neutral_count;
    if total == 0.0 {
        return SentimentScores::default();
    }

    SentimentScores {
        positive: pos_sum / total,
        negative: neg_sum.abs() / total,
        neutral: neutral_count / total,
        compound,
    }
}

pub(crate) fn sentiment_features(text: &str, out: &mut FeatureVector) {
    let scores = polarity_scores(text);
    out.insert("sentiment_positive".into(), scores.positive);
    out.insert("sentiment_negative".into(), scores.negative);
    out.insert("sentiment_neutral".into(), scores.neutral);
    out.insert("sentiment_compound".into(), scores.compound);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_and_negative_text() {
        let good = polarity_scores("This is a great and helpful explanation");
        let bad = polarity_scores("This is a terrible and confusing explanation");
        assert!(good.compound > 0.5);
        assert!(bad.compound < -0.3);
        assert!(good.positive > good.negative);
        assert!(bad.negative > bad.positive);
    }

    #[test]
    fn test_negation_flips_polarity() {
        assert!(polarity_scores("the answer is not good").compound < 0.0);
        assert!(polarity_scores("the answer isn't wrong").compound > 0.0);
    }

    #[test]
    fn test_neutral_text_and_shares_sum_to_one() {
        let s = polarity_scores("The mitochondria is an organelle");
        assert_eq!(s.compound, 0.0);
        assert_eq!(s.neutral, 1.0);
        let mixed = polarity_scores("good but wrong answer");
        assert!((mixed.positive + mixed.negative + mixed.neutral - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_booster_strengthens() {
        let plain = polarity_scores("good");
        let boosted = polarity_scores("very good");
        assert!(boosted.compound > plain.compound);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(polarity_scores(""), SentimentScores::default());
    }
}
