//! Rule-based difficulty scoring from performance summaries.
//!
//! Two scorers share the summary input: the five-tier scorer on a 1..=5
//! scale, and the distribution-aware three-tier scorer on a 0..=1 scale.
//! Every threshold ladder is an ordered table read top-down; the first
//! matching row wins.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::performance::PerformanceSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Easy,
    MediumEasy,
    Medium,
    MediumHard,
    Hard,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 5] = [
        DifficultyTier::Easy,
        DifficultyTier::MediumEasy,
        DifficultyTier::Medium,
        DifficultyTier::MediumHard,
        DifficultyTier::Hard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyTier::Easy => "easy",
            DifficultyTier::MediumEasy => "medium_easy",
            DifficultyTier::Medium => "medium",
            DifficultyTier::MediumHard => "medium_hard",
            DifficultyTier::Hard => "hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse label attached to the primary ladder and used by the three-tier scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoarseTier {
    Easy,
    Medium,
    Hard,
}

impl CoarseTier {
    pub const ALL: [CoarseTier; 3] = [CoarseTier::Easy, CoarseTier::Medium, CoarseTier::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoarseTier::Easy => "easy",
            CoarseTier::Medium => "medium",
            CoarseTier::Hard => "hard",
        }
    }
}

/// (lower bound on avg score ratio, coarse tier, base score)
pub const PRIMARY_LADDER: [(f64, CoarseTier, f64); 5] = [
    (0.80, CoarseTier::Easy, 1.0),
    (0.65, CoarseTier::Medium, 2.0),
    (0.50, CoarseTier::Medium, 3.0),
    (0.35, CoarseTier::Hard, 4.0),
    (f64::NEG_INFINITY, CoarseTier::Hard, 5.0),
];

/// (score std strictly above, penalty)
pub const VARIANCE_LADDER: [(f64, f64); 2] = [(0.35, 0.5), (0.25, 0.25)];

/// (avg time in seconds strictly above, penalty)
pub const TIME_LADDER: [(f64, f64); 3] = [(600.0, 0.75), (300.0, 0.5), (180.0, 0.25)];

/// (final score strictly below, tier); anything else is `Hard`.
pub const TIER_CUTS: [(f64, DifficultyTier); 4] = [
    (1.5, DifficultyTier::Easy),
    (2.5, DifficultyTier::MediumEasy),
    (3.5, DifficultyTier::Medium),
    (4.5, DifficultyTier::MediumHard),
];

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 5.0;
pub const FULL_CONFIDENCE_ATTEMPTS: f64 = 50.0;

pub fn primary_tier(avg_score_ratio: f64) -> (CoarseTier, f64) {
    PRIMARY_LADDER
        .iter()
        .find(|(bound, _, _)| avg_score_ratio >= *bound)
        .map(|(_, tier, base)| (*tier, *base))
        .unwrap_or((CoarseTier::Hard, MAX_SCORE))
}

pub fn variance_penalty(score_std: f64) -> f64 {
    VARIANCE_LADDER
        .iter()
        .find(|(bound, _)| score_std > *bound)
        .map(|(_, p)| *p)
        .unwrap_or(0.0)
}

pub fn time_penalty(avg_time: f64) -> f64 {
    TIME_LADDER
        .iter()
        .find(|(bound, _)| avg_time > *bound)
        .map(|(_, p)| *p)
        .unwrap_or(0.0)
}

pub fn tier_for_score(score: f64) -> DifficultyTier {
    TIER_CUTS
        .iter()
        .find(|(cut, _)| score < *cut)
        .map(|(_, tier)| *tier)
        .unwrap_or(DifficultyTier::Hard)
}

/// Linear ramp reaching 1.0 at 50 attempts.
pub fn confidence(total_attempts: usize) -> f64 {
    (total_attempts as f64 / FULL_CONFIDENCE_ATTEMPTS).min(1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyFactors {
    pub score_based: CoarseTier,
    pub base_score: f64,
    pub variance_penalty: f64,
    pub time_penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyAnalysis {
    pub calculated_difficulty: DifficultyTier,
    pub difficulty_score: f64,
    pub confidence: f64,
    pub factors: DifficultyFactors,
    pub insights: Vec<String>,
}

pub fn score_difficulty(summary: &PerformanceSummary) -> DifficultyAnalysis {
    let (coarse, base) = primary_tier(summary.avg_score_ratio);
    let variance = variance_penalty(summary.score_std);
    let time = time_penalty(summary.avg_time);
    let score = (base + variance + time).clamp(MIN_SCORE, MAX_SCORE);

    DifficultyAnalysis {
        calculated_difficulty: tier_for_score(score),
        difficulty_score: score,
        confidence: confidence(summary.total_attempts),
        factors: DifficultyFactors {
            score_based: coarse,
            base_score: base,
            variance_penalty: variance,
            time_penalty: time,
        },
        insights: difficulty_insights(summary),
    }
}

/// Independent rule checks; each rule adds at most one line.
pub fn difficulty_insights(s: &PerformanceSummary) -> Vec<String> {
    let mut insights = Vec::new();

    if s.avg_score_ratio >= 0.9 {
        insights.push("Question appears too easy - consider increasing complexity");
    } else if s.avg_score_ratio <= 0.3 {
        insights.push("Question appears very difficult - may need clarification");
    } else if (0.4..=0.6).contains(&s.avg_score_ratio) {
        insights.push("Good difficulty level - appropriately challenging");
    }

    if s.score_std > 0.3 {
        insights.push("High score variance suggests question may be ambiguous or confusing");
    } else if s.score_std < 0.1 {
        insights.push("Low score variance - students consistently understand or don't understand");
    }

    if s.avg_time > 600.0 {
        insights.push("Long completion time - question may be too complex or unclear");
    } else if s.avg_time < 30.0 {
        insights.push("Very quick completion - question might be too simple");
    }

    if s.time_std > s.avg_time * 0.8 {
        insights.push("High time variance - some students struggle while others don't");
    }

    if s.pass_rate < 0.3 {
        insights.push("Low pass rate - consider providing additional learning resources");
    } else if s.pass_rate > 0.95 {
        insights.push("Very high pass rate - question effectiveness is limited");
    }

    if s.total_attempts < 10 {
        insights.push("Small sample size - difficulty assessment may be unreliable");
    } else if s.total_attempts > 100 {
        insights.push("Large sample size - difficulty assessment is highly reliable");
    }

    insights.into_iter().map(String::from).collect()
}

pub fn difficulty_distribution(analyses: &[DifficultyAnalysis]) -> BTreeMap<DifficultyTier, usize> {
    let mut distribution: BTreeMap<DifficultyTier, usize> =
        DifficultyTier::ALL.iter().map(|t| (*t, 0)).collect();
    for analysis in analyses {
        *distribution.entry(analysis.calculated_difficulty).or_insert(0) += 1;
    }
    distribution
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblematicQuestion {
    pub question_id: i64,
    pub calculated_difficulty: DifficultyTier,
    pub issues: Vec<String>,
}

pub fn identify_problematic_questions(
    analyses: &[(i64, DifficultyAnalysis, PerformanceSummary)],
    confidence_threshold: f64,
) -> Vec<ProblematicQuestion> {
    analyses
        .iter()
        .filter_map(|(question_id, analysis, summary)| {
            let mut issues = Vec::new();
            if analysis.confidence < confidence_threshold {
                issues.push(format!(
                    "Low confidence ({:.2}) - need more data",
                    analysis.confidence
                ));
            }
            if analysis.calculated_difficulty == DifficultyTier::Hard && summary.avg_score_ratio < 0.2 {
                issues.push("Extremely low performance - question may be flawed".to_string());
            }
            if analysis.calculated_difficulty == DifficultyTier::Easy && summary.avg_score_ratio > 0.95 {
                issues.push("Almost perfect scores - question too easy".to_string());
            }
            if summary.score_std > 0.35 {
                issues.push("High score variance - question may be ambiguous".to_string());
            }
            (!issues.is_empty()).then(|| ProblematicQuestion {
                question_id: *question_id,
                calculated_difficulty: analysis.calculated_difficulty,
                issues,
            })
        })
        .collect()
}

// Distribution-aware three-tier scorer.

/// (lower bound on avg score ratio, contribution)
pub const PERFORMANCE_LADDER: [(f64, f64); 4] = [
    (0.8, 0.1),
    (0.6, 0.4),
    (0.4, 0.7),
    (f64::NEG_INFINITY, 1.0),
];
pub const INCONSISTENCY_STD: f64 = 0.4;
pub const INCONSISTENCY_WEIGHT: f64 = 0.2;
pub const STRUGGLE_WEIGHT: f64 = 0.2;
pub const SLOW_TIME_SECONDS: f64 = 300.0;
pub const SLOW_TIME_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionMetrics {
    pub avg_score: f64,
    pub pass_rate: f64,
    pub score_std: f64,
    pub avg_time_minutes: f64,
    pub completion_efficiency: f64,
    pub struggle_rate: f64,
    pub consistency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionAnalysis {
    pub calculated_difficulty: CoarseTier,
    /// Blended score on 0..=1, higher is harder.
    pub difficulty_score: f64,
    pub confidence: f64,
    pub metrics: DistributionMetrics,
    pub recommendations: Vec<String>,
}

pub fn score_distribution(summary: &PerformanceSummary) -> DistributionAnalysis {
    let avg = summary.avg_score_ratio;
    let struggle_rate = summary.struggle_rate();

    let performance = PERFORMANCE_LADDER
        .iter()
        .find(|(bound, _)| avg >= *bound)
        .map(|(_, c)| *c)
        .unwrap_or(1.0);
    let inconsistency = if summary.score_std > INCONSISTENCY_STD {
        INCONSISTENCY_WEIGHT
    } else {
        0.0
    };
    let time = if summary.avg_time > SLOW_TIME_SECONDS {
        SLOW_TIME_WEIGHT
    } else {
        0.0
    };
    let score = (performance + inconsistency + struggle_rate * STRUGGLE_WEIGHT + time).min(1.0);

    let (tier, confidence) = if score <= 0.3 {
        (CoarseTier::Easy, 1.0 - score)
    } else if score <= 0.7 {
        (CoarseTier::Medium, 1.0 - (0.5 - score).abs())
    } else {
        (CoarseTier::Hard, score)
    };

    DistributionAnalysis {
        calculated_difficulty: tier,
        difficulty_score: score,
        confidence,
        metrics: DistributionMetrics {
            avg_score: avg,
            pass_rate: summary.pass_rate,
            score_std: summary.score_std,
            avg_time_minutes: summary.avg_time / 60.0,
            completion_efficiency: summary.high_performer_rate(),
            struggle_rate,
            consistency: 1.0 - summary.score_std.min(1.0),
        },
        recommendations: distribution_recommendations(tier, summary, struggle_rate),
    }
}

fn distribution_recommendations(
    tier: CoarseTier,
    summary: &PerformanceSummary,
    struggle_rate: f64,
) -> Vec<String> {
    let mut out = Vec::new();
    if tier == CoarseTier::Hard && summary.avg_score_ratio < 0.4 {
        out.push("Consider providing additional study materials");
        out.push("Review question clarity and instructions");
    } else if tier == CoarseTier::Easy && summary.avg_score_ratio > 0.9 {
        out.push("Consider increasing question complexity");
        out.push("Add follow-up challenging questions");
    } else if summary.score_std > INCONSISTENCY_STD {
        out.push("Question may be ambiguous - review wording");
        out.push("Provide clearer examples or context");
    }
    if struggle_rate > 0.3 {
        out.push("High struggle rate - consider prerequisite topics review");
    }
    if summary.avg_time > 600.0 {
        out.push("Question may be too time-consuming - consider breaking into parts");
    }
    out.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(avg: f64, std: f64, time: f64, attempts: usize) -> PerformanceSummary {
        PerformanceSummary {
            avg_score_ratio: avg,
            score_std: std,
            avg_time: time,
            total_attempts: attempts,
            pass_rate: avg,
            ..Default::default()
        }
    }

    #[test]
    fn test_easy_question() {
        let a = score_difficulty(&summary(0.85, 0.05, 90.0, 60));
        assert_eq!(a.calculated_difficulty, DifficultyTier::Easy);
        assert_eq!(a.difficulty_score, 1.0);
        assert_eq!(a.confidence, 1.0);
    }

    #[test]
    fn test_variance_and_time_push_medium_to_medium_hard() {
        let a = score_difficulty(&summary(0.55, 0.40, 250.0, 20));
        assert_eq!(a.factors.score_based, CoarseTier::Medium);
        assert_eq!(a.factors.base_score, 3.0);
        assert_eq!(a.factors.variance_penalty, 0.5);
        assert_eq!(a.factors.time_penalty, 0.25);
        assert_eq!(a.calculated_difficulty, DifficultyTier::MediumHard);
    }

    #[test]
    fn test_cut_points_are_half_open() {
        assert_eq!(tier_for_score(1.0), DifficultyTier::Easy);
        assert_eq!(tier_for_score(1.5), DifficultyTier::MediumEasy);
        assert_eq!(tier_for_score(3.5), DifficultyTier::MediumHard);
        assert_eq!(tier_for_score(4.5), DifficultyTier::Hard);
        assert_eq!(tier_for_score(5.0), DifficultyTier::Hard);
    }

    #[test]
    fn test_penalty_ladders_highest_wins() {
        assert_eq!(time_penalty(601.0), 0.75);
        assert_eq!(time_penalty(600.0), 0.5);
        assert_eq!(time_penalty(180.0), 0.0);
        assert_eq!(variance_penalty(0.36), 0.5);
        assert_eq!(variance_penalty(0.30), 0.25);
        assert_eq!(variance_penalty(0.25), 0.0);
    }

    #[test]
    fn test_score_is_clamped() {
        let a = score_difficulty(&summary(0.1, 0.5, 900.0, 5));
        assert_eq!(a.difficulty_score, MAX_SCORE);
        assert_eq!(a.calculated_difficulty, DifficultyTier::Hard);
    }

    #[test]
    fn test_confidence_ramp() {
        assert_eq!(confidence(0), 0.0);
        assert_eq!(confidence(25), 0.5);
        assert_eq!(confidence(50), 1.0);
        assert_eq!(confidence(500), 1.0);
    }

    #[test]
    fn test_insights_follow_rule_order() {
        let s = PerformanceSummary {
            avg_score_ratio: 0.95,
            score_std: 0.05,
            avg_time: 20.0,
            time_std: 2.0,
            pass_rate: 1.0,
            total_attempts: 5,
            ..Default::default()
        };
        let insights = difficulty_insights(&s);
        assert_eq!(insights.len(), 5);
        assert!(insights[0].contains("too easy"));
        assert!(insights[4].contains("Small sample"));
    }

    #[test]
    fn test_distribution_scorer_tiers() {
        let easy = score_distribution(&summary(0.9, 0.05, 60.0, 30));
        assert_eq!(easy.calculated_difficulty, CoarseTier::Easy);
        assert!((easy.confidence - 0.9).abs() < 1e-12);

        let mut hard_summary = summary(0.2, 0.45, 400.0, 10);
        hard_summary.struggling_count = 8;
        let hard = score_distribution(&hard_summary);
        assert_eq!(hard.calculated_difficulty, CoarseTier::Hard);
        assert_eq!(hard.difficulty_score, 1.0);
        assert!(hard
            .recommendations
            .iter()
            .any(|r| r.contains("struggle rate")));
    }

    #[test]
    fn test_distribution_and_problematic_helpers() {
        let a = score_difficulty(&summary(0.1, 0.4, 50.0, 10));
        let b = score_difficulty(&summary(0.85, 0.05, 50.0, 60));
        let dist = difficulty_distribution(&[a.clone(), b.clone()]);
        assert_eq!(dist[&DifficultyTier::Hard], 1);
        assert_eq!(dist[&DifficultyTier::Easy], 1);
        assert_eq!(dist[&DifficultyTier::Medium], 0);

        let problems = identify_problematic_questions(
            &[
                (1, a, summary(0.1, 0.4, 50.0, 10)),
                (2, b, summary(0.85, 0.05, 50.0, 60)),
            ],
            0.7,
        );
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].question_id, 1);
        assert_eq!(problems[0].issues.len(), 3);
    }
}
