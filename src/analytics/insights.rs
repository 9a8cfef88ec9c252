//! Human-readable issues and recommendations.

use super::difficulty::DifficultyTier;
use super::performance::{mistake_rate, CommonMistake, PerformanceSummary};
use crate::features::FeatureVector;

pub const LOW_CONFIDENCE: f64 = 0.7;

pub fn identify_comprehension_issues(
    summary: &PerformanceSummary,
    mistakes: &[CommonMistake],
) -> Vec<String> {
    let mut issues = Vec::new();
    if summary.is_empty() {
        return issues;
    }

    if summary.avg_score_ratio < 0.4 {
        issues.push("Low average score indicates fundamental comprehension issues".to_string());
    }
    if summary.pass_rate < 0.3 {
        issues.push("Low pass rate suggests question may be too difficult or unclear".to_string());
    }
    if summary.time_std > summary.avg_time * 0.8 && summary.timed_attempts > 0 {
        issues.push(
            "High time variance suggests some students struggle with question interpretation"
                .to_string(),
        );
    }
    if summary.avg_time > 300.0 {
        issues.push("High average completion time may indicate complexity issues".to_string());
    }

    let rate = mistake_rate(summary, mistakes);
    if rate > 0.3 {
        issues.push(format!(
            "High rate of common mistakes ({:.1}%) suggests specific misconceptions",
            rate * 100.0
        ));
    }
    issues
}

pub fn question_performance_recommendations(
    summary: &PerformanceSummary,
    mistakes: &[CommonMistake],
) -> Vec<String> {
    let mut out = Vec::new();
    if summary.avg_score_ratio < 0.6 {
        out.push("Consider revising question clarity or difficulty level");
    }
    if summary.pass_rate < 0.5 {
        out.push("Provide additional learning resources for this topic");
    }
    if mistakes.len() > 3 {
        out.push("Address common misconceptions in class discussion");
    }
    out.into_iter().map(String::from).collect()
}

pub fn insufficient_data_insight(attempts: usize, min_samples: usize) -> String {
    format!(
        "Insufficient data: {attempts} attempts recorded, at least {min_samples} needed for reliable statistics"
    )
}

/// General observations about a summary, independent of any tiering.
pub fn performance_insights(summary: &PerformanceSummary) -> Vec<String> {
    let mut out = Vec::new();
    let avg = summary.avg_score_ratio;

    if avg < 0.4 {
        out.push("Very low average score - consider reviewing question clarity or difficulty");
    } else if avg < 0.6 {
        out.push("Below average performance - additional support may be needed");
    } else if avg > 0.9 {
        out.push("Excellent performance - question may be too easy");
    }

    if summary.pass_rate < 0.3 {
        out.push("Low pass rate indicates significant comprehension issues");
    } else if summary.pass_rate > 0.95 {
        out.push("Very high pass rate - consider increasing difficulty");
    }

    if summary.score_std < 0.1 {
        out.push("Low score variability - all students performed similarly");
    } else if summary.score_std > 0.3 {
        out.push("High score variability - wide range of student understanding");
    }

    if summary.avg_time > 300.0 {
        out.push("High completion time - question may be complex or unclear");
    } else if summary.avg_time < 30.0 {
        out.push("Very fast completion - question may be too simple");
    }

    out.into_iter().map(String::from).collect()
}

/// Recommendations for a newly analyzed question from its predicted tier and text features.
pub fn question_recommendations(
    tier: Option<DifficultyTier>,
    confidence: f64,
    features: &FeatureVector,
) -> Vec<String> {
    let mut out = Vec::new();
    if confidence < LOW_CONFIDENCE {
        out.push("Low prediction confidence - consider reviewing question structure");
    }

    match tier {
        Some(DifficultyTier::Hard) | Some(DifficultyTier::MediumHard) => {
            out.push("Question predicted as difficult - ensure adequate preparation material is available");
            out.push("Consider providing hints or scaffolding for struggling students");
        }
        Some(DifficultyTier::Easy) => {
            out.push("Question may be too simple - consider adding complexity or depth");
        }
        _ => {}
    }

    let get = |k: &str, default: f64| features.get(k).copied().unwrap_or(default);
    if get("word_count", 0.0) > 100.0 {
        out.push("Long question text - consider simplifying language");
    }
    if get("flesch_reading_ease", 50.0) < 30.0 {
        out.push("Text may be difficult to read - simplify vocabulary and sentence structure");
    }
    if get("question_word_count", 0.0) == 0.0 {
        out.push("No clear question words detected - ensure question is clearly stated");
    }

    out.into_iter().map(String::from).collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerAssessment {
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Issues and recommendations from the predicted score and cluster confidence.
pub fn assess_answer(predicted_score: Option<f64>, cluster_confidence: Option<f64>) -> AnswerAssessment {
    let mut assessment = AnswerAssessment::default();

    if let Some(score) = predicted_score {
        if score < 0.5 {
            assessment
                .issues
                .push("Low predicted score indicates comprehension difficulties".to_string());
            assessment
                .recommendations
                .push("Consider providing additional explanation or examples".to_string());
        }
    }
    if let Some(conf) = cluster_confidence {
        if conf < LOW_CONFIDENCE {
            assessment
                .issues
                .push("Unclear comprehension pattern".to_string());
            assessment
                .recommendations
                .push("Review answer for clarity and completeness".to_string());
        }
    }
    assessment
}

pub fn student_recommendations(predicted_score: f64) -> Vec<String> {
    if predicted_score < 0.5 {
        vec![
            "Student may struggle with this question - provide additional support".to_string(),
            "Consider one-on-one tutoring or additional practice materials".to_string(),
        ]
    } else if predicted_score < 0.7 {
        vec!["Student performance may be below average - monitor progress closely".to_string()]
    } else {
        Vec::new()
    }
}
