//! Per-question performance statistics.
//!
//! Standard deviations use the population convention (divide by `n`).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::records::RawAnswerRecord;

pub const PASS_THRESHOLD: f64 = 0.6;
pub const MISTAKE_THRESHOLD: f64 = 0.5;
pub const STRUGGLE_THRESHOLD: f64 = 0.5;
pub const HIGH_PERFORMER_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub avg_score_ratio: f64,
    pub score_std: f64,
    pub median_score_ratio: f64,
    pub min_score_ratio: f64,
    pub max_score_ratio: f64,
    pub avg_time: f64,
    pub time_std: f64,
    pub median_time: f64,
    pub pass_rate: f64,
    pub total_attempts: usize,
    pub unique_students: usize,
    /// Answers with a usable score (max score > 0).
    pub scored_attempts: usize,
    /// Answers with a recorded time (> 0 s).
    pub timed_attempts: usize,
    pub struggling_count: usize,
    pub high_performer_count: usize,
}

impl PerformanceSummary {
    pub fn is_empty(&self) -> bool {
        self.total_attempts == 0
    }

    pub fn is_sufficient(&self, min_samples: usize) -> bool {
        self.total_attempts >= min_samples
    }

    pub fn struggle_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.struggling_count as f64 / self.total_attempts as f64
        }
    }

    pub fn high_performer_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.high_performer_count as f64 / self.total_attempts as f64
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64).sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn aggregate(answers: &[RawAnswerRecord]) -> PerformanceSummary {
    if answers.is_empty() {
        return PerformanceSummary::default();
    }

    let ratios: Vec<f64> = answers.iter().filter_map(RawAnswerRecord::score_ratio).collect();
    let times: Vec<f64> = answers
        .iter()
        .map(|a| a.time_taken_seconds)
        .filter(|t| t.is_finite() && *t > 0.0)
        .collect();
    let students: HashSet<i64> = answers.iter().map(|a| a.student_id).collect();

    let passed = ratios.iter().filter(|r| **r >= PASS_THRESHOLD).count();
    PerformanceSummary {
        avg_score_ratio: mean(&ratios),
        score_std: population_std(&ratios),
        median_score_ratio: median(&ratios),
        min_score_ratio: ratios.iter().copied().reduce(f64::min).unwrap_or(0.0),
        max_score_ratio: ratios.iter().copied().reduce(f64::max).unwrap_or(0.0),
        avg_time: mean(&times),
        time_std: population_std(&times),
        median_time: median(&times),
        pass_rate: if ratios.is_empty() {
            0.0
        } else {
            passed as f64 / ratios.len() as f64
        },
        total_attempts: answers.len(),
        unique_students: students.len(),
        scored_attempts: ratios.len(),
        timed_attempts: times.len(),
        struggling_count: ratios.iter().filter(|r| **r < STRUGGLE_THRESHOLD).count(),
        high_performer_count: ratios
            .iter()
            .filter(|r| **r >= HIGH_PERFORMER_THRESHOLD)
            .count(),
    }
}

/// Like [`aggregate`], but statistics are zeroed below `min_samples`.
///
/// Counts (`total_attempts`, `unique_students`) are kept so callers can see why.
pub fn aggregate_with_minimum(answers: &[RawAnswerRecord], min_samples: usize) -> PerformanceSummary {
    let summary = aggregate(answers);
    if summary.is_sufficient(min_samples) {
        return summary;
    }
    tracing::debug!(
        attempts = summary.total_attempts,
        min_samples,
        "insufficient answers, performance statistics zeroed"
    );
    PerformanceSummary {
        total_attempts: summary.total_attempts,
        unique_students: summary.unique_students,
        ..Default::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonMistake {
    /// Answer text as first written by a student.
    pub mistake_text: String,
    pub frequency: usize,
    pub avg_score: f64,
    pub student_count: usize,
}

/// Groups incorrect answers by trimmed, lowercased text.
///
/// Groups below `min_frequency` are dropped; the rest are ordered by
/// frequency, then text.
pub fn find_common_mistakes(answers: &[RawAnswerRecord], min_frequency: usize) -> Vec<CommonMistake> {
    struct Group<'a> {
        original: &'a str,
        ratios: Vec<f64>,
        students: HashSet<i64>,
    }

    let mut groups: BTreeMap<String, Group<'_>> = BTreeMap::new();
    for answer in answers {
        let incorrect = answer.score < MISTAKE_THRESHOLD * answer.max_score;
        if !incorrect {
            continue;
        }
        let key = answer.answer_text.trim().to_lowercase();
        let group = groups.entry(key).or_insert_with(|| Group {
            original: answer.answer_text.as_str(),
            ratios: Vec::new(),
            students: HashSet::new(),
        });
        group.ratios.push(answer.score_ratio().unwrap_or(0.0));
        group.students.insert(answer.student_id);
    }

    let mut mistakes: Vec<CommonMistake> = groups
        .into_values()
        .filter(|g| g.ratios.len() >= min_frequency.max(1))
        .map(|g| CommonMistake {
            mistake_text: g.original.to_string(),
            frequency: g.ratios.len(),
            avg_score: mean(&g.ratios),
            student_count: g.students.len(),
        })
        .collect();

    mistakes.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.mistake_text.cmp(&b.mistake_text))
    });
    mistakes
}

/// Share of all attempts covered by the given mistake groups.
pub fn mistake_rate(summary: &PerformanceSummary, mistakes: &[CommonMistake]) -> f64 {
    if summary.total_attempts == 0 {
        return 0.0;
    }
    mistakes.iter().map(|m| m.frequency).sum::<usize>() as f64 / summary.total_attempts as f64
}
