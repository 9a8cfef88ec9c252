//! Row assembly over a stable column schema.
//!
//! Two record shapes exist. Question-only rows carry the question's text
//! features under their own names. Question+answer rows carry the question
//! features prefixed `q_`, the answer features prefixed `a_`, `time_taken`,
//! and `score_ratio` on training rows only.
//!
//! A question's aggregated answer statistics form a third group prefixed
//! `performance_`. No model is trained on it: prediction requests carry no
//! answer history, so the group would never pass the schema check.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::FeatureVector;
use crate::analytics::PerformanceSummary;

pub const QUESTION_PREFIX: &str = "q_";
pub const ANSWER_PREFIX: &str = "a_";
pub const PERFORMANCE_PREFIX: &str = "performance_";
pub const TIME_TAKEN: &str = "time_taken";
pub const SCORE_RATIO: &str = "score_ratio";

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("feature schema mismatch: missing {missing:?}, unexpected {unexpected:?}")]
pub struct SchemaMismatch {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

/// Dense numeric rows plus optional string label columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: BTreeMap<String, Vec<String>>,
}

impl FeatureMatrix {
    /// One row per vector over the sorted union of keys; absent values are 0.0.
    pub fn build(vectors: &[FeatureVector]) -> Self {
        let columns: Vec<String> = vectors
            .iter()
            .flat_map(|v| v.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let rows = vectors
            .iter()
            .map(|v| {
                columns
                    .iter()
                    .map(|c| v.get(c).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();

        Self {
            columns,
            rows,
            labels: BTreeMap::new(),
        }
    }

    pub fn with_labels(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.labels.insert(name.into(), values);
        self
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn numeric_column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    pub fn label_column(&self, name: &str) -> Option<&[String]> {
        self.labels.get(name).map(Vec::as_slice)
    }

    /// Copy without the named numeric columns.
    pub fn without_columns(&self, drop: &[&str]) -> Self {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !drop.contains(&c.as_str()))
            .map(|(i, _)| i)
            .collect();
        Self {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| keep.iter().map(|&i| r[i]).collect())
                .collect(),
            labels: self.labels.clone(),
        }
    }

    /// Rows reordered to `expected`, requiring the same column set.
    ///
    /// Columns named in `ignore` are dropped from this matrix before comparing.
    pub fn align_to(&self, expected: &[String], ignore: &[&str]) -> Result<Vec<Vec<f64>>, SchemaMismatch> {
        let have: BTreeSet<&str> = self
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| !ignore.contains(c))
            .collect();
        let want: BTreeSet<&str> = expected.iter().map(String::as_str).collect();

        if have != want {
            return Err(SchemaMismatch {
                missing: want.difference(&have).map(|s| s.to_string()).collect(),
                unexpected: have.difference(&want).map(|s| s.to_string()).collect(),
            });
        }

        let positions: Vec<usize> = expected
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();
        Ok(self
            .rows
            .iter()
            .map(|r| positions.iter().map(|&i| r[i]).collect())
            .collect())
    }
}

/// Question+answer record with prefixed feature groups.
pub fn answer_record(
    question_features: &FeatureVector,
    answer_features: &FeatureVector,
    time_taken: f64,
    score_ratio: Option<f64>,
) -> FeatureVector {
    let mut row: FeatureVector = question_features
        .iter()
        .map(|(k, v)| (format!("{QUESTION_PREFIX}{k}"), *v))
        .chain(
            answer_features
                .iter()
                .map(|(k, v)| (format!("{ANSWER_PREFIX}{k}"), *v)),
        )
        .collect();
    row.insert(TIME_TAKEN.into(), time_taken.max(0.0));
    if let Some(ratio) = score_ratio {
        row.insert(SCORE_RATIO.into(), ratio);
    }
    row
}

/// Answer statistics of one question as `performance_` columns.
pub fn performance_record(summary: &PerformanceSummary) -> FeatureVector {
    [
        ("avg_score", summary.avg_score_ratio),
        ("score_std", summary.score_std),
        ("avg_time", summary.avg_time),
        ("time_std", summary.time_std),
        ("total_attempts", summary.total_attempts as f64),
        ("unique_students", summary.unique_students as f64),
    ]
    .into_iter()
    .map(|(k, v)| (format!("{PERFORMANCE_PREFIX}{k}"), v))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, f64)]) -> FeatureVector {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_build_unions_and_zero_fills() {
        let m = FeatureMatrix::build(&[vector(&[("a", 1.0)]), vector(&[("b", 2.0)])]);
        assert_eq!(m.columns, vec!["a", "b"]);
        assert_eq!(m.rows, vec![vec![1.0, 0.0], vec![0.0, 2.0]]);
    }

    #[test]
    fn test_align_reorders_to_expected() {
        let m = FeatureMatrix::build(&[vector(&[("a", 1.0), ("b", 2.0)])]);
        let rows = m
            .align_to(&["b".to_string(), "a".to_string()], &[])
            .unwrap();
        assert_eq!(rows, vec![vec![2.0, 1.0]]);
    }

    #[test]
    fn test_align_reports_missing_and_unexpected() {
        let m = FeatureMatrix::build(&[vector(&[("a", 1.0), ("c", 3.0)])]);
        let err = m
            .align_to(&["a".to_string(), "b".to_string()], &[])
            .unwrap_err();
        assert_eq!(err.missing, vec!["b"]);
        assert_eq!(err.unexpected, vec!["c"]);
    }

    #[test]
    fn test_align_ignores_target_column() {
        let m = FeatureMatrix::build(&[vector(&[("a", 1.0), (SCORE_RATIO, 0.5)])]);
        assert!(m.align_to(&["a".to_string()], &[SCORE_RATIO]).is_ok());
    }

    #[test]
    fn test_answer_record_prefixes() {
        let q = vector(&[("word_count", 5.0)]);
        let a = vector(&[("word_count", 3.0)]);
        let row = answer_record(&q, &a, 42.0, Some(0.75));
        assert_eq!(row["q_word_count"], 5.0);
        assert_eq!(row["a_word_count"], 3.0);
        assert_eq!(row[TIME_TAKEN], 42.0);
        assert_eq!(row[SCORE_RATIO], 0.75);
        assert!(!answer_record(&q, &a, 1.0, None).contains_key(SCORE_RATIO));
    }

    #[test]
    fn test_performance_record_columns() {
        let summary = PerformanceSummary {
            avg_score_ratio: 0.8,
            score_std: 0.1,
            avg_time: 40.0,
            time_std: 5.0,
            total_attempts: 12,
            unique_students: 9,
            ..Default::default()
        };
        let row = performance_record(&summary);
        assert_eq!(row.len(), 6);
        assert_eq!(row["performance_avg_score"], 0.8);
        assert_eq!(row["performance_time_std"], 5.0);
        assert_eq!(row["performance_total_attempts"], 12.0);
        assert_eq!(row["performance_unique_students"], 9.0);

        let m = FeatureMatrix::build(&[row]);
        assert!(m.columns.iter().all(|c| c.starts_with(PERFORMANCE_PREFIX)));
    }
}
