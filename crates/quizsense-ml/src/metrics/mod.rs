use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sanitize::safe_ratio;

pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    let n = truth.len().min(predicted.len());
    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|(a, b)| a == b)
        .count();
    safe_ratio(correct as f64, n as f64)
}

pub fn mean_squared_error(truth: &[f64], predicted: &[f64]) -> f64 {
    let n = truth.len().min(predicted.len());
    let sum: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    safe_ratio(sum, n as f64)
}

pub fn root_mean_squared_error(truth: &[f64], predicted: &[f64]) -> f64 {
    mean_squared_error(truth, predicted).sqrt()
}

/// Coefficient of determination. A constant target scores 1.0 on a perfect
/// fit and 0.0 otherwise.
pub fn r2_score(truth: &[f64], predicted: &[f64]) -> f64 {
    let n = truth.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let mean = truth[..n].iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = truth[..n].iter().map(|y| (y - mean) * (y - mean)).sum();
    let ss_res: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1 plus macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: BTreeMap<String, ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

pub fn classification_report(
    truth: &[usize],
    predicted: &[usize],
    class_names: &[String],
) -> ClassificationReport {
    let mut classes = BTreeMap::new();
    let mut per_class = Vec::with_capacity(class_names.len());

    for (idx, name) in class_names.iter().enumerate() {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t == idx, p == idx) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }
        let precision = safe_ratio(tp as f64, (tp + fp) as f64);
        let recall = safe_ratio(tp as f64, (tp + fn_) as f64);
        let metrics = ClassMetrics {
            precision,
            recall,
            f1_score: safe_ratio(2.0 * precision * recall, precision + recall),
            support: tp + fn_,
        };
        per_class.push(metrics.clone());
        classes.insert(name.clone(), metrics);
    }

    let total_support: usize = per_class.iter().map(|m| m.support).sum();
    let k = per_class.len() as f64;
    let avg = |f: fn(&ClassMetrics) -> f64| safe_ratio(per_class.iter().map(f).sum(), k);
    let weighted = |f: fn(&ClassMetrics) -> f64| {
        safe_ratio(
            per_class.iter().map(|m| f(m) * m.support as f64).sum(),
            total_support as f64,
        )
    };

    ClassificationReport {
        accuracy: accuracy(truth, predicted),
        macro_avg: ClassMetrics {
            precision: avg(|m| m.precision),
            recall: avg(|m| m.recall),
            f1_score: avg(|m| m.f1_score),
            support: total_support,
        },
        weighted_avg: ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1_score: weighted(|m| m.f1_score),
            support: total_support,
        },
        classes,
    }
}
