//! Fitting routines for the three slots.
//!
//! Every routine sanitizes the feature rows, fits the scaler on the rows the
//! estimator is fitted on, and returns the pieces of an artifact together
//! with an evaluation report.

use std::collections::BTreeMap;

use quizsense_ml::sanitize::sanitize_matrix;
use quizsense_ml::{
    classification_report, mean_squared_error, r2_score, root_mean_squared_error, take_rows,
    train_test_split, ClassificationReport, ForestParams, KMeans, KMeansParams, LabelEncoder,
    MaxFeatures, MlError, RandomForestClassifier, RandomForestRegressor, StandardScaler,
};
use serde::{Deserialize, Serialize};

use super::artifact::Estimator;
use super::registry::RegistryError;
use crate::analytics::performance::{mean, population_std};
use crate::features::FeatureMatrix;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    pub test_fraction: f64,
    pub n_clusters: usize,
    pub kmeans_restarts: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
            test_fraction: 0.2,
            n_clusters: 5,
            kmeans_restarts: 10,
        }
    }
}

impl TrainingParams {
    fn forest(&self, max_features: MaxFeatures) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: Some(max_features),
            bootstrap: true,
            seed: self.seed,
        }
    }

    fn kmeans(&self, n_clusters: usize) -> KMeansParams {
        KMeansParams {
            n_clusters,
            n_init: self.kmeans_restarts.max(1),
            seed: self.seed,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub size: usize,
    /// Mean score ratio of the members; 0 when the target column is absent.
    pub avg_score: f64,
    pub score_std: f64,
    pub characteristics: BTreeMap<String, ColumnStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum TrainingReport {
    Classification {
        n_samples: usize,
        n_train: usize,
        n_test: usize,
        train_accuracy: f64,
        /// `None` when the hold-out set is empty.
        test_accuracy: Option<f64>,
        classes: Vec<String>,
        classification_report: Option<ClassificationReport>,
        feature_importance: Vec<FeatureImportance>,
    },
    Regression {
        n_samples: usize,
        n_train: usize,
        n_test: usize,
        train_r2: f64,
        test_r2: Option<f64>,
        mse: Option<f64>,
        rmse: Option<f64>,
        feature_importance: Vec<FeatureImportance>,
    },
    Clustering {
        n_samples: usize,
        n_clusters: usize,
        inertia: f64,
        clusters: Vec<ClusterSummary>,
    },
}

impl TrainingReport {
    /// Headline number for logs: test accuracy, test R² or inertia.
    pub fn headline(&self) -> f64 {
        match self {
            TrainingReport::Classification {
                test_accuracy,
                train_accuracy,
                ..
            } => test_accuracy.unwrap_or(*train_accuracy),
            TrainingReport::Regression { test_r2, train_r2, .. } => test_r2.unwrap_or(*train_r2),
            TrainingReport::Clustering { inertia, .. } => *inertia,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Fitted {
    pub estimator: Estimator,
    pub scaler: StandardScaler,
    pub label_encoder: Option<LabelEncoder>,
    pub columns: Vec<String>,
    pub report: TrainingReport,
}

fn ranked_importances(columns: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = columns
        .iter()
        .zip(importances)
        .map(|(feature, importance)| FeatureImportance {
            feature: feature.clone(),
            importance: *importance,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    ranked
}

fn feature_rows(matrix: &FeatureMatrix, target: &str) -> (Vec<String>, Vec<Vec<f64>>) {
    let features = matrix.without_columns(&[target]);
    let mut rows = features.rows;
    sanitize_matrix(&mut rows);
    (features.columns, rows)
}

fn require_rows(matrix: &FeatureMatrix, required: usize) -> Result<(), RegistryError> {
    if matrix.n_rows() < required {
        return Err(MlError::InsufficientSamples {
            required,
            actual: matrix.n_rows(),
        }
        .into());
    }
    Ok(())
}

/// Random forest classifier over a string label column, stratified hold-out.
pub(crate) fn fit_classifier(
    matrix: &FeatureMatrix,
    target: &str,
    params: &TrainingParams,
) -> Result<Fitted, RegistryError> {
    let labels = matrix
        .label_column(target)
        .ok_or_else(|| RegistryError::MissingTarget(target.to_string()))?;
    require_rows(matrix, 2)?;

    let encoder = LabelEncoder::fit(labels)?;
    let encoded = encoder.encode_all(labels)?;
    let (columns, rows) = feature_rows(matrix, target);

    let split = train_test_split(rows.len(), params.test_fraction, params.seed, Some(&encoded));
    let train_x = take_rows(&rows, &split.train);
    let train_y = take_rows(&encoded, &split.train);
    let scaler = StandardScaler::fit(&train_x)?;
    let train_x = scaler.transform(&train_x)?;

    let model = RandomForestClassifier::fit(
        &train_x,
        &train_y,
        encoder.n_classes(),
        params.forest(MaxFeatures::Sqrt),
    )?;
    let train_accuracy = model.score(&train_x, &train_y)?;

    let (test_accuracy, report) = if split.test.is_empty() {
        (None, None)
    } else {
        let test_x = scaler.transform(&take_rows(&rows, &split.test))?;
        let test_y = take_rows(&encoded, &split.test);
        let predicted = model.predict(&test_x)?;
        let report = classification_report(&test_y, &predicted, &encoder.classes);
        (Some(report.accuracy), Some(report))
    };

    tracing::info!(
        samples = rows.len(),
        classes = encoder.n_classes(),
        train_accuracy,
        test_accuracy = test_accuracy.unwrap_or(f64::NAN),
        "difficulty classifier fitted"
    );

    let report = TrainingReport::Classification {
        n_samples: rows.len(),
        n_train: split.train.len(),
        n_test: split.test.len(),
        train_accuracy,
        test_accuracy,
        classes: encoder.classes.clone(),
        classification_report: report,
        feature_importance: ranked_importances(&columns, &model.feature_importances),
    };
    Ok(Fitted {
        estimator: Estimator::Classifier(model),
        scaler,
        label_encoder: Some(encoder),
        columns,
        report,
    })
}

/// Random forest regressor over a numeric target column, plain hold-out.
pub(crate) fn fit_regressor(
    matrix: &FeatureMatrix,
    target: &str,
    params: &TrainingParams,
) -> Result<Fitted, RegistryError> {
    let y = matrix
        .numeric_column(target)
        .ok_or_else(|| RegistryError::MissingTarget(target.to_string()))?;
    require_rows(matrix, 2)?;
    let (columns, rows) = feature_rows(matrix, target);

    let split = train_test_split(rows.len(), params.test_fraction, params.seed, None);
    let train_x = take_rows(&rows, &split.train);
    let train_y = take_rows(&y, &split.train);
    let scaler = StandardScaler::fit(&train_x)?;
    let train_x = scaler.transform(&train_x)?;

    let model = RandomForestRegressor::fit(&train_x, &train_y, params.forest(MaxFeatures::All))?;
    let train_r2 = model.score(&train_x, &train_y)?;

    let (test_r2, mse, rmse) = if split.test.is_empty() {
        (None, None, None)
    } else {
        let test_x = scaler.transform(&take_rows(&rows, &split.test))?;
        let test_y = take_rows(&y, &split.test);
        let predicted = model.predict(&test_x)?;
        (
            Some(r2_score(&test_y, &predicted)),
            Some(mean_squared_error(&test_y, &predicted)),
            Some(root_mean_squared_error(&test_y, &predicted)),
        )
    };

    tracing::info!(
        samples = rows.len(),
        train_r2,
        test_r2 = test_r2.unwrap_or(f64::NAN),
        rmse = rmse.unwrap_or(f64::NAN),
        "score regressor fitted"
    );

    let report = TrainingReport::Regression {
        n_samples: rows.len(),
        n_train: split.train.len(),
        n_test: split.test.len(),
        train_r2,
        test_r2,
        mse,
        rmse,
        feature_importance: ranked_importances(&columns, &model.feature_importances),
    };
    Ok(Fitted {
        estimator: Estimator::Regressor(model),
        scaler,
        label_encoder: None,
        columns,
        report,
    })
}

/// K-means over every row; `score_column` is left out of the features and
/// only feeds the per-cluster score statistics. `k` shrinks to the row count.
pub(crate) fn fit_clusterer(
    matrix: &FeatureMatrix,
    score_column: &str,
    params: &TrainingParams,
) -> Result<Fitted, RegistryError> {
    require_rows(matrix, 1)?;
    let scores = matrix.numeric_column(score_column);
    let (columns, rows) = feature_rows(matrix, score_column);

    let k = params.n_clusters.clamp(1, rows.len());
    if k < params.n_clusters {
        tracing::warn!(
            requested = params.n_clusters,
            used = k,
            "fewer rows than clusters, reducing cluster count"
        );
    }

    let scaler = StandardScaler::fit(&rows)?;
    let scaled = scaler.transform(&rows)?;
    let (model, assignments) = KMeans::fit(&scaled, params.kmeans(k))?;

    let clusters = (0..k)
        .map(|cluster| {
            let members: Vec<usize> = assignments
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == cluster)
                .map(|(i, _)| i)
                .collect();
            let member_scores: Vec<f64> = scores
                .as_ref()
                .map(|s| members.iter().map(|&i| s[i]).collect())
                .unwrap_or_default();
            let characteristics = columns
                .iter()
                .enumerate()
                .map(|(j, name)| {
                    let values: Vec<f64> = members.iter().map(|&i| rows[i][j]).collect();
                    (
                        name.clone(),
                        ColumnStats {
                            mean: mean(&values),
                            std: population_std(&values),
                        },
                    )
                })
                .collect();
            ClusterSummary {
                cluster,
                size: members.len(),
                avg_score: mean(&member_scores),
                score_std: population_std(&member_scores),
                characteristics,
            }
        })
        .collect();

    tracing::info!(
        samples = rows.len(),
        clusters = k,
        inertia = model.inertia,
        "comprehension clusterer fitted"
    );

    let report = TrainingReport::Clustering {
        n_samples: rows.len(),
        n_clusters: k,
        inertia: model.inertia,
        clusters,
    };
    Ok(Fitted {
        estimator: Estimator::Clusterer(model),
        scaler,
        label_encoder: None,
        columns,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;

    fn params() -> TrainingParams {
        TrainingParams {
            n_estimators: 10,
            n_clusters: 2,
            kmeans_restarts: 2,
            ..Default::default()
        }
    }

    fn matrix(n: usize) -> FeatureMatrix {
        let vectors: Vec<FeatureVector> = (0..n)
            .map(|i| {
                let x = i as f64;
                [("x", x), ("noise", (i % 3) as f64), ("score_ratio", x / n as f64)]
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect()
            })
            .collect();
        let labels = (0..n)
            .map(|i| if i < n / 2 { "easy" } else { "hard" }.to_string())
            .collect();
        FeatureMatrix::build(&vectors).with_labels("tier", labels)
    }

    #[test]
    fn test_classifier_separates_threshold() {
        let fitted = fit_classifier(&matrix(40), "tier", &params()).unwrap();
        match fitted.report {
            TrainingReport::Classification {
                n_test,
                test_accuracy,
                ref classes,
                ..
            } => {
                assert_eq!(n_test, 8);
                assert!(test_accuracy.unwrap() >= 0.75);
                assert_eq!(classes, &vec!["easy".to_string(), "hard".to_string()]);
            }
            other => panic!("unexpected report {other:?}"),
        }
        assert_eq!(fitted.columns, vec!["noise", "score_ratio", "x"]);
    }

    #[test]
    fn test_regressor_drops_target_from_features() {
        let fitted = fit_regressor(&matrix(30), "score_ratio", &params()).unwrap();
        assert_eq!(fitted.columns, vec!["noise", "x"]);
        assert!(fitted.report.headline() > 0.5);
    }

    #[test]
    fn test_missing_target() {
        let err = fit_regressor(&matrix(10), "absent", &params()).unwrap_err();
        assert!(matches!(err, RegistryError::MissingTarget(ref c) if c == "absent"));
    }

    #[test]
    fn test_clusterer_shrinks_k() {
        let p = TrainingParams {
            n_clusters: 5,
            ..params()
        };
        let fitted = fit_clusterer(&matrix(3), "score_ratio", &p).unwrap();
        match fitted.report {
            TrainingReport::Clustering {
                n_clusters,
                ref clusters,
                ..
            } => {
                assert_eq!(n_clusters, 3);
                assert_eq!(clusters.iter().map(|c| c.size).sum::<usize>(), 3);
            }
            other => panic!("unexpected report {other:?}"),
        }
    }
}
