#![deny(clippy::all)]

//! Estimators backing the question analytics service.
//!
//! Everything here is deterministic for a fixed seed and serializable with
//! serde, so fitted models can be persisted as JSON artifacts.

pub mod forest;
pub mod kmeans;
pub mod metrics;
pub mod sanitize;
pub mod scaler;
pub mod split;
pub mod types;

pub use forest::{argmax, RandomForestClassifier, RandomForestRegressor};
pub use kmeans::KMeans;
pub use metrics::{
    accuracy, classification_report, mean_squared_error, r2_score, root_mean_squared_error,
    ClassMetrics, ClassificationReport,
};
pub use scaler::{LabelEncoder, StandardScaler};
pub use split::{take_rows, train_test_split, TrainTestSplit};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitted_forest_survives_json() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();
        let params = ForestParams {
            n_estimators: 5,
            ..ForestParams::for_classification()
        };
        let model = RandomForestClassifier::fit(&x, &y, 2, params).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: RandomForestClassifier = serde_json::from_str(&json).unwrap();
        assert_eq!(
            model.predict_proba(&x).unwrap(),
            restored.predict_proba(&x).unwrap()
        );
    }
}
