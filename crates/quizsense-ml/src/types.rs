use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EPSILON: f64 = 1e-10;
pub const MAX_FEATURE_ABS: f64 = 1e6;
pub const DEFAULT_SEED: u64 = 42;

/// Row-major dense matrix, one inner vector per sample.
pub type Matrix = Vec<Vec<f64>>;

#[derive(Debug, Error, PartialEq)]
pub enum MlError {
    #[error("no samples supplied")]
    EmptyInput,
    #[error("dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("target length {targets} does not match sample count {samples}")]
    TargetLength { samples: usize, targets: usize },
    #[error("need at least {required} samples, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },
    #[error("unknown label: {0}")]
    UnknownLabel(String),
    #[error("estimator is not fitted")]
    NotFitted,
}

pub type MlResult<T> = Result<T, MlError>;

/// Hyper-parameters shared by the tree ensembles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn per split; `None` means all features.
    pub max_features: Option<MaxFeatures>,
    pub bootstrap: bool,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    All,
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => ((n_features as f64).sqrt() as usize).max(1),
            MaxFeatures::All => n_features.max(1),
        }
    }
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            bootstrap: true,
            seed: DEFAULT_SEED,
        }
    }
}

impl ForestParams {
    pub fn for_classification() -> Self {
        Self {
            max_features: Some(MaxFeatures::Sqrt),
            ..Default::default()
        }
    }

    pub fn for_regression() -> Self {
        Self {
            max_features: Some(MaxFeatures::All),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansParams {
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            n_clusters: 5,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            seed: DEFAULT_SEED,
        }
    }
}

pub(crate) fn check_width(rows: &[Vec<f64>], expected: usize) -> MlResult<()> {
    for row in rows {
        if row.len() != expected {
            return Err(MlError::DimensionMismatch {
                expected,
                actual: row.len(),
            });
        }
    }
    Ok(())
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
