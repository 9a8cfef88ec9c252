//! Bagged CART ensembles.
//!
//! Trees are grown in parallel with Rayon. Tree `i` draws from its own
//! `ChaCha8Rng` seeded with `seed + i`, so a fit is reproducible for a given
//! seed regardless of thread scheduling.

mod tree;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub use tree::{DecisionTree, TreeNode};
use tree::{TreeParams, TreeTarget};

use crate::metrics::{accuracy, r2_score};
use crate::types::{check_width, ForestParams, MlError, MlResult};

fn tree_params(params: &ForestParams, n_features: usize) -> TreeParams {
    TreeParams {
        max_depth: params.max_depth,
        min_samples_split: params.min_samples_split,
        min_samples_leaf: params.min_samples_leaf,
        max_features: params
            .max_features
            .map(|m| m.resolve(n_features))
            .unwrap_or(n_features),
    }
}

fn draw_samples(rng: &mut ChaCha8Rng, n: usize, bootstrap: bool) -> Vec<usize> {
    if bootstrap {
        (0..n).map(|_| rng.gen_range(0..n)).collect()
    } else {
        (0..n).collect()
    }
}

fn validate(x: &[Vec<f64>], n_targets: usize) -> MlResult<usize> {
    let first = x.first().ok_or(MlError::EmptyInput)?;
    let d = first.len();
    check_width(x, d)?;
    if x.len() != n_targets {
        return Err(MlError::TargetLength {
            samples: x.len(),
            targets: n_targets,
        });
    }
    Ok(d)
}

fn mean_importances(trees: &[DecisionTree], n_features: usize) -> Vec<f64> {
    let mut out = vec![0.0; n_features];
    if trees.is_empty() {
        return out;
    }
    for tree in trees {
        for (o, v) in out.iter_mut().zip(&tree.importances) {
            *o += v;
        }
    }
    let n = trees.len() as f64;
    out.iter_mut().for_each(|v| *v /= n);
    out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    pub params: ForestParams,
    pub n_classes: usize,
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
    pub feature_importances: Vec<f64>,
}

impl RandomForestClassifier {
    /// Fits on encoded labels in `0..n_classes`.
    pub fn fit(
        x: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        params: ForestParams,
    ) -> MlResult<Self> {
        let n_features = validate(x, labels.len())?;
        if let Some(&bad) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(MlError::UnknownLabel(bad.to_string()));
        }

        let tp = tree_params(&params, n_features);
        let n = x.len();
        let trees: Vec<DecisionTree> = (0..params.n_estimators.max(1))
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let samples = draw_samples(&mut rng, n, params.bootstrap);
                DecisionTree::fit(
                    x,
                    TreeTarget::Classes { labels, n_classes },
                    samples,
                    tp,
                    &mut rng,
                )
            })
            .collect();

        let feature_importances = mean_importances(&trees, n_features);
        Ok(Self {
            params,
            n_classes,
            n_features,
            trees,
            feature_importances,
        })
    }

    /// Mean of per-tree leaf distributions, one row per sample.
    pub fn predict_proba(&self, x: &[Vec<f64>]) -> MlResult<Vec<Vec<f64>>> {
        if self.trees.is_empty() {
            return Err(MlError::NotFitted);
        }
        check_width(x, self.n_features)?;
        let n_trees = self.trees.len() as f64;
        Ok(x.iter()
            .map(|row| {
                let mut acc = vec![0.0; self.n_classes];
                for tree in &self.trees {
                    for (a, p) in acc.iter_mut().zip(tree.leaf_value(row)) {
                        *a += p;
                    }
                }
                acc.iter_mut().for_each(|a| *a /= n_trees);
                acc
            })
            .collect())
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> MlResult<Vec<usize>> {
        Ok(self.predict_proba(x)?.iter().map(|p| argmax(p)).collect())
    }

    /// Mean accuracy on the given samples.
    pub fn score(&self, x: &[Vec<f64>], labels: &[usize]) -> MlResult<f64> {
        let predicted = self.predict(x)?;
        Ok(accuracy(labels, &predicted))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub params: ForestParams,
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
    pub feature_importances: Vec<f64>,
}

impl RandomForestRegressor {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: ForestParams) -> MlResult<Self> {
        let n_features = validate(x, y.len())?;
        let tp = tree_params(&params, n_features);
        let n = x.len();
        let trees: Vec<DecisionTree> = (0..params.n_estimators.max(1))
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let samples = draw_samples(&mut rng, n, params.bootstrap);
                DecisionTree::fit(x, TreeTarget::Values(y), samples, tp, &mut rng)
            })
            .collect();

        let feature_importances = mean_importances(&trees, n_features);
        Ok(Self {
            params,
            n_features,
            trees,
            feature_importances,
        })
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> MlResult<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(MlError::NotFitted);
        }
        check_width(x, self.n_features)?;
        let n_trees = self.trees.len() as f64;
        Ok(x.iter()
            .map(|row| {
                self.trees
                    .iter()
                    .map(|t| t.leaf_value(row).first().copied().unwrap_or(0.0))
                    .sum::<f64>()
                    / n_trees
            })
            .collect())
    }

    /// Coefficient of determination on the given samples.
    pub fn score(&self, x: &[Vec<f64>], y: &[f64]) -> MlResult<f64> {
        let predicted = self.predict(x)?;
        Ok(r2_score(y, &predicted))
    }
}

/// Index of the largest value; ties resolve to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> ForestParams {
        ForestParams {
            n_estimators: 15,
            min_samples_split: 2,
            min_samples_leaf: 1,
            ..ForestParams::for_classification()
        }
    }

    fn blobs() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let jitter = (i % 5) as f64 * 0.1;
            x.push(vec![jitter, 1.0 + jitter]);
            y.push(0);
            x.push(vec![5.0 + jitter, 6.0 + jitter]);
            y.push(1);
        }
        (x, y)
    }

    #[test]
    fn test_classifier_fits_separable_data() {
        let (x, y) = blobs();
        let model = RandomForestClassifier::fit(&x, &y, 2, small_params()).unwrap();
        assert_eq!(model.trees.len(), 15);
        assert!((model.score(&x, &y).unwrap() - 1.0).abs() < 1e-12);
        let proba = model.predict_proba(&[vec![5.2, 6.2]]).unwrap();
        assert!(proba[0][1] > 0.9);
        assert!((proba[0].iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_classifier_is_deterministic() {
        let (x, y) = blobs();
        let a = RandomForestClassifier::fit(&x, &y, 2, small_params()).unwrap();
        let b = RandomForestClassifier::fit(&x, &y, 2, small_params()).unwrap();
        assert_eq!(a.feature_importances, b.feature_importances);
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (x, y) = blobs();
        let model = RandomForestClassifier::fit(&x, &y, 2, small_params()).unwrap();
        let total: f64 = model.feature_importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_classifier_rejects_mismatched_targets() {
        let (x, _) = blobs();
        let err = RandomForestClassifier::fit(&x, &[0, 1], 2, small_params()).unwrap_err();
        assert!(matches!(err, MlError::TargetLength { .. }));
    }

    #[test]
    fn test_regressor_tracks_linear_trend() {
        let x: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64 / 50.0]).collect();
        let y: Vec<f64> = x.iter().map(|r| r[0]).collect();
        let params = ForestParams {
            n_estimators: 20,
            ..ForestParams::for_regression()
        };
        let model = RandomForestRegressor::fit(&x, &y, params).unwrap();
        assert!(model.score(&x, &y).unwrap() > 0.9);
    }

    #[test]
    fn test_predict_checks_width() {
        let (x, y) = blobs();
        let model = RandomForestClassifier::fit(&x, &y, 2, small_params()).unwrap();
        assert!(matches!(
            model.predict(&[vec![1.0]]),
            Err(MlError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_argmax_ties_pick_first() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
    }
}
