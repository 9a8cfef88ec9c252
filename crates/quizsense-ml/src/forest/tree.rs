use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::EPSILON;

/// Node of a fitted CART tree, stored in a flat arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Class distribution for classification, `[mean]` for regression.
    Leaf { value: Vec<f64> },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum TreeTarget<'a> {
    Classes { labels: &'a [usize], n_classes: usize },
    Values(&'a [f64]),
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
    pub n_features: usize,
    /// Impurity decrease per feature, normalized to sum to 1 when non-zero.
    pub importances: Vec<f64>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
    left_impurity: f64,
    right_impurity: f64,
}

impl DecisionTree {
    pub fn fit<R: Rng>(
        x: &[Vec<f64>],
        target: TreeTarget<'_>,
        samples: Vec<usize>,
        params: TreeParams,
        rng: &mut R,
    ) -> Self {
        let n_features = x.first().map(|r| r.len()).unwrap_or(0);
        let mut builder = Builder {
            x,
            target,
            params,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        let impurity = builder.impurity(&samples);
        builder.grow(samples, impurity, 0, rng);

        let total: f64 = builder.importances.iter().sum();
        if total > EPSILON {
            for v in builder.importances.iter_mut() {
                *v /= total;
            }
        }

        Self {
            nodes: builder.nodes,
            n_features,
            importances: builder.importances,
        }
    }

    /// Leaf value reached by `row`.
    pub fn leaf_value(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if v <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    target: TreeTarget<'a>,
    params: TreeParams,
    nodes: Vec<TreeNode>,
    importances: Vec<f64>,
}

impl<'a> Builder<'a> {
    fn grow<R: Rng>(&mut self, samples: Vec<usize>, impurity: f64, depth: usize, rng: &mut R) -> usize {
        let node_idx = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            value: self.leaf_value(&samples),
        });

        let n = samples.len();
        if n < 2
            || depth >= self.params.max_depth
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf
            || impurity <= EPSILON
        {
            return node_idx;
        }

        let Some(best) = self.best_split(&samples, rng) else {
            return node_idx;
        };

        let n_f = n as f64;
        let decrease = n_f * impurity
            - best.left.len() as f64 * best.left_impurity
            - best.right.len() as f64 * best.right_impurity;
        if decrease <= EPSILON {
            return node_idx;
        }
        self.importances[best.feature] += decrease;

        let left = self.grow(best.left, best.left_impurity, depth + 1, rng);
        let right = self.grow(best.right, best.right_impurity, depth + 1, rng);
        self.nodes[node_idx] = TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        node_idx
    }

    fn best_split<R: Rng>(&self, samples: &[usize], rng: &mut R) -> Option<SplitCandidate> {
        let n_features = self.importances.len();
        if n_features == 0 {
            return None;
        }
        let k = self.params.max_features.clamp(1, n_features);
        let features = sample(rng, n_features, k).into_vec();

        let mut best: Option<(usize, usize, f64, f64, f64, Vec<usize>)> = None;
        for feature in features {
            let mut order = samples.to_vec();
            order.sort_by(|&a, &b| {
                self.x[a][feature]
                    .partial_cmp(&self.x[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            if let Some((pos, weighted, li, ri)) = self.scan_feature(&order, feature) {
                let better = best
                    .as_ref()
                    .map(|(_, _, w, _, _, _)| weighted < *w - EPSILON)
                    .unwrap_or(true);
                if better {
                    best = Some((feature, pos, weighted, li, ri, order));
                }
            }
        }

        best.map(|(feature, pos, _, li, ri, order)| {
            let lo = self.x[order[pos]][feature];
            let hi = self.x[order[pos + 1]][feature];
            let right = order[pos + 1..].to_vec();
            let mut left = order;
            left.truncate(pos + 1);
            SplitCandidate {
                feature,
                threshold: (lo + hi) / 2.0,
                left,
                right,
                left_impurity: li,
                right_impurity: ri,
            }
        })
    }

    /// Sweeps split positions over samples sorted by `feature`.
    /// Returns (last left position, weighted impurity, left impurity, right impurity).
    fn scan_feature(&self, order: &[usize], feature: usize) -> Option<(usize, f64, f64, f64)> {
        let n = order.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut best: Option<(usize, f64, f64, f64)> = None;

        match self.target {
            TreeTarget::Classes { labels, n_classes } => {
                let mut left = vec![0.0; n_classes];
                let mut right = vec![0.0; n_classes];
                for &i in order {
                    right[labels[i]] += 1.0;
                }
                for pos in 0..n - 1 {
                    let c = labels[order[pos]];
                    left[c] += 1.0;
                    right[c] -= 1.0;
                    let nl = pos + 1;
                    let nr = n - nl;
                    if nl < min_leaf || nr < min_leaf {
                        continue;
                    }
                    if self.x[order[pos]][feature] >= self.x[order[pos + 1]][feature] {
                        continue;
                    }
                    let gl = gini(&left, nl as f64);
                    let gr = gini(&right, nr as f64);
                    let weighted = (nl as f64 * gl + nr as f64 * gr) / n as f64;
                    if best.map(|(_, w, _, _)| weighted < w).unwrap_or(true) {
                        best = Some((pos, weighted, gl, gr));
                    }
                }
            }
            TreeTarget::Values(values) => {
                let (mut sum_r, mut sq_r) = (0.0, 0.0);
                for &i in order {
                    sum_r += values[i];
                    sq_r += values[i] * values[i];
                }
                let (mut sum_l, mut sq_l) = (0.0, 0.0);
                for pos in 0..n - 1 {
                    let v = values[order[pos]];
                    sum_l += v;
                    sq_l += v * v;
                    sum_r -= v;
                    sq_r -= v * v;
                    let nl = pos + 1;
                    let nr = n - nl;
                    if nl < min_leaf || nr < min_leaf {
                        continue;
                    }
                    if self.x[order[pos]][feature] >= self.x[order[pos + 1]][feature] {
                        continue;
                    }
                    let vl = variance(sum_l, sq_l, nl as f64);
                    let vr = variance(sum_r, sq_r, nr as f64);
                    let weighted = (nl as f64 * vl + nr as f64 * vr) / n as f64;
                    if best.map(|(_, w, _, _)| weighted < w).unwrap_or(true) {
                        best = Some((pos, weighted, vl, vr));
                    }
                }
            }
        }

        best
    }

    fn impurity(&self, samples: &[usize]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        match self.target {
            TreeTarget::Classes { labels, n_classes } => {
                let mut counts = vec![0.0; n_classes];
                for &i in samples {
                    counts[labels[i]] += 1.0;
                }
                gini(&counts, samples.len() as f64)
            }
            TreeTarget::Values(values) => {
                let (sum, sq) = samples
                    .iter()
                    .fold((0.0, 0.0), |(s, q), &i| (s + values[i], q + values[i] * values[i]));
                variance(sum, sq, samples.len() as f64)
            }
        }
    }

    fn leaf_value(&self, samples: &[usize]) -> Vec<f64> {
        match self.target {
            TreeTarget::Classes { labels, n_classes } => {
                let mut counts = vec![0.0; n_classes];
                for &i in samples {
                    counts[labels[i]] += 1.0;
                }
                let n = samples.len().max(1) as f64;
                counts.into_iter().map(|c| c / n).collect()
            }
            TreeTarget::Values(values) => {
                let n = samples.len().max(1) as f64;
                vec![samples.iter().map(|&i| values[i]).sum::<f64>() / n]
            }
        }
    }
}

fn gini(counts: &[f64], n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / n) * (c / n)).sum::<f64>()
}

fn variance(sum: f64, sum_sq: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params(max_features: usize) -> TreeParams {
        TreeParams {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features,
        }
    }

    #[test]
    fn test_tree_separates_two_classes() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let labels: Vec<usize> = (0..10).map(|i| usize::from(i >= 5)).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = DecisionTree::fit(
            &x,
            TreeTarget::Classes {
                labels: &labels,
                n_classes: 2,
            },
            (0..10).collect(),
            params(1),
            &mut rng,
        );
        assert_eq!(tree.leaf_value(&[1.0]), &[1.0, 0.0]);
        assert_eq!(tree.leaf_value(&[8.0]), &[0.0, 1.0]);
        assert_eq!(tree.nodes.len(), 3);
        assert!((tree.importances[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_regression_tree_predicts_means() {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..8).map(|i| if i < 4 { 0.2 } else { 0.8 }).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = DecisionTree::fit(&x, TreeTarget::Values(&y), (0..8).collect(), params(1), &mut rng);
        assert!((tree.leaf_value(&[0.0])[0] - 0.2).abs() < 1e-12);
        assert!((tree.leaf_value(&[7.0])[0] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_constant_feature_yields_single_leaf() {
        let x = vec![vec![1.0]; 6];
        let y = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = DecisionTree::fit(&x, TreeTarget::Values(&y), (0..6).collect(), params(1), &mut rng);
        assert_eq!(tree.nodes.len(), 1);
        assert!((tree.leaf_value(&[1.0])[0] - 0.5).abs() < 1e-12);
    }
}
