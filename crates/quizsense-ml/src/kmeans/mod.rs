//! Lloyd's k-means with k-means++ seeding and multiple restarts.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::{check_width, squared_distance, KMeansParams, MlError, MlResult, EPSILON};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    pub params: KMeansParams,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances from each training sample to its centroid.
    pub inertia: f64,
    pub n_iter: usize,
}

struct Run {
    centroids: Vec<Vec<f64>>,
    labels: Vec<usize>,
    inertia: f64,
    n_iter: usize,
}

impl KMeans {
    /// Fits `params.n_clusters` centroids and returns the model with the
    /// training assignments of its best restart.
    pub fn fit(x: &[Vec<f64>], params: KMeansParams) -> MlResult<(Self, Vec<usize>)> {
        let first = x.first().ok_or(MlError::EmptyInput)?;
        check_width(x, first.len())?;
        if params.n_clusters == 0 || params.n_clusters > x.len() {
            return Err(MlError::InsufficientSamples {
                required: params.n_clusters.max(1),
                actual: x.len(),
            });
        }

        let runs: Vec<Run> = (0..params.n_init.max(1))
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(i as u64));
                lloyd(x, &params, &mut rng)
            })
            .collect();

        // Lowest inertia wins; ties keep the earliest restart.
        let mut best: Option<Run> = None;
        for run in runs {
            let replace = best
                .as_ref()
                .map(|b| run.inertia < b.inertia)
                .unwrap_or(true);
            if replace {
                best = Some(run);
            }
        }
        let best = best.ok_or(MlError::EmptyInput)?;

        Ok((
            Self {
                params,
                centroids: best.centroids,
                inertia: best.inertia,
                n_iter: best.n_iter,
            },
            best.labels,
        ))
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }

    fn n_features(&self) -> usize {
        self.centroids.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Euclidean distance from each row to every centroid.
    pub fn transform(&self, x: &[Vec<f64>]) -> MlResult<Vec<Vec<f64>>> {
        if self.centroids.is_empty() {
            return Err(MlError::NotFitted);
        }
        check_width(x, self.n_features())?;
        Ok(x.iter()
            .map(|row| {
                self.centroids
                    .iter()
                    .map(|c| squared_distance(row, c).sqrt())
                    .collect()
            })
            .collect())
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> MlResult<Vec<usize>> {
        if self.centroids.is_empty() {
            return Err(MlError::NotFitted);
        }
        check_width(x, self.n_features())?;
        Ok(x.iter().map(|row| nearest(row, &self.centroids).0).collect())
    }
}

fn nearest(row: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(row, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn kmeans_plus_plus(x: &[Vec<f64>], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f64>> {
    let n = x.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(x[rng.gen_range(0..n)].clone());

    let mut dist: Vec<f64> = x.iter().map(|row| squared_distance(row, &centroids[0])).collect();
    while centroids.len() < k {
        let total: f64 = dist.iter().sum();
        let next = if total <= EPSILON {
            // Remaining points coincide with chosen centroids.
            rng.gen_range(0..n)
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, d) in dist.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        };
        let centroid = x[next].clone();
        for (d, row) in dist.iter_mut().zip(x) {
            *d = d.min(squared_distance(row, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

fn lloyd(x: &[Vec<f64>], params: &KMeansParams, rng: &mut ChaCha8Rng) -> Run {
    let k = params.n_clusters;
    let d = x[0].len();
    let mut centroids = kmeans_plus_plus(x, k, rng);
    let mut labels = vec![0; x.len()];
    let mut n_iter = 0;

    for iter in 0..params.max_iter.max(1) {
        n_iter = iter + 1;
        for (label, row) in labels.iter_mut().zip(x) {
            *label = nearest(row, &centroids).0;
        }

        let mut sums = vec![vec![0.0; d]; k];
        let mut counts = vec![0usize; k];
        for (row, &label) in x.iter().zip(&labels) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(row) {
                *s += v;
            }
        }

        let mut shift = 0.0;
        for c in 0..k {
            if counts[c] == 0 {
                // Empty cluster keeps its previous centroid.
                continue;
            }
            let updated: Vec<f64> = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            shift += squared_distance(&updated, &centroids[c]);
            centroids[c] = updated;
        }

        if shift <= params.tol {
            break;
        }
    }

    let mut inertia = 0.0;
    for (label, row) in labels.iter_mut().zip(x) {
        let (idx, dist) = nearest(row, &centroids);
        *label = idx;
        inertia += dist;
    }

    Run {
        centroids,
        labels,
        inertia,
        n_iter,
    }
}
