use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Index sets produced by a hold-out split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffled hold-out split over `n` samples.
///
/// The test share is `ceil(test_fraction * n)`, capped so at least one sample
/// stays in the training set. With `stratify`, each class contributes its own
/// rounded share to the test set; singleton classes stay in training.
pub fn train_test_split(
    n: usize,
    test_fraction: f64,
    seed: u64,
    stratify: Option<&[usize]>,
) -> TrainTestSplit {
    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    if n < 2 {
        return TrainTestSplit {
            train: (0..n).collect(),
            test: Vec::new(),
        };
    }

    let (mut train, mut test) = match stratify {
        Some(labels) if labels.len() == n => stratified(labels, fraction, &mut rng),
        _ => {
            let mut indices: Vec<usize> = (0..n).collect();
            indices.shuffle(&mut rng);
            let n_test = ((fraction * n as f64).ceil() as usize).min(n - 1);
            let train = indices.split_off(n_test);
            (train, indices)
        }
    };

    train.sort_unstable();
    test.sort_unstable();
    TrainTestSplit { train, test }
}

fn stratified(labels: &[usize], fraction: f64, rng: &mut ChaCha8Rng) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for (_, mut members) in by_class {
        members.shuffle(rng);
        let count = members.len();
        let n_test = if count < 2 {
            0
        } else {
            ((count as f64 * fraction).round() as usize).min(count - 1)
        };
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    if test.is_empty() && fraction > 0.0 && train.len() > 1 {
        if let Some(moved) = train.pop() {
            test.push(moved);
        }
    }

    (train, test)
}

/// Selects the given rows from a matrix-like slice.
pub fn take_rows<T: Clone>(rows: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| rows[i].clone()).collect()
}
