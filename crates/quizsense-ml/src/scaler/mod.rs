//! Zero-mean / unit-variance scaling and label encoding.
//!
//! The scaler uses the population standard deviation (divide by `n`), and a
//! zero-variance column is left unscaled (scale factor 1.0).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{check_width, MlError, MlResult, EPSILON};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    pub n_samples_seen: usize,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> MlResult<Self> {
        let first = rows.first().ok_or(MlError::EmptyInput)?;
        let d = first.len();
        check_width(rows, d)?;

        let n = rows.len() as f64;
        let mut mean = vec![0.0; d];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in mean.iter_mut() {
            *m /= n;
        }

        let mut var = vec![0.0; d];
        for row in rows {
            for j in 0..d {
                let diff = row[j] - mean[j];
                var[j] += diff * diff;
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std < EPSILON {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self {
            mean,
            scale,
            n_samples_seen: rows.len(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> MlResult<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(MlError::DimensionMismatch {
                expected: self.n_features(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> MlResult<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

/// Maps string labels to dense class indices in sorted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> MlResult<Self> {
        if labels.is_empty() {
            return Err(MlError::EmptyInput);
        }
        let classes: BTreeSet<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        Ok(Self {
            classes: classes.into_iter().collect(),
        })
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn encode(&self, label: &str) -> MlResult<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| MlError::UnknownLabel(label.to_string()))
    }

    pub fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> MlResult<Vec<usize>> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaler_zero_mean_unit_variance() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert!((scaler.mean[0] - 3.0).abs() < 1e-12);
        let scaled = scaler.transform(&rows).unwrap();
        let mean: f64 = scaled.iter().map(|r| r[0]).sum::<f64>() / 3.0;
        let var: f64 = scaled.iter().map(|r| r[0] * r[0]).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_scaler_constant_column_keeps_scale_one() {
        let rows = vec![vec![2.0], vec![2.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.scale, vec![1.0]);
        assert_eq!(scaler.transform_row(&[2.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_scaler_rejects_wrong_width() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0]]).unwrap();
        assert_eq!(
            scaler.transform_row(&[1.0]),
            Err(MlError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_label_encoder_sorted_classes() {
        let enc = LabelEncoder::fit(&["medium", "easy", "hard", "easy"]).unwrap();
        assert_eq!(enc.classes, vec!["easy", "hard", "medium"]);
        assert_eq!(enc.encode("hard").unwrap(), 1);
        assert_eq!(enc.decode(2), Some("medium"));
        assert!(enc.encode("unknown").is_err());
    }
}
