use crate::types::MAX_FEATURE_ABS;

/// Replaces NaN/Inf with 0 and clamps the magnitude of every value.
pub fn sanitize_feature_vector(x: &mut [f64]) {
    for val in x.iter_mut() {
        if val.is_nan() || val.is_infinite() {
            *val = 0.0;
        } else if *val > MAX_FEATURE_ABS {
            *val = MAX_FEATURE_ABS;
        } else if *val < -MAX_FEATURE_ABS {
            *val = -MAX_FEATURE_ABS;
        }
    }
}

pub fn sanitize_matrix(rows: &mut [Vec<f64>]) {
    for row in rows.iter_mut() {
        sanitize_feature_vector(row);
    }
}

/// Division that yields 0 for a zero or non-finite denominator.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_invalid() {
        let mut x = vec![f64::NAN, f64::INFINITY, -f64::INFINITY, 1.5];
        sanitize_feature_vector(&mut x);
        assert_eq!(x, vec![0.0, 0.0, 0.0, 1.5]);
    }

    #[test]
    fn test_sanitize_clamps_magnitude() {
        let mut x = vec![1e9, -1e9];
        sanitize_feature_vector(&mut x);
        assert_eq!(x, vec![MAX_FEATURE_ABS, -MAX_FEATURE_ABS]);
    }

    #[test]
    fn test_safe_ratio_zero_denominator() {
        assert_eq!(safe_ratio(3.0, 0.0), 0.0);
        assert_eq!(safe_ratio(3.0, 2.0), 1.5);
    }
}
