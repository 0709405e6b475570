//! Goodness-of-fit metrics for comparing simulated series to history.
//!
//! RULE: length-mismatched or empty inputs return 0, never panic. Zero
//! denominators go through `safe_div`. Numerical degeneracy here is a
//! guarded condition, not an error.

/// Division that returns 0 on zero/non-finite denominators.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if !numerator.is_finite() || !denominator.is_finite() || denominator.abs() < 1e-12 {
        return 0.0;
    }
    numerator / denominator
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Mean absolute error.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return 0.0;
    }
    let abs_errors: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (p - a).abs())
        .collect();
    mean(&abs_errors)
}

/// Root mean squared error.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return 0.0;
    }
    let sq_errors: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (p - a).powi(2))
        .collect();
    mean(&sq_errors).sqrt()
}

/// Mean absolute percentage error, in percent. Near-zero actuals
/// contribute 0 instead of blowing up.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return 0.0;
    }
    let pct_errors: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| {
            if a.abs() < 1e-12 {
                0.0
            } else {
                ((p - a) / a).abs() * 100.0
            }
        })
        .collect();
    mean(&pct_errors)
}

/// Pearson correlation coefficient in [-1, 1]; 0 on degenerate input.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.is_empty() || x.len() != y.len() {
        return 0.0;
    }
    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut numerator = 0.0;
    let mut den_x = 0.0;
    let mut den_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        numerator += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    safe_div(numerator, (den_x * den_y).sqrt())
}

/// Fraction of week-over-week moves whose sign matches.
pub fn directional_accuracy(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() < 2 || predicted.len() != actual.len() {
        return 0.0;
    }
    let mut matches = 0u32;
    let mut total = 0u32;
    for i in 1..actual.len() {
        let actual_delta = (actual[i] - actual[i - 1]).signum();
        let predicted_delta = (predicted[i] - predicted[i - 1]).signum();
        if actual_delta == predicted_delta {
            matches += 1;
        }
        total += 1;
    }
    safe_div(matches as f64, total as f64)
}

/// Rebase a series to index 100 at its first value.
pub fn normalize_to_index(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let base = if values[0].abs() < 1e-12 { 1.0 } else { values[0] };
    values.iter().map(|v| safe_div(*v, base) * 100.0).collect()
}

/// Fraction of target points that fall inside [lower, upper].
pub fn band_coverage(target: &[f64], lower: &[f64], upper: &[f64]) -> f64 {
    if target.is_empty() || target.len() != lower.len() || target.len() != upper.len() {
        return 0.0;
    }
    let covered = target
        .iter()
        .zip(lower.iter().zip(upper))
        .filter(|(t, (lo, hi))| **t >= **lo && **t <= **hi)
        .count();
    safe_div(covered as f64, target.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_div_guards_degenerate_denominators() {
        assert_eq!(safe_div(1.0, 0.0), 0.0);
        assert_eq!(safe_div(1.0, f64::NAN), 0.0);
        assert_eq!(safe_div(f64::INFINITY, 2.0), 0.0);
        assert_eq!(safe_div(6.0, 3.0), 2.0);
    }

    #[test]
    fn identical_series_fit_perfectly() {
        let series = [100.0, 105.0, 98.0, 110.0, 120.0];
        assert_eq!(mae(&series, &series), 0.0);
        assert_eq!(rmse(&series, &series), 0.0);
        assert!((pearson_correlation(&series, &series) - 1.0).abs() < 1e-12);
        assert_eq!(directional_accuracy(&series, &series), 1.0);
    }

    #[test]
    fn anticorrelated_series_score_minus_one() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [4.0, 3.0, 2.0, 1.0];
        assert!((pearson_correlation(&x, &y) + 1.0).abs() < 1e-12);
        assert_eq!(directional_accuracy(&x, &y), 0.0);
    }

    #[test]
    fn length_mismatch_returns_zero() {
        assert_eq!(mae(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(pearson_correlation(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(band_coverage(&[1.0], &[0.0], &[2.0, 3.0]), 0.0);
    }

    #[test]
    fn normalize_rebases_to_100() {
        let indexed = normalize_to_index(&[50.0, 75.0, 25.0]);
        assert_eq!(indexed, vec![100.0, 150.0, 50.0]);
    }

    #[test]
    fn band_coverage_counts_inside_points() {
        let target = [1.0, 2.0, 3.0, 4.0];
        let lower = [0.0, 2.5, 2.0, 0.0];
        let upper = [2.0, 3.0, 4.0, 1.0];
        assert_eq!(band_coverage(&target, &lower, &upper), 0.5);
    }
}
