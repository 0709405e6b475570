//! Distributional summaries of per-run values.
//!
//! One `MetricSummary` is computed per metric per week across the N
//! Monte Carlo runs. Never mutated after construction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean:       f64,
    pub p10:        f64,
    pub p90:        f64,
    pub min:        f64,
    pub max:        f64,
    pub std_dev:    f64,
    pub ci95_lower: f64,
    pub ci95_upper: f64,
}

impl MetricSummary {
    pub const ZERO: MetricSummary = MetricSummary {
        mean:       0.0,
        p10:        0.0,
        p90:        0.0,
        min:        0.0,
        max:        0.0,
        std_dev:    0.0,
        ci95_lower: 0.0,
        ci95_upper: 0.0,
    };
}

/// Summarize a set of per-run values for one metric at one week.
pub fn summarize(values: &[f64]) -> MetricSummary {
    let n = values.len();
    if n == 0 {
        return MetricSummary::ZERO;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    let std_dev = variance.sqrt();
    let margin = 1.96 * std_dev / (n as f64).sqrt();

    MetricSummary {
        mean,
        p10: sorted[(n as f64 * 0.1) as usize],
        p90: sorted[((n as f64 * 0.9) as usize).min(n - 1)],
        min: sorted[0],
        max: sorted[n - 1],
        std_dev,
        ci95_lower: mean - margin,
        ci95_upper: mean + margin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_zeros() {
        assert_eq!(summarize(&[]), MetricSummary::ZERO);
    }

    #[test]
    fn single_value_collapses() {
        let s = summarize(&[5.0]);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.min, 5.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.ci95_lower, 5.0);
        assert_eq!(s.ci95_upper, 5.0);
    }

    #[test]
    fn percentiles_and_spread() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let s = summarize(&values);
        assert!((s.mean - 49.5).abs() < 1e-9);
        assert_eq!(s.p10, 10.0);
        assert_eq!(s.p90, 90.0);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 99.0);
        assert!(s.ci95_lower < s.mean && s.mean < s.ci95_upper);
    }
}
