//! Descriptive statistics over reading series
//!
//! Series are small (a rolling window of at most a few dozen samples), so every
//! function works on a slice in one or two passes. All functions are total:
//! degenerate input yields 0 rather than an error or NaN.

use serde::{Deserialize, Serialize};

/// Default |r| above which a relationship is reported as significant.
/// A policy choice, not a statistical test.
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.3;

/// Correlation between two paired series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    /// Pearson coefficient (-1 to 1)
    pub r: f64,
    /// Whether |r| exceeds the configured threshold
    pub significant: bool,
    /// Number of pairs the coefficient was computed from
    pub samples: usize,
}

impl Correlation {
    pub fn compute(x: &[f64], y: &[f64], threshold: f64) -> Self {
        let r = pearson_correlation(x, y);
        Self {
            r,
            significant: is_significant_at(r, threshold),
            samples: x.len().min(y.len()),
        }
    }
}

/// Arithmetic mean, 0 for an empty series
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation, 0 for an empty series
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = average(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Pearson correlation coefficient
///
/// Returns 0 when the series differ in length, are empty, or either has zero
/// variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }

    let mean_x = average(x);
    let mean_y = average(y);

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }

    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Whether |r| exceeds [`SIGNIFICANCE_THRESHOLD`]
pub fn is_significant(r: f64) -> bool {
    is_significant_at(r, SIGNIFICANCE_THRESHOLD)
}

pub fn is_significant_at(r: f64, threshold: f64) -> bool {
    r.abs() > threshold
}

/// Root mean square of successive differences (ms), 0 for fewer than two intervals
pub fn rmssd(rr_intervals_ms: &[f64]) -> f64 {
    if rr_intervals_ms.len() < 2 {
        return 0.0;
    }
    let squared: Vec<f64> = rr_intervals_ms
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).powi(2))
        .collect();
    average(&squared).sqrt()
}
