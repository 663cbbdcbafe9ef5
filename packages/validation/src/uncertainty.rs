//! Spread of independent estimates of the same quantity.
//!
//! Standard deviation is the sample standard deviation (n - 1). Interval
//! bounds are `mean ± z·stddev` with the lower bound clipped at zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// z-score for a 95% interval.
pub const Z_95: f64 = 1.96;

/// z-score for a 90% interval.
pub const Z_90: f64 = 1.645;

/// Fewest estimates that can be compared.
pub const MIN_ESTIMATES: usize = 2;

/// Fewest estimates for outlier detection.
pub const MIN_ESTIMATES_FOR_OUTLIERS: usize = 3;

/// A closed interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound, never negative.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

impl ConfidenceInterval {
    fn around(mean: f64, stddev: f64, z: f64) -> Self {
        Self {
            lower: (mean - z * stddev).max(0.0),
            upper: mean + z * stddev,
        }
    }

    /// `upper - lower`.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Statistics over two or more estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncertaintyReport {
    /// The estimates that were compared.
    pub estimates: BTreeMap<String, f64>,
    /// Mean of the estimates.
    pub mean: f64,
    /// Sample standard deviation.
    pub stddev: f64,
    /// `stddev / mean`.
    pub coefficient_of_variation: f64,
    /// 95% interval.
    pub ci_95: ConfidenceInterval,
    /// 90% interval.
    pub ci_90: ConfidenceInterval,
    /// `max(0, 100 - CV·100 - relative 95% width / 2)`.
    pub reliability_score: f64,
    /// Methods outside the IQR fences.
    pub outliers: Vec<String>,
}

/// Result of [`quantify_uncertainty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UncertaintyOutcome {
    /// Too few usable estimates to compare.
    Insufficient {
        /// Usable estimates supplied.
        provided: usize,
        /// Explanation.
        message: String,
    },
    /// Enough estimates were supplied.
    Report(UncertaintyReport),
}

impl UncertaintyOutcome {
    /// The report, if there was enough data.
    #[must_use]
    pub const fn report(&self) -> Option<&UncertaintyReport> {
        match self {
            Self::Report(report) => Some(report),
            Self::Insufficient { .. } => None,
        }
    }
}

/// Quantifies the spread of `estimates` (method name to value).
///
/// Non-finite values are ignored. Fewer than two usable estimates, or a
/// non-positive mean, yields [`UncertaintyOutcome::Insufficient`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn quantify_uncertainty(estimates: &BTreeMap<String, f64>) -> UncertaintyOutcome {
    let usable: BTreeMap<String, f64> = estimates
        .iter()
        .filter(|(_, v)| v.is_finite())
        .map(|(k, v)| (k.clone(), *v))
        .collect();

    if usable.len() < MIN_ESTIMATES {
        return UncertaintyOutcome::Insufficient {
            provided: usable.len(),
            message: format!(
                "At least {MIN_ESTIMATES} independent estimates are required, got {}",
                usable.len()
            ),
        };
    }

    let n = usable.len() as f64;
    let mean = usable.values().sum::<f64>() / n;
    if mean <= 0.0 {
        return UncertaintyOutcome::Insufficient {
            provided: usable.len(),
            message: "Estimates average to zero".to_string(),
        };
    }

    let variance = usable.values().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();
    let coefficient_of_variation = stddev / mean;
    let ci_95 = ConfidenceInterval::around(mean, stddev, Z_95);
    let ci_90 = ConfidenceInterval::around(mean, stddev, Z_90);
    let relative_width = ci_95.width() / mean * 100.0;
    let reliability_score =
        (100.0 - coefficient_of_variation * 100.0 - relative_width / 2.0).max(0.0);

    let outliers = if usable.len() >= MIN_ESTIMATES_FOR_OUTLIERS {
        iqr_outliers(&usable)
    } else {
        Vec::new()
    };
    if !outliers.is_empty() {
        log::warn!("Outlying estimates: {}", outliers.join(", "));
    }

    UncertaintyOutcome::Report(UncertaintyReport {
        estimates: usable,
        mean,
        stddev,
        coefficient_of_variation,
        ci_95,
        ci_90,
        reliability_score,
        outliers,
    })
}

/// Linear-interpolation quantile of sorted values.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    let fraction = position - below as f64;
    sorted[below] + (sorted[above] - sorted[below]) * fraction
}

fn iqr_outliers(estimates: &BTreeMap<String, f64>) -> Vec<String> {
    let mut sorted: Vec<f64> = estimates.values().copied().collect();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let (low, high) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    estimates
        .iter()
        .filter(|(_, v)| **v < low || **v > high)
        .map(|(k, _)| k.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimates(values: &[(&str, f64)]) -> BTreeMap<String, f64> {
        values.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn single_estimate_is_insufficient() {
        let outcome = quantify_uncertainty(&estimates(&[("a", 1_000.0)]));
        assert!(matches!(
            outcome,
            UncertaintyOutcome::Insufficient { provided: 1, .. }
        ));
        assert!(outcome.report().is_none());
    }

    #[test]
    fn non_finite_values_do_not_count() {
        let outcome = quantify_uncertainty(&estimates(&[("a", 1_000.0), ("b", f64::NAN)]));
        assert!(matches!(
            outcome,
            UncertaintyOutcome::Insufficient { provided: 1, .. }
        ));
    }

    #[test]
    fn three_close_estimates() {
        let outcome =
            quantify_uncertainty(&estimates(&[("a", 1_000.0), ("b", 1_100.0), ("c", 1_050.0)]));
        let report = outcome.report().unwrap();

        assert!((report.mean - 1_050.0).abs() < 1e-9);
        assert!((report.stddev - 50.0).abs() < 1e-9);
        assert!((report.coefficient_of_variation - 50.0 / 1_050.0).abs() < 1e-12);
        assert!((report.ci_95.lower - 952.0).abs() < 1e-9);
        assert!((report.ci_95.upper - 1_148.0).abs() < 1e-9);
        assert!(report.ci_90.width() < report.ci_95.width());
        assert!((report.reliability_score - 85.904_761_9).abs() < 1e-6);
        assert!(report.outliers.is_empty());
    }

    #[test]
    fn lower_bound_is_clipped_at_zero() {
        let outcome = quantify_uncertainty(&estimates(&[("a", 100.0), ("b", 2_000.0)]));
        let report = outcome.report().unwrap();
        assert!(report.ci_95.lower.abs() < f64::EPSILON);
        assert!(report.ci_90.lower >= 0.0);
        assert!(report.reliability_score >= 0.0);
    }

    #[test]
    fn flags_iqr_outliers() {
        let outcome = quantify_uncertainty(&estimates(&[
            ("gridded", 1_000.0),
            ("buildings", 1_010.0),
            ("user", 1_020.0),
            ("stale", 5_000.0),
        ]));
        assert_eq!(outcome.report().unwrap().outliers, vec!["stale".to_string()]);
    }

    #[test]
    fn quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&sorted, 0.25) - 1.75).abs() < 1e-12);
        assert!((quantile(&sorted, 0.75) - 3.25).abs() < 1e-12);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(quantify_uncertainty(&BTreeMap::new())).unwrap();
        assert_eq!(json["status"], "insufficient");
    }
}
