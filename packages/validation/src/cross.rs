//! Agreement between independent sources.

use lusaka_waste_provider_models::BuildingSummary;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Qualitative agreement between two datasets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgreementLevel {
    /// Under 10% apart.
    Excellent,
    /// Under 20% apart.
    Good,
    /// Under 35% apart.
    Moderate,
    /// 35% or more apart.
    Poor,
}

impl AgreementLevel {
    /// Labels a relative percent difference.
    #[must_use]
    pub fn from_difference(percent: f64) -> Self {
        if percent < 10.0 {
            Self::Excellent
        } else if percent < 20.0 {
            Self::Good
        } else if percent < 35.0 {
            Self::Moderate
        } else {
            Self::Poor
        }
    }
}

/// Relative difference of two values against their mean, in percent.
///
/// Two zeros agree perfectly.
#[must_use]
pub fn relative_difference_percent(a: f64, b: f64) -> f64 {
    let mean = f64::midpoint(a, b);
    if mean.abs() < f64::EPSILON {
        0.0
    } else {
        (a - b).abs() / mean.abs() * 100.0
    }
}

/// Comparison of two building footprint datasets over the same zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAgreement {
    /// Footprints in the primary dataset.
    pub primary_count: u64,
    /// Footprints in the secondary dataset.
    pub secondary_count: u64,
    /// Relative difference in counts.
    pub count_difference_percent: f64,
    /// Relative difference in total footprint area.
    pub area_difference_percent: f64,
    /// Label for the count difference.
    pub agreement_level: AgreementLevel,
    /// `max(0, 100 - count difference)`.
    pub agreement_score: f64,
}

/// Cross-validates two footprint datasets.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cross_validate_buildings(
    primary: &BuildingSummary,
    secondary: &BuildingSummary,
) -> DatasetAgreement {
    let count_difference_percent =
        relative_difference_percent(primary.count as f64, secondary.count as f64);
    let area_difference_percent =
        relative_difference_percent(primary.area_statistics.sum, secondary.area_statistics.sum);
    let agreement_level = AgreementLevel::from_difference(count_difference_percent);

    log::debug!(
        "{} vs {}: {count_difference_percent:.1}% count difference ({agreement_level})",
        primary.dataset,
        secondary.dataset
    );

    DatasetAgreement {
        primary_count: primary.count,
        secondary_count: secondary.count,
        count_difference_percent,
        area_difference_percent,
        agreement_level,
        agreement_score: (100.0 - count_difference_percent).max(0.0),
    }
}
