#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Validation of a zone's estimates.
//!
//! [`validate`] rolls three scores into one quality figure: agreement
//! between independent sources, completeness of the inputs, and
//! plausibility of the outputs.

pub mod cross;
pub mod quality;
pub mod uncertainty;

use std::collections::BTreeMap;

use lusaka_waste_provider_models::BuildingSummary;
use lusaka_waste_waste_models::WasteGenerationResult;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

pub use cross::{AgreementLevel, DatasetAgreement, cross_validate_buildings};
pub use quality::{DataAvailability, PlausibilityCheck};
pub use uncertainty::{
    ConfidenceInterval, UncertaintyOutcome, UncertaintyReport, quantify_uncertainty,
};

/// Overall quality label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
pub enum QualityLevel {
    /// 85 and above.
    Excellent,
    /// 70 to 85.
    Good,
    /// 55 to 70.
    Moderate,
    /// 40 to 55.
    Poor,
    /// Below 40.
    #[serde(rename = "Very Poor")]
    #[strum(serialize = "Very Poor")]
    VeryPoor,
}

impl QualityLevel {
    /// Labels a 0-100 quality score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            Self::Excellent
        } else if score >= 70.0 {
            Self::Good
        } else if score >= 55.0 {
            Self::Moderate
        } else if score >= 40.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }
}

/// 95% and 90% intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceIntervals {
    /// 95% interval.
    pub ci_95: ConfidenceInterval,
    /// 90% interval.
    pub ci_90: ConfidenceInterval,
}

/// What [`validate`] looks at.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInputs<'a> {
    /// Population estimates keyed by method name.
    pub population_estimates: &'a BTreeMap<String, f64>,
    /// Final population density.
    pub density_per_sqkm: Option<f64>,
    /// Waste result.
    pub waste: Option<&'a WasteGenerationResult>,
    /// Primary footprint dataset.
    pub primary_buildings: Option<&'a BuildingSummary>,
    /// Secondary footprint dataset.
    pub secondary_buildings: Option<&'a BuildingSummary>,
    /// Which inputs were available.
    pub availability: DataAvailability,
}

/// Validation outcome for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Agreement between independent sources, 0-100.
    pub agreement_score: f64,
    /// Population uncertainty, or why it could not be computed.
    pub uncertainty: UncertaintyOutcome,
    /// Population intervals, when there were enough estimates.
    pub confidence_intervals: Option<ConfidenceIntervals>,
    /// Population coefficient of variation, when available.
    pub coefficient_of_variation: Option<f64>,
    /// Outlying population methods.
    pub outliers: Vec<String>,
    /// Footprint dataset comparison, when both were available.
    pub building_agreement: Option<DatasetAgreement>,
    /// Input completeness, 0-100.
    pub completeness_score: f64,
    /// Output plausibility, 0-100.
    pub plausibility_score: f64,
    /// Individual plausibility checks.
    pub plausibility_checks: Vec<PlausibilityCheck>,
    /// Mean of agreement, completeness and plausibility.
    pub overall_quality_score: f64,
    /// Label for `overall_quality_score`.
    pub quality_level: QualityLevel,
}

impl ValidationReport {
    /// Reliability of the population figure, or zero when it could not be
    /// assessed.
    #[must_use]
    pub fn reliability_score(&self) -> f64 {
        self.uncertainty
            .report()
            .map_or(0.0, |r| r.reliability_score)
    }
}

/// Validates a zone's estimates.
///
/// Agreement averages the population-method agreement
/// (`100 - CV·100`) and the footprint dataset agreement over whichever
/// are available; with neither it is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn validate(inputs: &ValidationInputs<'_>) -> ValidationReport {
    let uncertainty = quantify_uncertainty(inputs.population_estimates);
    let report = uncertainty.report();

    let building_agreement = inputs
        .primary_buildings
        .zip(inputs.secondary_buildings)
        .map(|(primary, secondary)| cross_validate_buildings(primary, secondary));

    let components: Vec<f64> = [
        report.map(|r| (100.0 - r.coefficient_of_variation * 100.0).max(0.0)),
        building_agreement.as_ref().map(|a| a.agreement_score),
    ]
    .into_iter()
    .flatten()
    .collect();
    let agreement_score = if components.is_empty() {
        0.0
    } else {
        components.iter().sum::<f64>() / components.len() as f64
    };

    let completeness_score = inputs.availability.completeness_score();
    let plausibility_checks = quality::plausibility_checks(inputs.waste, inputs.density_per_sqkm);
    let plausibility_score = quality::plausibility_score(&plausibility_checks);

    let overall_quality_score = (agreement_score + completeness_score + plausibility_score) / 3.0;
    let quality_level = QualityLevel::from_score(overall_quality_score);

    log::debug!(
        "Quality {overall_quality_score:.1} ({quality_level}): agreement {agreement_score:.1}, completeness {completeness_score:.1}, plausibility {plausibility_score:.1}"
    );

    ValidationReport {
        agreement_score,
        confidence_intervals: report.map(|r| ConfidenceIntervals {
            ci_95: r.ci_95,
            ci_90: r.ci_90,
        }),
        coefficient_of_variation: report.map(|r| r.coefficient_of_variation),
        outliers: report.map(|r| r.outliers.clone()).unwrap_or_default(),
        uncertainty,
        building_agreement,
        completeness_score,
        plausibility_score,
        plausibility_checks,
        overall_quality_score,
        quality_level,
    }
}

#[cfg(test)]
mod tests {
    use lusaka_waste_provider_models::{AreaStatistics, BuildingDataset};

    use super::*;

    fn summary(dataset: BuildingDataset, count: u64) -> BuildingSummary {
        BuildingSummary {
            dataset,
            count,
            area_statistics: AreaStatistics {
                mean: 60.0,
                stddev: 30.0,
                min: 10.0,
                max: 500.0,
                sum: 60.0 * 1_000.0,
            },
            height_statistics: None,
            confidence_threshold: 0.75,
        }
    }

    #[test]
    fn quality_bands() {
        assert_eq!(QualityLevel::from_score(85.0), QualityLevel::Excellent);
        assert_eq!(QualityLevel::from_score(70.0), QualityLevel::Good);
        assert_eq!(QualityLevel::from_score(60.0), QualityLevel::Moderate);
        assert_eq!(QualityLevel::from_score(40.0), QualityLevel::Poor);
        assert_eq!(QualityLevel::from_score(39.9), QualityLevel::VeryPoor);
        assert_eq!(QualityLevel::VeryPoor.to_string(), "Very Poor");
    }

    #[test]
    fn single_estimate_degrades_gracefully() {
        let estimates: BTreeMap<String, f64> = [("area_fallback".to_string(), 1_250.0)].into();
        let report = validate(&ValidationInputs {
            population_estimates: &estimates,
            density_per_sqkm: Some(1_250.0),
            waste: None,
            primary_buildings: None,
            secondary_buildings: None,
            availability: DataAvailability::default(),
        });

        assert!(matches!(
            report.uncertainty,
            UncertaintyOutcome::Insufficient { .. }
        ));
        assert!(report.confidence_intervals.is_none());
        assert!(report.agreement_score.abs() < f64::EPSILON);
        assert!(report.reliability_score().abs() < f64::EPSILON);
        assert_eq!(report.quality_level, QualityLevel::VeryPoor);
    }

    #[test]
    fn combines_population_and_dataset_agreement() {
        let estimates: BTreeMap<String, f64> = [
            ("gridded_population".to_string(), 1_000.0),
            ("building_footprint".to_string(), 1_100.0),
            ("user_classification".to_string(), 1_050.0),
        ]
        .into();
        let open = summary(BuildingDataset::OpenBuildings, 1_000);
        let microsoft = summary(BuildingDataset::MicrosoftBuildings, 1_000);

        let report = validate(&ValidationInputs {
            population_estimates: &estimates,
            density_per_sqkm: Some(10_500.0),
            waste: None,
            primary_buildings: Some(&open),
            secondary_buildings: Some(&microsoft),
            availability: DataAvailability {
                gridded_population: true,
                primary_buildings: true,
                secondary_buildings: true,
                ..DataAvailability::default()
            },
        });

        let population_agreement = 100.0 - 50.0 / 1_050.0 * 100.0;
        assert!(
            (report.agreement_score - f64::midpoint(population_agreement, 100.0)).abs() < 1e-9
        );
        assert_eq!(
            report.building_agreement.unwrap().agreement_level,
            AgreementLevel::Excellent
        );
        assert!(report.confidence_intervals.is_some());
        assert!((report.plausibility_score - 100.0).abs() < 1e-9);
        assert!(report.overall_quality_score > 70.0);
    }
}
