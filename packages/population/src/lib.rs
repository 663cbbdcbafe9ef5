#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Population estimation for a zone.
//!
//! [`PopulationEstimator::estimate`] runs the [`chain::FallbackChain`]
//! to find a primary figure, then reconciles a gridded primary against
//! the building-footprint estimate. If footprints imply fewer than
//! [`EstimatorConfig::disagreement_ratio`] of the primary, the two are
//! averaged and confidence is capped at medium.
//!
//! The estimator is synchronous. Provider data is fetched beforehand and
//! handed in through [`EstimationContext`]; a provider failure simply
//! shows up as a missing input.

pub mod chain;
pub mod correction;
pub mod strategy;

use lusaka_waste_population_models::{
    ConsensusPopulationEstimate, EstimationMethod, UserClassification,
};
use lusaka_waste_provider_models::{BuildingSummary, GriddedPopulation};
use lusaka_waste_zone_models::{Confidence, DensityCategory, SettlementType, Zone};
use serde::{Deserialize, Serialize};

use crate::chain::FallbackChain;
use crate::strategy::{
    BuildingFootprintStrategy, EstimationStrategy as _, UserClassificationStrategy,
    build_estimate,
};

/// Errors from [`PopulationEstimator::estimate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimationError {
    /// The zone has no usable area, so no fallback can apply.
    #[error("No population data available: zone area is {area_sqkm} km2")]
    NoPopulationData {
        /// The rejected area.
        area_sqkm: f64,
    },
}

/// Tunable estimator constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EstimatorConfig {
    /// Building estimates below this share of the gridded primary count
    /// as disagreement.
    pub disagreement_ratio: f64,
    /// Density used by the last-resort fallback (people per km²).
    pub fallback_density_per_sqkm: f64,
    /// Occupancy of formal settlements (people per 100 m² of floor).
    pub formal_people_per_100_sqm: f64,
    /// Occupancy of informal settlements (people per 100 m² of floor).
    pub informal_people_per_100_sqm: f64,
    /// Starting confidence score for a gridded primary.
    pub base_confidence: f64,
    /// Lowest confidence score a gridded primary can reach.
    pub min_confidence: f64,
    /// Highest confidence score a gridded primary can reach.
    pub max_confidence: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            disagreement_ratio: 0.6,
            fallback_density_per_sqkm: 1_250.0,
            formal_people_per_100_sqm: 4.1,
            informal_people_per_100_sqm: 6.2,
            base_confidence: 0.85,
            min_confidence: 0.65,
            max_confidence: 0.95,
        }
    }
}

impl EstimatorConfig {
    /// Occupancy for a settlement type. Mixed settlements use the midpoint.
    #[must_use]
    pub fn occupancy_per_100_sqm(&self, settlement: SettlementType) -> f64 {
        match settlement {
            SettlementType::Formal => self.formal_people_per_100_sqm,
            SettlementType::Informal => self.informal_people_per_100_sqm,
            SettlementType::Mixed => {
                f64::midpoint(self.formal_people_per_100_sqm, self.informal_people_per_100_sqm)
            }
        }
    }

    /// Confidence score for a gridded primary.
    ///
    /// Very-high-density zones lose 0.05, uniform rasters gain up to 0.03,
    /// and a missing secondary estimate costs 0.05.
    #[must_use]
    pub fn gridded_confidence_score(
        &self,
        category: DensityCategory,
        pixel_cv: Option<f64>,
        has_secondary: bool,
    ) -> f64 {
        let mut score = self.base_confidence;
        if category == DensityCategory::VeryHighDensityUrban {
            score -= 0.05;
        }
        match pixel_cv {
            Some(cv) if cv < 0.3 => score += 0.03,
            Some(cv) if cv < 0.5 => score += 0.02,
            _ => {}
        }
        if !has_secondary {
            score -= 0.05;
        }
        score.clamp(self.min_confidence, self.max_confidence)
    }
}

/// Confidence score for a primary that is not a gridded raster.
const fn fallback_confidence_score(method: EstimationMethod) -> f64 {
    match method {
        EstimationMethod::GriddedPopulation => 0.85,
        EstimationMethod::BuildingFootprint | EstimationMethod::UserClassification => 0.75,
        EstimationMethod::StoredEstimate => 0.6,
        EstimationMethod::AreaFallback => 0.3,
    }
}

/// Everything known about a zone when estimating its population.
#[derive(Debug, Clone, Copy)]
pub struct EstimationContext<'a> {
    /// The zone.
    pub zone: &'a Zone,
    /// Zone area from geometry metrics.
    pub area_sqkm: f64,
    /// Gridded population for the analysis year.
    pub gridded: Option<&'a GriddedPopulation>,
    /// Primary building footprint summary.
    pub buildings: Option<&'a BuildingSummary>,
    /// Settlement type inferred by the classifier.
    pub inferred_settlement: Option<SettlementType>,
    /// User-supplied classification.
    pub user: Option<&'a UserClassification>,
}

impl<'a> EstimationContext<'a> {
    /// A context with only the zone and its area.
    #[must_use]
    pub const fn new(zone: &'a Zone, area_sqkm: f64) -> Self {
        Self {
            zone,
            area_sqkm,
            gridded: None,
            buildings: None,
            inferred_settlement: None,
            user: None,
        }
    }

    /// Settlement type, preferring the user's declaration over inference
    /// and defaulting to mixed.
    #[must_use]
    pub fn settlement_type(&self) -> SettlementType {
        self.user
            .and_then(|u| u.settlement_type)
            .or(self.inferred_settlement)
            .unwrap_or(SettlementType::Mixed)
    }
}

/// Reconciles the available sources into one population figure.
#[derive(Default)]
pub struct PopulationEstimator {
    config: EstimatorConfig,
    chain: FallbackChain,
}

impl PopulationEstimator {
    /// An estimator using the standard chain.
    #[must_use]
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            chain: FallbackChain::standard(),
        }
    }

    /// An estimator using a custom chain.
    #[must_use]
    pub const fn with_chain(config: EstimatorConfig, chain: FallbackChain) -> Self {
        Self { config, chain }
    }

    /// The estimator's constants.
    #[must_use]
    pub const fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimates the zone's population.
    ///
    /// The result is strictly positive whenever `ctx.area_sqkm > 0`.
    ///
    /// # Errors
    ///
    /// Returns [`EstimationError::NoPopulationData`] if the area is not a
    /// positive finite number or every strategy in a custom chain fails.
    #[allow(clippy::cast_precision_loss)]
    pub fn estimate(
        &self,
        ctx: &EstimationContext<'_>,
    ) -> Result<ConsensusPopulationEstimate, EstimationError> {
        let area_sqkm = ctx.area_sqkm;
        if !area_sqkm.is_finite() || area_sqkm <= 0.0 {
            return Err(EstimationError::NoPopulationData { area_sqkm });
        }

        let (primary, attempts) = self.chain.run(ctx, &self.config);
        let primary = primary.ok_or(EstimationError::NoPopulationData { area_sqkm })?;
        let primary_method = primary.method;

        let mut contributing = vec![primary.clone()];
        let mut consensus_value = primary.value;
        let mut adjustment_reason = None;
        let mut cap = None;

        let score = if primary_method == EstimationMethod::GriddedPopulation {
            let secondary = BuildingFootprintStrategy.attempt(ctx, &self.config).ok();

            if let Some(building) = &secondary {
                if (building.value as f64) < self.config.disagreement_ratio * primary.value as f64
                {
                    consensus_value = (primary.value + building.value).div_ceil(2);
                    cap = Some(Confidence::Medium);
                    let reason = format!(
                        "Building-based estimate ({}) is below {:.0}% of gridded estimate ({}); using the average",
                        building.value,
                        self.config.disagreement_ratio * 100.0,
                        primary.value
                    );
                    log::warn!("Zone {}: {reason}", ctx.zone.id);
                    adjustment_reason = Some(reason);
                }
                contributing.push(building.clone());
            }

            if let Ok(user) = UserClassificationStrategy.attempt(ctx, &self.config) {
                contributing.push(user);
            }

            let category = DensityCategory::from_density(consensus_value as f64 / area_sqkm);
            self.config.gridded_confidence_score(
                category,
                ctx.gridded.and_then(|g| g.pixel_coefficient_of_variation),
                secondary.is_some(),
            )
        } else {
            fallback_confidence_score(primary_method)
        };

        let mut confidence_level = Confidence::from_score(score);
        if let Some(cap) = cap {
            confidence_level = confidence_level.capped_at(cap);
        }

        let consensus = build_estimate(
            primary_method,
            consensus_value as f64,
            area_sqkm,
            confidence_level,
            String::new(),
            primary.correction_factor,
        );

        log::info!(
            "Zone {}: population {} via {primary_method} ({confidence_level} confidence, score {score:.2})",
            ctx.zone.id,
            consensus.value
        );

        Ok(ConsensusPopulationEstimate {
            consensus_value: consensus.value,
            confidence_level,
            confidence_score: score,
            density_per_sqkm: consensus.density_per_sqkm,
            density_category: consensus.density_category,
            primary_method,
            contributing_methods: contributing,
            adjustment_reason,
            attempts,
        })
    }
}

/// Shorthand for the standard estimator's output on one context.
///
/// # Errors
///
/// See [`PopulationEstimator::estimate`].
pub fn estimate(
    ctx: &EstimationContext<'_>,
    config: &EstimatorConfig,
) -> Result<ConsensusPopulationEstimate, EstimationError> {
    PopulationEstimator::new(config.clone()).estimate(ctx)
}

#[cfg(test)]
mod tests {
    use lusaka_waste_population_models::SocioEconomicLevel;
    use lusaka_waste_provider_models::{AreaStatistics, BuildingDataset};

    use super::*;

    fn zone() -> Zone {
        Zone::new("kanyama", vec![])
    }

    fn gridded(total: f64, cv: Option<f64>) -> GriddedPopulation {
        GriddedPopulation {
            year: 2020,
            total_population: total,
            density_per_sqkm: total,
            pixel_count: 4,
            pixel_coefficient_of_variation: cv,
        }
    }

    fn footprints(sum: f64) -> BuildingSummary {
        BuildingSummary {
            dataset: BuildingDataset::OpenBuildings,
            count: 2_000,
            area_statistics: AreaStatistics {
                mean: sum / 2_000.0,
                stddev: 40.0,
                min: 8.0,
                max: 900.0,
                sum,
            },
            height_statistics: None,
            confidence_threshold: 0.75,
        }
    }

    #[test]
    fn gridded_primary_is_density_corrected() {
        let zone = zone();
        let raster = gridded(10_000.0, None);
        let mut ctx = EstimationContext::new(&zone, 1.0);
        ctx.gridded = Some(&raster);

        let result = PopulationEstimator::default().estimate(&ctx).unwrap();
        assert_eq!(result.primary_method, EstimationMethod::GriddedPopulation);
        assert_eq!(result.consensus_value, 13_000);
        assert_eq!(result.density_category, DensityCategory::HighDensityUrban);
        assert!((result.contributing_methods[0].correction_factor - 1.3).abs() < 1e-12);
        // no secondary data: 0.85 - 0.05
        assert!((result.confidence_score - 0.80).abs() < 1e-9);
        assert_eq!(result.confidence_level, Confidence::Medium);
    }

    #[test]
    fn agreeing_building_estimate_keeps_primary() {
        let zone = zone();
        let raster = gridded(10_000.0, Some(0.2));
        let buildings = footprints(200_000.0);
        let mut ctx = EstimationContext::new(&zone, 1.0);
        ctx.gridded = Some(&raster);
        ctx.buildings = Some(&buildings);
        ctx.inferred_settlement = Some(SettlementType::Informal);

        let result = PopulationEstimator::default().estimate(&ctx).unwrap();
        assert_eq!(result.consensus_value, 13_000);
        assert!(result.adjustment_reason.is_none());
        assert_eq!(result.contributing_methods.len(), 2);
        assert_eq!(result.contributing_methods[1].value, 12_400);
        assert!((result.confidence_score - 0.88).abs() < 1e-9);
        assert_eq!(result.confidence_level, Confidence::High);
    }

    #[test]
    fn disagreeing_building_estimate_is_averaged_and_capped() {
        let zone = zone();
        let raster = gridded(10_000.0, Some(0.2));
        let buildings = footprints(100_000.0);
        let mut ctx = EstimationContext::new(&zone, 1.0);
        ctx.gridded = Some(&raster);
        ctx.buildings = Some(&buildings);
        ctx.inferred_settlement = Some(SettlementType::Formal);

        let result = PopulationEstimator::default().estimate(&ctx).unwrap();
        assert_eq!(result.consensus_value, 8_550);
        assert!(result.adjustment_reason.is_some());
        assert_eq!(result.confidence_level, Confidence::Medium);
    }

    #[test]
    fn disagreement_ratio_is_tunable() {
        let zone = zone();
        let raster = gridded(10_000.0, None);
        let buildings = footprints(100_000.0);
        let mut ctx = EstimationContext::new(&zone, 1.0);
        ctx.gridded = Some(&raster);
        ctx.buildings = Some(&buildings);
        ctx.inferred_settlement = Some(SettlementType::Formal);

        let lenient = EstimatorConfig {
            disagreement_ratio: 0.3,
            ..EstimatorConfig::default()
        };
        let result = estimate(&ctx, &lenient).unwrap();
        assert_eq!(result.consensus_value, 13_000);
        assert!(result.adjustment_reason.is_none());
    }

    #[test]
    fn user_classification_drives_gridded_correction() {
        let zone = zone();
        let raster = gridded(13_000.0, None);
        let user = UserClassification {
            density: DensityCategory::VeryHighDensityUrban,
            settlement_type: Some(SettlementType::Informal),
            socio_economic: SocioEconomicLevel::Low,
        };
        let mut ctx = EstimationContext::new(&zone, 1.0);
        ctx.gridded = Some(&raster);
        ctx.user = Some(&user);

        let result = PopulationEstimator::default().estimate(&ctx).unwrap();
        assert_eq!(result.consensus_value, 21_450);
        assert!(
            result
                .estimate_for(EstimationMethod::UserClassification)
                .is_some()
        );
    }

    #[test]
    fn very_high_density_lowers_confidence() {
        let config = EstimatorConfig::default();
        let dense = config.gridded_confidence_score(
            DensityCategory::VeryHighDensityUrban,
            Some(0.4),
            true,
        );
        assert!((dense - 0.82).abs() < 1e-9);
        let floor =
            config.gridded_confidence_score(DensityCategory::VeryHighDensityUrban, None, false);
        assert!((floor - 0.75).abs() < 1e-9);
    }

    #[test]
    fn zero_gridded_falls_back_to_buildings() {
        let zone = zone();
        let raster = gridded(0.0, None);
        let buildings = footprints(100_000.0);
        let mut ctx = EstimationContext::new(&zone, 1.0);
        ctx.gridded = Some(&raster);
        ctx.buildings = Some(&buildings);

        let result = PopulationEstimator::default().estimate(&ctx).unwrap();
        assert_eq!(result.primary_method, EstimationMethod::BuildingFootprint);
        assert_eq!(result.consensus_value, 5_150);
        assert_eq!(result.attempts.len(), 2);
    }

    #[test]
    fn stored_estimate_precedes_area_fallback() {
        let mut zone = zone();
        zone.set_estimated_population(4_200);
        let ctx = EstimationContext::new(&zone, 1.0);

        let result = PopulationEstimator::default().estimate(&ctx).unwrap();
        assert_eq!(result.primary_method, EstimationMethod::StoredEstimate);
        assert_eq!(result.consensus_value, 4_200);
        assert_eq!(result.confidence_level, Confidence::Low);
    }

    #[test]
    fn fallback_is_flagged_low_confidence() {
        let zone = zone();
        let ctx = EstimationContext::new(&zone, 0.8);

        let result = PopulationEstimator::default().estimate(&ctx).unwrap();
        assert_eq!(result.primary_method, EstimationMethod::AreaFallback);
        assert_eq!(result.consensus_value, 1_000);
        assert_eq!(result.confidence_level, Confidence::Low);
    }

    #[test]
    fn population_is_positive_for_any_positive_area() {
        let zone = zone();
        for area in [1e-9, 1e-4, 0.37, 12.0, 480.0] {
            let ctx = EstimationContext::new(&zone, area);
            let result = PopulationEstimator::default().estimate(&ctx).unwrap();
            assert!(result.consensus_value > 0, "area {area}");
        }
    }

    #[test]
    fn zero_area_is_terminal() {
        let zone = zone();
        for area in [0.0, -1.0, f64::NAN] {
            let ctx = EstimationContext::new(&zone, area);
            assert!(matches!(
                PopulationEstimator::default().estimate(&ctx),
                Err(EstimationError::NoPopulationData { .. })
            ));
        }
    }
}
