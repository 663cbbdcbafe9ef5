//! Individual population estimation methods.
//!
//! Each strategy either produces a positive [`PopulationEstimate`] or says
//! why it could not. Strategies never panic and never return zero.

use lusaka_waste_population_models::{EstimationMethod, PopulationEstimate};
use lusaka_waste_zone_models::{Confidence, DensityCategory};

use crate::correction::{density_correction, socio_economic_adjustment, user_correction};
use crate::{EstimationContext, EstimatorConfig};

/// Why a strategy produced no estimate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    /// The input this strategy needs is missing.
    #[error("{0}")]
    Unavailable(String),

    /// The input exists but yields no residents.
    #[error("{0} yields zero population")]
    ZeroResult(String),
}

/// A single population estimation method.
pub trait EstimationStrategy: Send + Sync {
    /// The method this strategy implements.
    fn method(&self) -> EstimationMethod;

    /// Attempts an estimate.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] when the strategy's inputs are missing or
    /// produce no residents.
    fn attempt(
        &self,
        ctx: &EstimationContext<'_>,
        config: &EstimatorConfig,
    ) -> Result<PopulationEstimate, StrategyError>;
}

/// Density-corrected gridded population sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct GriddedPopulationStrategy;

impl EstimationStrategy for GriddedPopulationStrategy {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::GriddedPopulation
    }

    fn attempt(
        &self,
        ctx: &EstimationContext<'_>,
        _config: &EstimatorConfig,
    ) -> Result<PopulationEstimate, StrategyError> {
        let gridded = ctx.gridded.ok_or_else(|| {
            StrategyError::Unavailable("no gridded population raster".to_string())
        })?;
        if gridded.total_population.is_nan() || gridded.total_population <= 0.0 {
            return Err(StrategyError::ZeroResult(format!(
                "gridded population raster ({})",
                gridded.year
            )));
        }

        let raw_density = gridded.total_population / ctx.area_sqkm;
        let (factor, correction) = ctx.user.map_or_else(
            || {
                let category = DensityCategory::from_density(raw_density);
                (density_correction(category), category.label().to_string())
            },
            |user| {
                (
                    user_correction(user, Some(raw_density)),
                    format!("user-declared {}", user.density.label()),
                )
            },
        );

        Ok(build_estimate(
            self.method(),
            gridded.total_population * factor,
            ctx.area_sqkm,
            Confidence::High,
            format!(
                "Gridded population {} over {} pixels, x{factor:.2} {correction} correction",
                gridded.year, gridded.pixel_count
            ),
            factor,
        ))
    }
}

/// Floor area × settlement occupancy.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildingFootprintStrategy;

impl EstimationStrategy for BuildingFootprintStrategy {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::BuildingFootprint
    }

    fn attempt(
        &self,
        ctx: &EstimationContext<'_>,
        config: &EstimatorConfig,
    ) -> Result<PopulationEstimate, StrategyError> {
        let buildings = ctx
            .buildings
            .ok_or_else(|| StrategyError::Unavailable("no building footprints".to_string()))?;
        let floor_area = buildings.total_floor_area_sqm();
        if buildings.is_empty() || floor_area.is_nan() || floor_area <= 0.0 {
            return Err(StrategyError::ZeroResult(format!(
                "{} footprints",
                buildings.dataset
            )));
        }

        let settlement = ctx.settlement_type();
        let occupancy = config.occupancy_per_100_sqm(settlement);

        Ok(build_estimate(
            self.method(),
            floor_area * occupancy / 100.0,
            ctx.area_sqkm,
            Confidence::Medium,
            format!(
                "{} buildings ({}), {floor_area:.0} m2 floor area at {occupancy} people/100 m2 ({settlement})",
                buildings.count, buildings.dataset
            ),
            1.0,
        ))
    }
}

/// User-declared density bucket × zone area.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserClassificationStrategy;

impl EstimationStrategy for UserClassificationStrategy {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::UserClassification
    }

    fn attempt(
        &self,
        ctx: &EstimationContext<'_>,
        _config: &EstimatorConfig,
    ) -> Result<PopulationEstimate, StrategyError> {
        let user = ctx
            .user
            .ok_or_else(|| StrategyError::Unavailable("no user classification".to_string()))?;
        let factor = socio_economic_adjustment(user.socio_economic);
        let density = user.density.representative_density();

        Ok(build_estimate(
            self.method(),
            ctx.area_sqkm * density * factor,
            ctx.area_sqkm,
            Confidence::Medium,
            format!(
                "User classification: {} ({density:.0}/km2), {} income",
                user.density.label(),
                user.socio_economic
            ),
            factor,
        ))
    }
}

/// Population previously stored on the zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredEstimateStrategy;

impl EstimationStrategy for StoredEstimateStrategy {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::StoredEstimate
    }

    #[allow(clippy::cast_precision_loss)]
    fn attempt(
        &self,
        ctx: &EstimationContext<'_>,
        _config: &EstimatorConfig,
    ) -> Result<PopulationEstimate, StrategyError> {
        match ctx.zone.estimated_population {
            None => Err(StrategyError::Unavailable(
                "zone has no stored population".to_string(),
            )),
            Some(0) => Err(StrategyError::ZeroResult("stored population".to_string())),
            Some(stored) => Ok(build_estimate(
                self.method(),
                stored as f64,
                ctx.area_sqkm,
                Confidence::Low,
                "Previously stored zone estimate".to_string(),
                1.0,
            )),
        }
    }
}

/// Last resort: area × conservative density. Always succeeds for a zone
/// with positive area.
#[derive(Debug, Clone, Copy, Default)]
pub struct AreaFallbackStrategy;

impl EstimationStrategy for AreaFallbackStrategy {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::AreaFallback
    }

    fn attempt(
        &self,
        ctx: &EstimationContext<'_>,
        config: &EstimatorConfig,
    ) -> Result<PopulationEstimate, StrategyError> {
        let density = config.fallback_density_per_sqkm;
        Ok(build_estimate(
            self.method(),
            ctx.area_sqkm * density,
            ctx.area_sqkm,
            Confidence::Low,
            format!("Area-based fallback at {density:.0}/km2"),
            1.0,
        ))
    }
}

/// Rounds a raw figure to whole residents, never below one.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_population(raw: f64) -> u64 {
    if raw.is_finite() && raw > 0.0 {
        (raw.round() as u64).max(1)
    } else {
        1
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn build_estimate(
    method: EstimationMethod,
    raw: f64,
    area_sqkm: f64,
    confidence: Confidence,
    source: String,
    correction_factor: f64,
) -> PopulationEstimate {
    let value = round_population(raw);
    let density_per_sqkm = value as f64 / area_sqkm;
    PopulationEstimate {
        method,
        value,
        density_per_sqkm,
        density_category: DensityCategory::from_density(density_per_sqkm),
        confidence,
        source,
        correction_factor,
    }
}

#[cfg(test)]
mod tests {
    use lusaka_waste_population_models::{SocioEconomicLevel, UserClassification};
    use lusaka_waste_provider_models::{AreaStatistics, BuildingDataset, BuildingSummary};
    use lusaka_waste_zone_models::{SettlementType, Zone};

    use super::*;

    fn zone() -> Zone {
        Zone::new("z1", vec![])
    }

    fn footprints(sum: f64) -> BuildingSummary {
        BuildingSummary {
            dataset: BuildingDataset::OpenBuildings,
            count: 1_000,
            area_statistics: AreaStatistics {
                mean: sum / 1_000.0,
                stddev: 20.0,
                min: 10.0,
                max: 400.0,
                sum,
            },
            height_statistics: None,
            confidence_threshold: 0.75,
        }
    }

    #[test]
    fn building_estimate_uses_settlement_occupancy() {
        let zone = zone();
        let buildings = footprints(100_000.0);
        let config = EstimatorConfig::default();

        let mut ctx = EstimationContext::new(&zone, 1.0);
        ctx.buildings = Some(&buildings);

        ctx.inferred_settlement = Some(SettlementType::Formal);
        let formal = BuildingFootprintStrategy.attempt(&ctx, &config).unwrap();
        assert_eq!(formal.value, 4_100);

        ctx.inferred_settlement = Some(SettlementType::Informal);
        let informal = BuildingFootprintStrategy.attempt(&ctx, &config).unwrap();
        assert_eq!(informal.value, 6_200);

        ctx.inferred_settlement = None;
        let unknown = BuildingFootprintStrategy.attempt(&ctx, &config).unwrap();
        assert_eq!(unknown.value, 5_150);
    }

    #[test]
    fn user_settlement_type_overrides_inferred() {
        let zone = zone();
        let buildings = footprints(100_000.0);
        let user = UserClassification {
            density: DensityCategory::HighDensityUrban,
            settlement_type: Some(SettlementType::Informal),
            socio_economic: SocioEconomicLevel::Middle,
        };

        let mut ctx = EstimationContext::new(&zone, 1.0);
        ctx.buildings = Some(&buildings);
        ctx.inferred_settlement = Some(SettlementType::Formal);
        ctx.user = Some(&user);

        let estimate = BuildingFootprintStrategy
            .attempt(&ctx, &EstimatorConfig::default())
            .unwrap();
        assert_eq!(estimate.value, 6_200);
    }

    #[test]
    fn empty_footprints_are_a_zero_result() {
        let zone = zone();
        let mut buildings = footprints(0.0);
        buildings.count = 0;
        let mut ctx = EstimationContext::new(&zone, 1.0);
        ctx.buildings = Some(&buildings);

        assert!(matches!(
            BuildingFootprintStrategy.attempt(&ctx, &EstimatorConfig::default()),
            Err(StrategyError::ZeroResult(_))
        ));
    }

    #[test]
    fn user_classification_scales_representative_density() {
        let zone = zone();
        let user = UserClassification {
            density: DensityCategory::MediumDensityUrban,
            settlement_type: None,
            socio_economic: SocioEconomicLevel::High,
        };
        let mut ctx = EstimationContext::new(&zone, 2.0);
        ctx.user = Some(&user);

        let estimate = UserClassificationStrategy
            .attempt(&ctx, &EstimatorConfig::default())
            .unwrap();
        assert_eq!(estimate.value, 12_350);
    }

    #[test]
    fn stored_zero_is_skipped() {
        let mut zone = zone();
        zone.set_estimated_population(0);
        let ctx = EstimationContext::new(&zone, 1.0);
        assert!(matches!(
            StoredEstimateStrategy.attempt(&ctx, &EstimatorConfig::default()),
            Err(StrategyError::ZeroResult(_))
        ));
    }

    #[test]
    fn rounding_never_returns_zero() {
        assert_eq!(round_population(0.0004), 1);
        assert_eq!(round_population(f64::NAN), 1);
        assert_eq!(round_population(2.5), 3);
    }
}
