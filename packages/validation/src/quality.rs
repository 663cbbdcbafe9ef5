//! Completeness and plausibility of a zone's inputs and outputs.

use lusaka_waste_waste_models::WasteGenerationResult;
use serde::{Deserialize, Serialize};

/// Realistic per-capita generation band (kg/person/day).
pub const PER_CAPITA_RANGE: (f64, f64) = (0.1, 2.0);

/// Highest plausible residential density (people/km²).
pub const MAX_PLAUSIBLE_DENSITY: f64 = 60_000.0;

const REQUIRED_WEIGHT: f64 = 0.7;
const OPTIONAL_WEIGHT: f64 = 0.3;

/// Which inputs were available for a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAvailability {
    /// Gridded population for the analysis year.
    pub gridded_population: bool,
    /// Primary building footprints.
    pub primary_buildings: bool,
    /// Secondary building footprints.
    pub secondary_buildings: bool,
    /// Building heights.
    pub building_heights: bool,
    /// Land-cover indices.
    pub land_cover: bool,
    /// Household count on the zone.
    pub household_count: bool,
    /// Business count on the zone.
    pub business_count: bool,
    /// User settlement classification.
    pub user_classification: bool,
}

impl DataAvailability {
    /// Weighted share of available fields, 0-100.
    ///
    /// Gridded population and primary footprints are required; the rest
    /// are optional and weigh less.
    #[must_use]
    pub fn completeness_score(&self) -> f64 {
        let required = [self.gridded_population, self.primary_buildings];
        let optional = [
            self.secondary_buildings,
            self.building_heights,
            self.land_cover,
            self.household_count,
            self.business_count,
            self.user_classification,
        ];
        (share(&required) * REQUIRED_WEIGHT + share(&optional) * OPTIONAL_WEIGHT) * 100.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn share(flags: &[bool]) -> f64 {
    flags.iter().filter(|f| **f).count() as f64 / flags.len() as f64
}

/// One named plausibility check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlausibilityCheck {
    /// Check name.
    pub name: String,
    /// Whether it passed.
    pub passed: bool,
    /// Observed value or explanation.
    pub detail: String,
}

/// Runs plausibility checks on a zone's waste result and density.
#[must_use]
pub fn plausibility_checks(
    waste: Option<&WasteGenerationResult>,
    density_per_sqkm: Option<f64>,
) -> Vec<PlausibilityCheck> {
    let mut checks = Vec::new();

    if let Some(waste) = waste {
        let total = waste.composition.total();
        checks.push(PlausibilityCheck {
            name: "composition_sum".to_string(),
            passed: waste.composition.is_valid(),
            detail: format!("{total:.1}%"),
        });

        let per_capita = waste.seasonal_per_capita_kg();
        let (low, high) = PER_CAPITA_RANGE;
        checks.push(PlausibilityCheck {
            name: "per_capita_rate".to_string(),
            passed: (low..=high).contains(&per_capita),
            detail: format!("{per_capita:.3} kg/person/day"),
        });

        checks.push(PlausibilityCheck {
            name: "non_negative_mass".to_string(),
            passed: waste.daily_kg >= 0.0 && waste.annual_tonnes >= 0.0,
            detail: format!("{:.1} kg/day", waste.daily_kg),
        });
    }

    if let Some(density) = density_per_sqkm {
        checks.push(PlausibilityCheck {
            name: "population_density".to_string(),
            passed: density > 0.0 && density <= MAX_PLAUSIBLE_DENSITY,
            detail: format!("{density:.0}/km2"),
        });
    }

    checks
}

/// Share of passed checks, 0-100. No checks scores zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn plausibility_score(checks: &[PlausibilityCheck]) -> f64 {
    if checks.is_empty() {
        return 0.0;
    }
    checks.iter().filter(|c| c.passed).count() as f64 / checks.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use lusaka_waste_waste_models::{Season, WasteComposition, WasteMultipliers};

    use super::*;

    fn waste(population: u64, daily_kg: f64) -> WasteGenerationResult {
        WasteGenerationResult {
            population,
            per_capita_kg_per_day: 0.5,
            season: Some(Season::Wet),
            daily_kg,
            weekly_kg: daily_kg * 7.0,
            monthly_kg: daily_kg * 30.0,
            annual_tonnes: daily_kg * 0.365,
            dry_season_daily_kg: daily_kg,
            wet_season_daily_kg: daily_kg,
            annual_average_daily_kg: daily_kg,
            seasonal_variation_percent: 0.0,
            composition: WasteComposition {
                organic: 60.0,
                plastic: 12.0,
                paper: 8.0,
                metal: 3.0,
                glass: 2.0,
                other: 15.0,
            },
            multipliers: WasteMultipliers {
                density_category: lusaka_waste_zone_models::DensityCategory::HighDensityUrban,
                density: 1.1,
                zone_type: lusaka_waste_zone_models::ZoneType::Residential,
                zone: 1.0,
                settlement_type: lusaka_waste_zone_models::SettlementType::Informal,
                settlement: 0.9,
                built_up: 1.0,
            },
        }
    }

    #[test]
    fn completeness_weights_required_fields() {
        let nothing = DataAvailability::default();
        assert!(nothing.completeness_score().abs() < f64::EPSILON);

        let required_only = DataAvailability {
            gridded_population: true,
            primary_buildings: true,
            ..DataAvailability::default()
        };
        assert!((required_only.completeness_score() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn flags_implausible_rates() {
        let checks = plausibility_checks(Some(&waste(1_000, 500.0)), Some(8_000.0));
        assert_eq!(checks.len(), 4);
        assert!((plausibility_score(&checks) - 100.0).abs() < 1e-9);

        let checks = plausibility_checks(Some(&waste(1_000, 5_000.0)), Some(90_000.0));
        assert!((plausibility_score(&checks) - 50.0).abs() < 1e-9);
        assert!(
            checks
                .iter()
                .any(|c| c.name == "per_capita_rate" && !c.passed)
        );
    }

    #[test]
    fn no_checks_scores_zero() {
        assert!(plausibility_score(&plausibility_checks(None, None)).abs() < f64::EPSILON);
    }
}
