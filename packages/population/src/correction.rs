//! Multipliers applied to raw gridded population sums.
//!
//! Gridded rasters under-count dense informal settlements. The measured
//! density picks a correction from [`density_correction`] unless the user
//! has classified the zone, in which case [`user_correction`] applies.

use lusaka_waste_population_models::{SocioEconomicLevel, UserClassification};
use lusaka_waste_zone_models::DensityCategory;

/// Measured density above which a user-declared very-high-density zone
/// receives the stronger correction.
pub const USER_VERY_HIGH_DENSITY_THRESHOLD: f64 = 12_000.0;

/// Correction for a category derived from measured density.
#[must_use]
pub const fn density_correction(category: DensityCategory) -> f64 {
    match category {
        DensityCategory::VeryHighDensityUrban => 1.4,
        DensityCategory::HighDensityUrban => 1.3,
        DensityCategory::MediumDensityUrban => 1.2,
        DensityCategory::LowDensityUrban => 1.1,
        DensityCategory::PeriUrban => 1.05,
        DensityCategory::Rural => 1.0,
    }
}

/// Household-size adjustment for a socio-economic level.
#[must_use]
pub const fn socio_economic_adjustment(level: SocioEconomicLevel) -> f64 {
    match level {
        SocioEconomicLevel::Low => 1.10,
        SocioEconomicLevel::Middle => 1.0,
        SocioEconomicLevel::High => 0.95,
    }
}

/// Correction for a user-classified zone.
///
/// `measured_density` is the raw gridded density, when there is one.
#[must_use]
pub fn user_correction(user: &UserClassification, measured_density: Option<f64>) -> f64 {
    let bucket = match user.density {
        DensityCategory::VeryHighDensityUrban
            if measured_density.is_some_and(|d| d > USER_VERY_HIGH_DENSITY_THRESHOLD) =>
        {
            1.5
        }
        category => density_correction(category),
    };
    bucket * socio_economic_adjustment(user.socio_economic)
}
