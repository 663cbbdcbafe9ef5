#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tonnage billing.
//!
//! Weight is billed in whole tonnes, rounded up. The per-tonne rate
//! depends on the customer's company type code; for the tiered type the
//! tier is chosen from the total tonnage and applied to every tonne, not
//! marginally. Recycling collections are never charged.

use lusaka_waste_waste_models::{CollectionRequirement, WasteGenerationResult};
use serde::{Deserialize, Serialize};

/// Company type billed nothing.
pub const FREE_COMPANY_TYPE: u8 = 8;

/// Company type billed a flat low rate.
pub const FLAT_RATE_COMPANY_TYPE: u8 = 7;

/// Company type billed by tonnage tier.
pub const TIERED_COMPANY_TYPE: u8 = 6;

/// Low rate, kwacha per tonne.
pub const LOW_RATE: f64 = 50.0;

/// Middle tier rate, kwacha per tonne.
pub const MIDDLE_RATE: f64 = 100.0;

/// Standard rate, kwacha per tonne.
pub const STANDARD_RATE: f64 = 150.0;

/// Label for recycling collections.
pub const RECYCLE_LABEL: &str = "Recycle (No Charge)";

/// Errors from billing calculations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BillingError {
    /// Weight is negative or not finite.
    #[error("Invalid weight: {weight_kg} kg")]
    InvalidWeight {
        /// The rejected weight.
        weight_kg: f64,
    },
}

/// A priced collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonnageCharge {
    /// Billable tonnes (rounded up).
    pub tonnes: u64,
    /// Kwacha per tonne.
    pub rate_per_tonne: f64,
    /// Total charge in kwacha.
    pub amount: f64,
    /// Tariff description.
    pub label: String,
}

/// Whole tonnes billed for `weight_kg`, rounded up.
///
/// # Errors
///
/// Returns [`BillingError::InvalidWeight`] for negative or non-finite
/// weights.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn billable_tonnes(weight_kg: f64) -> Result<u64, BillingError> {
    if !weight_kg.is_finite() || weight_kg < 0.0 {
        return Err(BillingError::InvalidWeight { weight_kg });
    }
    Ok((weight_kg / 1_000.0).ceil() as u64)
}

fn tariff(tonnes: u64, company_type: u8) -> (f64, String) {
    match company_type {
        FREE_COMPANY_TYPE => (0.0, "Free (Company Type 8)".to_string()),
        FLAT_RATE_COMPANY_TYPE => (LOW_RATE, format!("Flat Rate K{LOW_RATE:.0}/tonne")),
        TIERED_COMPANY_TYPE => match tonnes {
            0..=5 => (LOW_RATE, "Tier 1 (0-5 tonnes)".to_string()),
            6..=10 => (MIDDLE_RATE, "Tier 2 (5-10 tonnes)".to_string()),
            _ => (STANDARD_RATE, "Tier 3 (above 10 tonnes)".to_string()),
        },
        _ => (
            STANDARD_RATE,
            format!("Standard Rate K{STANDARD_RATE:.0}/tonne"),
        ),
    }
}

/// Prices one collection.
///
/// # Errors
///
/// Returns [`BillingError::InvalidWeight`] for negative or non-finite
/// weights.
#[allow(clippy::cast_precision_loss)]
pub fn calculate_tiered_pricing(
    weight_kg: f64,
    company_type: u8,
    is_recycle: bool,
) -> Result<TonnageCharge, BillingError> {
    let tonnes = billable_tonnes(weight_kg)?;

    if is_recycle {
        return Ok(TonnageCharge {
            tonnes,
            rate_per_tonne: 0.0,
            amount: 0.0,
            label: RECYCLE_LABEL.to_string(),
        });
    }

    let (rate_per_tonne, label) = tariff(tonnes, company_type);
    Ok(TonnageCharge {
        tonnes,
        rate_per_tonne,
        amount: tonnes as f64 * rate_per_tonne,
        label,
    })
}

/// Revenue expected from servicing a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueProjection {
    /// Company type code the projection was priced at.
    pub company_type: u8,
    /// Charge for one collection.
    pub per_collection: TonnageCharge,
    /// Collections in an average month.
    pub collections_per_month: f64,
    /// Monthly revenue in kwacha.
    pub monthly_revenue: f64,
    /// Annual revenue in kwacha.
    pub annual_revenue: f64,
    /// Monthly charge per household, when the household count is known.
    pub monthly_charge_per_household: Option<f64>,
}

/// Projects revenue from a zone's collection schedule.
///
/// # Errors
///
/// Returns [`BillingError::InvalidWeight`] if the per-collection mass is
/// negative or not finite.
pub fn project_revenue(
    waste: &WasteGenerationResult,
    requirement: &CollectionRequirement,
    company_type: u8,
    household_count: Option<u32>,
) -> Result<RevenueProjection, BillingError> {
    let per_collection =
        calculate_tiered_pricing(requirement.waste_per_collection_kg, company_type, false)?;
    let collections_per_month = f64::from(requirement.frequency_per_week) * 52.0 / 12.0;
    let monthly_revenue = per_collection.amount * collections_per_month;
    let monthly_charge_per_household = household_count
        .filter(|n| *n > 0)
        .map(|n| monthly_revenue / f64::from(n));

    log::debug!(
        "Revenue: {} t per collection ({}) for {:.0} kg/day, K{monthly_revenue:.2}/month",
        per_collection.tonnes,
        per_collection.label,
        waste.daily_kg
    );

    Ok(RevenueProjection {
        company_type,
        per_collection,
        collections_per_month,
        monthly_revenue,
        annual_revenue: monthly_revenue * 12.0,
        monthly_charge_per_household,
    })
}

#[cfg(test)]
mod tests {
    use lusaka_waste_waste_models::{
        CollectionFrequency, Season, WasteComposition, WasteMultipliers,
    };
    use lusaka_waste_zone_models::{DensityCategory, SettlementType, ZoneType};

    use super::*;

    #[test]
    fn tier_boundaries_round_up() {
        let below = calculate_tiered_pricing(4_999.0, 6, false).unwrap();
        assert_eq!(below.tonnes, 5);
        assert!((below.rate_per_tonne - 50.0).abs() < f64::EPSILON);
        assert!((below.amount - 250.0).abs() < f64::EPSILON);

        let above = calculate_tiered_pricing(5_001.0, 6, false).unwrap();
        assert_eq!(above.tonnes, 6);
        assert!((above.rate_per_tonne - 100.0).abs() < f64::EPSILON);
        assert!((above.amount - 600.0).abs() < f64::EPSILON);

        let top = calculate_tiered_pricing(10_500.0, 6, false).unwrap();
        assert_eq!(top.tonnes, 11);
        assert!((top.amount - 1_650.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tiered_rate_never_decreases() {
        let mut previous = 0.0;
        for kg in (0..=30).map(|t| f64::from(t) * 500.0) {
            let charge = calculate_tiered_pricing(kg, 6, false).unwrap();
            assert!(charge.rate_per_tonne >= previous);
            previous = charge.rate_per_tonne;
        }
    }

    #[test]
    fn recycling_is_always_free() {
        for company_type in 0..=10 {
            for kg in [0.0, 1.0, 4_999.0, 25_000.0] {
                let charge = calculate_tiered_pricing(kg, company_type, true).unwrap();
                assert!(charge.amount.abs() < f64::EPSILON);
                assert!(charge.rate_per_tonne.abs() < f64::EPSILON);
                assert_eq!(charge.label, RECYCLE_LABEL);
            }
        }
    }

    #[test]
    fn company_type_rates() {
        assert!(calculate_tiered_pricing(3_000.0, 8, false).unwrap().amount.abs() < f64::EPSILON);
        assert!((calculate_tiered_pricing(3_000.0, 7, false).unwrap().amount - 150.0).abs() < 1e-9);
        assert!((calculate_tiered_pricing(3_000.0, 2, false).unwrap().amount - 450.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_invalid_weight() {
        assert!(calculate_tiered_pricing(-1.0, 6, false).is_err());
        assert!(calculate_tiered_pricing(f64::NAN, 6, true).is_err());
    }

    #[test]
    fn projects_monthly_and_household_revenue() {
        let waste = WasteGenerationResult {
            population: 10_000,
            per_capita_kg_per_day: 0.5,
            season: Some(Season::Dry),
            daily_kg: 5_000.0,
            weekly_kg: 35_000.0,
            monthly_kg: 150_000.0,
            annual_tonnes: 1_825.0,
            dry_season_daily_kg: 5_000.0,
            wet_season_daily_kg: 4_000.0,
            annual_average_daily_kg: 4_500.0,
            seasonal_variation_percent: 22.2,
            composition: WasteComposition {
                organic: 50.0,
                plastic: 15.0,
                paper: 12.0,
                metal: 4.0,
                glass: 4.0,
                other: 15.0,
            },
            multipliers: WasteMultipliers {
                density_category: DensityCategory::MediumDensityUrban,
                density: 1.0,
                zone_type: ZoneType::Residential,
                zone: 1.0,
                settlement_type: SettlementType::Formal,
                settlement: 1.0,
                built_up: 1.0,
            },
        };
        let requirement = CollectionRequirement {
            frequency_per_week: 3,
            waste_per_collection_kg: 35_000.0 / 3.0,
            collection_points: 10,
            trucks_10t: 2,
            trucks_20t: 1,
            staff_required: 5,
            staff_required_20t: 3,
            recommended_frequency: CollectionFrequency::EveryTwoDays,
        };

        let projection = project_revenue(&waste, &requirement, 6, Some(2_000)).unwrap();
        assert_eq!(projection.per_collection.tonnes, 12);
        assert!((projection.per_collection.amount - 1_800.0).abs() < 1e-9);
        assert!((projection.collections_per_month - 13.0).abs() < 1e-9);
        assert!((projection.monthly_revenue - 23_400.0).abs() < 1e-6);
        assert!((projection.annual_revenue - 280_800.0).abs() < 1e-6);
        assert!((projection.monthly_charge_per_household.unwrap() - 11.7).abs() < 1e-9);

        let unknown = project_revenue(&waste, &requirement, 6, None).unwrap();
        assert!(unknown.monthly_charge_per_household.is_none());
    }
}
