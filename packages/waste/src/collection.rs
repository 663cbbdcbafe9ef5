//! Collection fleet sizing.
//!
//! Each truck class is sized independently: the mass lifted per
//! collection divided by usable capacity (capacity × efficiency), rounded
//! up. Two crew per truck plus one supervisor per five trucks.

use std::ops::RangeInclusive;

use lusaka_waste_waste_models::{
    CollectionFrequency, CollectionRequirement, WasteGenerationResult,
};

use crate::{WasteConfig, WasteError};

/// Accepted collections per week.
pub const FREQUENCY_PER_WEEK: RangeInclusive<u8> = 1..=7;

/// Trucks supervised by one supervisor.
pub const TRUCKS_PER_SUPERVISOR: u32 = 5;

/// Crew members per truck.
pub const CREW_PER_TRUCK: u32 = 2;

/// Trucks of `capacity_kg` needed to lift `waste_kg` at `efficiency`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn trucks_needed(waste_kg: f64, capacity_kg: f64, efficiency: f64) -> u32 {
    let usable = capacity_kg * efficiency;
    if waste_kg.is_nan() || usable.is_nan() || waste_kg <= 0.0 || usable <= 0.0 {
        return 0;
    }
    (waste_kg / usable).ceil() as u32
}

/// Crew plus supervisors for `trucks`.
#[must_use]
pub const fn staff_for(trucks: u32) -> u32 {
    trucks * CREW_PER_TRUCK + trucks.div_ceil(TRUCKS_PER_SUPERVISOR)
}

/// Fleet, staffing and collection points for a waste result.
///
/// # Errors
///
/// Returns [`WasteError::InvalidFrequency`] unless
/// `1 <= frequency_per_week <= 7`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn collection_requirements(
    result: &WasteGenerationResult,
    frequency_per_week: u8,
    config: &WasteConfig,
) -> Result<CollectionRequirement, WasteError> {
    if !FREQUENCY_PER_WEEK.contains(&frequency_per_week) {
        return Err(WasteError::InvalidFrequency {
            frequency: frequency_per_week,
        });
    }

    let waste_per_collection_kg = result.weekly_kg / f64::from(frequency_per_week);
    let efficiency = config.collection_efficiency;
    let trucks_10t = trucks_needed(
        waste_per_collection_kg,
        config.small_truck_capacity_kg,
        efficiency,
    );
    let trucks_20t = trucks_needed(
        waste_per_collection_kg,
        config.large_truck_capacity_kg,
        efficiency,
    );

    let collection_points = if result.daily_kg > 0.0 && config.collection_point_capacity_kg > 0.0
    {
        (result.daily_kg / config.collection_point_capacity_kg).ceil() as u32
    } else {
        0
    };

    Ok(CollectionRequirement {
        frequency_per_week,
        waste_per_collection_kg,
        collection_points,
        trucks_10t,
        trucks_20t,
        staff_required: staff_for(trucks_10t),
        staff_required_20t: staff_for(trucks_20t),
        recommended_frequency: CollectionFrequency::for_density(
            result.multipliers.density_category,
        ),
    })
}
