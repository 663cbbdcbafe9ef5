#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Waste generation model.
//!
//! Daily mass starts from a base per-capita rate, scaled by multipliers
//! for density category, zone type, settlement type and built-up
//! intensity, then by a dry or wet season factor. Collection fleet sizing
//! lives in [`collection`].

pub mod collection;
pub mod composition;

use chrono::NaiveDate;
use lusaka_waste_waste_models::{Season, WasteGenerationResult, WasteMultipliers};
use lusaka_waste_zone_models::{DensityCategory, SettlementType, ZoneType};
use serde::{Deserialize, Serialize};

pub use collection::collection_requirements;

/// Errors from the waste model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WasteError {
    /// Collections per week must be between 1 and 7.
    #[error("Invalid collection frequency: {frequency} per week (expected 1-7)")]
    InvalidFrequency {
        /// The rejected frequency.
        frequency: u8,
    },

    /// A configured rate or multiplier is negative or not finite.
    #[error("Invalid waste model parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// Waste model constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct WasteConfig {
    /// Base generation rate (kg per person per day).
    pub base_rate_kg_per_capita_day: f64,
    /// Dry season (May-October) multiplier.
    pub dry_season_multiplier: f64,
    /// Wet season (November-April) multiplier.
    pub wet_season_multiplier: f64,
    /// Share of truck capacity usable per trip.
    pub collection_efficiency: f64,
    /// Small truck class capacity.
    pub small_truck_capacity_kg: f64,
    /// Large truck class capacity.
    pub large_truck_capacity_kg: f64,
    /// Daily mass one communal collection point holds.
    pub collection_point_capacity_kg: f64,
}

impl Default for WasteConfig {
    fn default() -> Self {
        Self {
            base_rate_kg_per_capita_day: 0.5,
            dry_season_multiplier: 1.15,
            wet_season_multiplier: 0.92,
            collection_efficiency: 0.85,
            small_truck_capacity_kg: 10_000.0,
            large_truck_capacity_kg: 20_000.0,
            collection_point_capacity_kg: 500.0,
        }
    }
}

impl WasteConfig {
    /// Multiplier for `season`.
    #[must_use]
    pub const fn season_multiplier(&self, season: Season) -> f64 {
        match season {
            Season::Dry => self.dry_season_multiplier,
            Season::Wet => self.wet_season_multiplier,
        }
    }

    fn validate(&self) -> Result<(), WasteError> {
        for (name, value) in [
            ("base_rate_kg_per_capita_day", self.base_rate_kg_per_capita_day),
            ("dry_season_multiplier", self.dry_season_multiplier),
            ("wet_season_multiplier", self.wet_season_multiplier),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(WasteError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Per-capita multiplier for a density category.
#[must_use]
pub const fn density_multiplier(category: DensityCategory) -> f64 {
    match category {
        DensityCategory::VeryHighDensityUrban => 1.2,
        DensityCategory::HighDensityUrban => 1.1,
        DensityCategory::MediumDensityUrban => 1.0,
        DensityCategory::LowDensityUrban => 0.9,
        DensityCategory::PeriUrban => 0.8,
        DensityCategory::Rural => 0.7,
    }
}

/// Per-capita multiplier for a zone type.
#[must_use]
pub const fn zone_type_multiplier(zone_type: ZoneType) -> f64 {
    match zone_type {
        ZoneType::Residential => 1.0,
        ZoneType::MixedUse => 1.15,
        ZoneType::Commercial => 1.3,
        ZoneType::Industrial => 1.5,
    }
}

/// Per-capita multiplier for a settlement type.
#[must_use]
pub const fn settlement_multiplier(settlement: SettlementType) -> f64 {
    match settlement {
        SettlementType::Formal => 1.0,
        SettlementType::Mixed => 0.95,
        SettlementType::Informal => 0.9,
    }
}

/// Multiplier for built-up intensity.
///
/// More than half the zone built up or over 100 buildings per hectare
/// gives x1.25; over 30% or 50 per hectare gives x1.10.
#[must_use]
pub fn built_up_multiplier(built_up_ratio: Option<f64>, buildings_per_hectare: Option<f64>) -> f64 {
    let ratio = built_up_ratio.unwrap_or(0.0);
    let per_hectare = buildings_per_hectare.unwrap_or(0.0);
    if ratio > 0.5 || per_hectare > 100.0 {
        1.25
    } else if ratio > 0.3 || per_hectare > 50.0 {
        1.10
    } else {
        1.0
    }
}

/// Zone characteristics the model is keyed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WasteInputs {
    /// Density category of the population estimate.
    pub density_category: DensityCategory,
    /// Settlement label.
    pub settlement_type: SettlementType,
    /// Zone use.
    pub zone_type: ZoneType,
    /// Built-up share in `[0, 1]`, if known.
    pub built_up_ratio: Option<f64>,
    /// Buildings per hectare, if known.
    pub buildings_per_hectare: Option<f64>,
    /// Analysis date selecting the season. `None` reports annual averages.
    pub date: Option<NaiveDate>,
}

impl WasteInputs {
    /// Inputs with no built-up data and no date.
    #[must_use]
    pub const fn new(
        density_category: DensityCategory,
        settlement_type: SettlementType,
        zone_type: ZoneType,
    ) -> Self {
        Self {
            density_category,
            settlement_type,
            zone_type,
            built_up_ratio: None,
            buildings_per_hectare: None,
            date: None,
        }
    }

    /// Sets the analysis date.
    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets built-up intensity.
    #[must_use]
    pub const fn with_built_up(
        mut self,
        built_up_ratio: Option<f64>,
        buildings_per_hectare: Option<f64>,
    ) -> Self {
        self.built_up_ratio = built_up_ratio;
        self.buildings_per_hectare = buildings_per_hectare;
        self
    }
}

/// Computes daily, weekly, monthly and annual waste mass for a zone.
///
/// # Errors
///
/// Returns [`WasteError::InvalidParameter`] if the configured base rate
/// or a seasonal multiplier is negative or not finite.
#[allow(clippy::cast_precision_loss)]
pub fn generate(
    population: u64,
    inputs: &WasteInputs,
    config: &WasteConfig,
) -> Result<WasteGenerationResult, WasteError> {
    config.validate()?;

    let multipliers = WasteMultipliers {
        density_category: inputs.density_category,
        density: density_multiplier(inputs.density_category),
        zone_type: inputs.zone_type,
        zone: zone_type_multiplier(inputs.zone_type),
        settlement_type: inputs.settlement_type,
        settlement: settlement_multiplier(inputs.settlement_type),
        built_up: built_up_multiplier(inputs.built_up_ratio, inputs.buildings_per_hectare),
    };

    let per_capita_kg_per_day = config.base_rate_kg_per_capita_day * multipliers.combined();
    let base_daily_kg = population as f64 * per_capita_kg_per_day;
    let dry_season_daily_kg = base_daily_kg * config.dry_season_multiplier;
    let wet_season_daily_kg = base_daily_kg * config.wet_season_multiplier;
    let annual_average_daily_kg = f64::midpoint(dry_season_daily_kg, wet_season_daily_kg);

    let season = inputs.date.map(Season::of);
    let daily_kg = season.map_or(annual_average_daily_kg, |s| {
        base_daily_kg * config.season_multiplier(s)
    });

    let seasonal_variation_percent = if annual_average_daily_kg > 0.0 {
        (dry_season_daily_kg - wet_season_daily_kg).abs() / annual_average_daily_kg * 100.0
    } else {
        0.0
    };

    log::debug!(
        "Waste for {population} residents: {per_capita_kg_per_day:.3} kg/person/day, {daily_kg:.0} kg/day ({})",
        season.map_or_else(|| "annual average".to_string(), |s| format!("{s} season"))
    );

    Ok(WasteGenerationResult {
        population,
        per_capita_kg_per_day,
        season,
        daily_kg,
        weekly_kg: daily_kg * 7.0,
        monthly_kg: daily_kg * 30.0,
        annual_tonnes: annual_average_daily_kg * 365.0 / 1_000.0,
        dry_season_daily_kg,
        wet_season_daily_kg,
        annual_average_daily_kg,
        seasonal_variation_percent,
        composition: composition::profile(inputs.density_category),
        multipliers,
    })
}
