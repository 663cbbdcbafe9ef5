#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Waste generation results and the collection requirements derived
//! from them.

use chrono::{Datelike as _, NaiveDate};
use lusaka_waste_zone_models::{DensityCategory, SettlementType, ZoneType};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Allowed deviation of a composition total from 100%.
pub const COMPOSITION_TOLERANCE: f64 = 0.5;

/// Lusaka's two seasons.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Season {
    /// May to October.
    Dry,
    /// November to April.
    Wet,
}

impl Season {
    /// Season for a calendar month (1-12).
    #[must_use]
    pub const fn from_month(month: u32) -> Self {
        if matches!(month, 5..=10) {
            Self::Dry
        } else {
            Self::Wet
        }
    }

    /// Season containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self::from_month(date.month())
    }
}

/// How often a zone should be serviced.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CollectionFrequency {
    /// Seven collections a week.
    Daily,
    /// Every second day.
    EveryTwoDays,
    /// Every third day.
    EveryThreeDays,
}

impl CollectionFrequency {
    /// Daily for high and very-high density, every two days for medium,
    /// every three days otherwise.
    #[must_use]
    pub const fn for_density(category: DensityCategory) -> Self {
        match category {
            DensityCategory::VeryHighDensityUrban | DensityCategory::HighDensityUrban => {
                Self::Daily
            }
            DensityCategory::MediumDensityUrban => Self::EveryTwoDays,
            DensityCategory::LowDensityUrban
            | DensityCategory::PeriUrban
            | DensityCategory::Rural => Self::EveryThreeDays,
        }
    }

    /// Days between collections.
    #[must_use]
    pub const fn interval_days(self) -> u8 {
        match self {
            Self::Daily => 1,
            Self::EveryTwoDays => 2,
            Self::EveryThreeDays => 3,
        }
    }
}

/// Percent share of each waste stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WasteComposition {
    /// Food and garden waste.
    pub organic: f64,
    /// Plastics.
    pub plastic: f64,
    /// Paper and cardboard.
    pub paper: f64,
    /// Metals.
    pub metal: f64,
    /// Glass.
    pub glass: f64,
    /// Everything else.
    pub other: f64,
}

impl WasteComposition {
    /// Sum of all shares.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.organic + self.plastic + self.paper + self.metal + self.glass + self.other
    }

    /// `true` when every share is non-negative and the total is within
    /// [`COMPOSITION_TOLERANCE`] of 100.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.shares().iter().all(|(_, share)| *share >= 0.0)
            && (self.total() - 100.0).abs() <= COMPOSITION_TOLERANCE
    }

    /// Shares keyed by stream name.
    #[must_use]
    pub const fn shares(&self) -> [(&'static str, f64); 6] {
        [
            ("organic", self.organic),
            ("plastic", self.plastic),
            ("paper", self.paper),
            ("metal", self.metal),
            ("glass", self.glass),
            ("other", self.other),
        ]
    }

    /// Splits `total_kg` across the streams.
    #[must_use]
    pub fn split_kg(&self, total_kg: f64) -> [(&'static str, f64); 6] {
        self.shares().map(|(name, share)| (name, total_kg * share / 100.0))
    }
}

/// Multipliers applied on top of the base per-capita rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteMultipliers {
    /// Density category the rate was keyed on.
    pub density_category: DensityCategory,
    /// Density category multiplier.
    pub density: f64,
    /// Zone type the rate was keyed on.
    pub zone_type: ZoneType,
    /// Zone type multiplier.
    pub zone: f64,
    /// Settlement type the rate was keyed on.
    pub settlement_type: SettlementType,
    /// Settlement type multiplier.
    pub settlement: f64,
    /// Built-up / buildings-per-hectare multiplier.
    pub built_up: f64,
}

impl WasteMultipliers {
    /// Product of all multipliers.
    #[must_use]
    pub fn combined(&self) -> f64 {
        self.density * self.zone * self.settlement * self.built_up
    }
}

/// Waste mass flow for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteGenerationResult {
    /// Population the figures are based on.
    pub population: u64,
    /// Adjusted per-capita rate before seasonal scaling.
    pub per_capita_kg_per_day: f64,
    /// Season of the analysis date. `None` when the daily figures are
    /// annual averages.
    pub season: Option<Season>,
    /// Daily mass in the analysis season, or the annual average.
    pub daily_kg: f64,
    /// `daily_kg × 7`.
    pub weekly_kg: f64,
    /// `daily_kg × 30`.
    pub monthly_kg: f64,
    /// Annual tonnes from the annual-average daily mass.
    pub annual_tonnes: f64,
    /// Daily mass in the dry season.
    pub dry_season_daily_kg: f64,
    /// Daily mass in the wet season.
    pub wet_season_daily_kg: f64,
    /// Mean of the two seasonal daily figures.
    pub annual_average_daily_kg: f64,
    /// Dry-wet spread as a percentage of the annual average.
    pub seasonal_variation_percent: f64,
    /// Stream percentages.
    pub composition: WasteComposition,
    /// Multipliers behind `per_capita_kg_per_day`.
    pub multipliers: WasteMultipliers,
}

impl WasteGenerationResult {
    /// Daily mass per capita in the analysis season.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn seasonal_per_capita_kg(&self) -> f64 {
        if self.population == 0 {
            0.0
        } else {
            self.daily_kg / self.population as f64
        }
    }
}

/// Fleet and staffing needed to service a zone.
///
/// Always recomputed from a [`WasteGenerationResult`]; never stored on
/// its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRequirement {
    /// Collections per week the figures assume.
    pub frequency_per_week: u8,
    /// Mass lifted on each collection.
    pub waste_per_collection_kg: f64,
    /// Communal collection points needed.
    pub collection_points: u32,
    /// 10-tonne trucks per collection.
    pub trucks_10t: u32,
    /// 20-tonne trucks per collection.
    pub trucks_20t: u32,
    /// Crew and supervisors for a 10-tonne fleet.
    pub staff_required: u32,
    /// Crew and supervisors for a 20-tonne fleet.
    pub staff_required_20t: u32,
    /// Frequency suggested by density.
    pub recommended_frequency: CollectionFrequency,
}
