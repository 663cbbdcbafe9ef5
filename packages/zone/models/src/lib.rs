#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone and settlement taxonomy types.
//!
//! Every component of the analysis pipeline speaks in terms of these
//! types. String forms (`"residential"`, `"RESIDENTIAL"`, `"Informal"`)
//! are normalised into enums here, at the data-model boundary, so that no
//! downstream crate ever compares raw strings.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A `[longitude, latitude]` pair in WGS84 degrees.
pub type LonLat = [f64; 2];

/// Default number of collections per week for a zone.
pub const DEFAULT_COLLECTION_FREQUENCY: u8 = 2;

/// Land-use designation for a collection zone.
#[derive(
    Debug,
    Default,
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
#[serde(rename_all = "snake_case", try_from = "String")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ZoneType {
    /// Predominantly housing.
    #[default]
    Residential,
    /// Markets, shops and offices.
    Commercial,
    /// Factories, depots and yards.
    Industrial,
    /// Housing interleaved with commerce.
    MixedUse,
}

impl TryFrom<String> for ZoneType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse()
    }
}

/// Urban settlement classification.
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
#[serde(rename_all = "snake_case", try_from = "String")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SettlementType {
    /// Planned layout with regular plots.
    Formal,
    /// Dense, irregular, mostly unplanned development.
    Informal,
    /// Both patterns present in the same zone.
    Mixed,
}

impl TryFrom<String> for SettlementType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse()
    }
}

/// Population density bucket, ordered from sparsest to densest.
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
#[serde(rename_all = "snake_case", try_from = "String")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DensityCategory {
    /// Below 1,000 people/km².
    Rural,
    /// 1,000 to 2,000 people/km².
    PeriUrban,
    /// 2,000 to 5,000 people/km².
    LowDensityUrban,
    /// 5,000 to 8,000 people/km².
    MediumDensityUrban,
    /// 8,000 to 15,000 people/km².
    HighDensityUrban,
    /// Above 15,000 people/km².
    VeryHighDensityUrban,
}

impl TryFrom<String> for DensityCategory {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse()
    }
}

impl DensityCategory {
    /// All categories, sparsest first.
    pub const ALL: &[Self] = &[
        Self::Rural,
        Self::PeriUrban,
        Self::LowDensityUrban,
        Self::MediumDensityUrban,
        Self::HighDensityUrban,
        Self::VeryHighDensityUrban,
    ];

    /// Buckets a population density (people per km²).
    ///
    /// Non-finite or negative densities bucket as [`Self::Rural`].
    #[must_use]
    pub fn from_density(people_per_sqkm: f64) -> Self {
        if people_per_sqkm > 15_000.0 {
            Self::VeryHighDensityUrban
        } else if people_per_sqkm > 8_000.0 {
            Self::HighDensityUrban
        } else if people_per_sqkm > 5_000.0 {
            Self::MediumDensityUrban
        } else if people_per_sqkm > 2_000.0 {
            Self::LowDensityUrban
        } else if people_per_sqkm > 1_000.0 {
            Self::PeriUrban
        } else {
            Self::Rural
        }
    }

    /// A representative density for the bucket, used when only a declared
    /// category is known and no measured density exists.
    #[must_use]
    pub const fn representative_density(self) -> f64 {
        match self {
            Self::Rural => 500.0,
            Self::PeriUrban => 1_500.0,
            Self::LowDensityUrban => 3_500.0,
            Self::MediumDensityUrban => 6_500.0,
            Self::HighDensityUrban => 11_500.0,
            Self::VeryHighDensityUrban => 18_000.0,
        }
    }

    /// Human-readable label (e.g. "Very High Density Urban").
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rural => "Rural",
            Self::PeriUrban => "Peri-Urban",
            Self::LowDensityUrban => "Low Density Urban",
            Self::MediumDensityUrban => "Medium Density Urban",
            Self::HighDensityUrban => "High Density Urban",
            Self::VeryHighDensityUrban => "Very High Density Urban",
        }
    }
}

/// Qualitative confidence attached to every numeric estimate.
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
pub enum Confidence {
    /// Fallback or heavily degraded estimate.
    Low,
    /// Usable, but sources disagree or are incomplete.
    Medium,
    /// Primary source with corroborating data.
    High,
}

impl Confidence {
    /// Maps a numeric confidence score in `[0, 1]` to a level.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            Self::High
        } else if score >= 0.75 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Returns the lower of `self` and `cap`.
    #[must_use]
    pub fn capped_at(self, cap: Self) -> Self {
        self.min(cap)
    }
}

/// A collection zone: a single polygon ring plus caller-supplied metadata.
///
/// Area and perimeter are always derived from `boundary`; they are never
/// stored on the zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Caller-assigned identifier, unique within one batch.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Outer ring as `[lon, lat]` pairs. May be open or closed.
    pub boundary: Vec<LonLat>,
    /// Land-use designation.
    #[serde(default)]
    pub zone_type: ZoneType,
    /// Previously stored population, used late in the fallback chain.
    #[serde(default)]
    pub estimated_population: Option<u64>,
    /// Known number of households.
    #[serde(default)]
    pub household_count: Option<u32>,
    /// Known number of businesses.
    #[serde(default)]
    pub business_count: Option<u32>,
    /// Collections per week.
    #[serde(default = "default_frequency")]
    pub collection_frequency_per_week: u8,
}

const fn default_frequency() -> u8 {
    DEFAULT_COLLECTION_FREQUENCY
}

impl Zone {
    /// Creates a residential zone with default metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, boundary: Vec<LonLat>) -> Self {
        Self {
            id: id.into(),
            name: None,
            boundary,
            zone_type: ZoneType::default(),
            estimated_population: None,
            household_count: None,
            business_count: None,
            collection_frequency_per_week: DEFAULT_COLLECTION_FREQUENCY,
        }
    }

    /// The display name, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Records a population produced by the estimator.
    pub const fn set_estimated_population(&mut self, population: u64) {
        self.estimated_population = Some(population);
    }
}
