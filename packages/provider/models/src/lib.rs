#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types returned by satellite data providers.
//!
//! Providers reduce building footprints, height rasters and gridded
//! population rasters to plain statistical summaries. These are derived
//! once per zone per analysis pass and treated as immutable afterwards.

use chrono::{Datelike as _, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Storey height used to convert building heights into floor counts.
pub const METERS_PER_FLOOR: f64 = 2.5;

/// Footprint detection confidence used when a caller does not specify one.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.75;

/// An independent building-footprint detection dataset.
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
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BuildingDataset {
    /// Primary footprint dataset (with heights where available).
    #[default]
    OpenBuildings,
    /// Secondary dataset used only for cross-validation.
    MicrosoftBuildings,
}

/// Footprint area statistics in square metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaStatistics {
    /// Mean footprint area.
    pub mean: f64,
    /// Standard deviation of footprint area.
    pub stddev: f64,
    /// Smallest footprint.
    pub min: f64,
    /// Largest footprint.
    pub max: f64,
    /// Total footprint area.
    pub sum: f64,
}

/// Building height statistics in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeightStatistics {
    /// Mean height.
    pub mean: f64,
    /// Standard deviation of height.
    pub stddev: f64,
    /// Tallest building.
    pub max: f64,
}

/// Aggregate statistics over the footprints intersecting one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingSummary {
    /// Which detection dataset produced this summary.
    #[serde(default)]
    pub dataset: BuildingDataset,
    /// Number of footprints.
    pub count: u64,
    /// Footprint area statistics.
    pub area_statistics: AreaStatistics,
    /// Height statistics, when a height raster covers the zone.
    #[serde(default)]
    pub height_statistics: Option<HeightStatistics>,
    /// Detection confidence threshold used to filter footprints.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

const fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

impl BuildingSummary {
    /// `true` when no footprints were found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Coefficient of variation of footprint area, or `None` for an empty
    /// summary.
    #[must_use]
    pub fn area_coefficient_of_variation(&self) -> Option<f64> {
        (self.area_statistics.mean > 0.0)
            .then(|| self.area_statistics.stddev / self.area_statistics.mean)
    }

    /// Estimated number of floors from mean height, never below one.
    #[must_use]
    pub fn estimated_floors(&self) -> f64 {
        self.height_statistics
            .map_or(1.0, |h| (h.mean / METERS_PER_FLOOR).max(1.0))
    }

    /// Total floor area in square metres (footprint × floors).
    #[must_use]
    pub fn total_floor_area_sqm(&self) -> f64 {
        self.area_statistics.sum * self.estimated_floors()
    }
}

/// Sum of a gridded population raster clipped to a zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GriddedPopulation {
    /// Raster year.
    pub year: i32,
    /// Summed pixel values inside the polygon.
    pub total_population: f64,
    /// Raw density as reported by the provider (people per km²).
    pub density_per_sqkm: f64,
    /// Number of raster cells intersecting the polygon.
    pub pixel_count: u32,
    /// Coefficient of variation across the intersecting cells.
    #[serde(default)]
    pub pixel_coefficient_of_variation: Option<f64>,
}

/// Spectral land-cover indices averaged over a zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandCoverIndices {
    /// Vegetation index in `[-1, 1]`.
    pub vegetation_index: f64,
    /// Built-up index in `[-1, 1]`.
    pub built_up_index: f64,
}

impl LandCoverIndices {
    /// Rescales the built-up index from `[-1, 1]` to a `[0, 1]` ratio.
    #[must_use]
    pub fn built_up_ratio(&self) -> f64 {
        ((self.built_up_index + 1.0) / 2.0).clamp(0.0, 1.0)
    }
}

/// Inclusive calendar date range for imagery queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

impl DateRange {
    /// The full calendar year, or `None` for years chrono cannot represent.
    #[must_use]
    pub fn for_year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    /// Year of the range start.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.start.year()
    }
}
