#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Population estimate types.
//!
//! Each estimation method produces a [`PopulationEstimate`]. The estimator
//! reconciles them into one [`ConsensusPopulationEstimate`] that records
//! which methods contributed, which were tried and failed, and why any
//! adjustment was made.

use std::collections::BTreeMap;

use lusaka_waste_zone_models::{Confidence, DensityCategory, SettlementType};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// How a population figure was obtained, in fallback-chain order.
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
#[strum(serialize_all = "snake_case")]
pub enum EstimationMethod {
    /// Density-corrected sum of a gridded population raster.
    GriddedPopulation,
    /// Floor area × settlement occupancy.
    BuildingFootprint,
    /// User-declared density bucket × area.
    UserClassification,
    /// Population previously stored on the zone.
    StoredEstimate,
    /// Conservative area × fixed density.
    AreaFallback,
}

/// Socio-economic level declared alongside a user classification.
#[derive(
    Debug,
    Default,
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
pub enum SocioEconomicLevel {
    /// Low income; crowded households.
    Low,
    /// Middle income.
    #[default]
    Middle,
    /// High income; larger plots, smaller households.
    High,
}

/// Settlement information declared by a user who knows the area.
///
/// Treated as more reliable than automatic inference when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClassification {
    /// Declared density bucket.
    pub density: DensityCategory,
    /// Declared settlement type, overriding the classifier.
    #[serde(default)]
    pub settlement_type: Option<SettlementType>,
    /// Declared socio-economic level.
    #[serde(default)]
    pub socio_economic: SocioEconomicLevel,
}

/// One method's population figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationEstimate {
    /// Which method produced this figure.
    pub method: EstimationMethod,
    /// Estimated residents.
    pub value: u64,
    /// Residents per km².
    pub density_per_sqkm: f64,
    /// Bucketed density.
    pub density_category: DensityCategory,
    /// Qualitative confidence.
    pub confidence: Confidence,
    /// Human-readable provenance.
    pub source: String,
    /// Multiplier applied to the raw figure (1.0 when uncorrected).
    pub correction_factor: f64,
}

/// Outcome of trying one method in the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAttempt {
    /// The method tried.
    pub method: EstimationMethod,
    /// Whether it produced a usable figure.
    pub succeeded: bool,
    /// The figure, or why it was not usable.
    pub detail: String,
}

/// The reconciled population figure for a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusPopulationEstimate {
    /// Final population. Strictly positive whenever the zone has area.
    pub consensus_value: u64,
    /// Qualitative confidence of the final figure.
    pub confidence_level: Confidence,
    /// Numeric confidence in `[0.65, 0.95]` for gridded primaries, lower
    /// for fallbacks.
    pub confidence_score: f64,
    /// Residents per km² implied by the final figure.
    pub density_per_sqkm: f64,
    /// Bucketed final density.
    pub density_category: DensityCategory,
    /// Method that won the fallback chain.
    pub primary_method: EstimationMethod,
    /// Every estimate considered in reconciliation.
    pub contributing_methods: Vec<PopulationEstimate>,
    /// Why the final figure differs from the primary, if it does.
    pub adjustment_reason: Option<String>,
    /// Fallback-chain trace.
    pub attempts: Vec<StrategyAttempt>,
}

impl ConsensusPopulationEstimate {
    /// Contributing estimates keyed by method name, as consumed by
    /// uncertainty quantification.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn estimates_by_method(&self) -> BTreeMap<String, f64> {
        self.contributing_methods
            .iter()
            .map(|e| (e.method.to_string(), e.value as f64))
            .collect()
    }

    /// The estimate produced by `method`, if it contributed.
    #[must_use]
    pub fn estimate_for(&self, method: EstimationMethod) -> Option<&PopulationEstimate> {
        self.contributing_methods.iter().find(|e| e.method == method)
    }
}
