#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Formal / informal settlement classification.
//!
//! Two informal signals are checked: building density above
//! [`INFORMAL_DENSITY_PER_SQKM`] and mean footprint below
//! [`INFORMAL_MAX_MEAN_AREA_SQM`]. Either one marks the zone informal.
//! With neither, high footprint-size variability (CV above
//! [`ORGANIC_GROWTH_CV`]) marks it mixed, otherwise it is formal.

use lusaka_waste_provider_models::BuildingSummary;
use lusaka_waste_zone_models::SettlementType;
use serde::{Deserialize, Serialize};

/// Buildings per km² above which a zone looks informal.
pub const INFORMAL_DENSITY_PER_SQKM: f64 = 100.0;

/// Mean footprint (m²) below which a zone looks informal.
pub const INFORMAL_MAX_MEAN_AREA_SQM: f64 = 80.0;

/// Footprint-area CV above which growth looks organic.
pub const ORGANIC_GROWTH_CV: f64 = 1.0;

const BASE_CONFIDENCE: f64 = 0.5;

/// Errors from [`classify`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassificationError {
    /// The zone area is not a positive finite number.
    #[error("Invalid zone area: {area_sqkm} km2")]
    InvalidArea {
        /// The rejected area.
        area_sqkm: f64,
    },

    /// The summary contains no footprints.
    #[error("No building footprints to classify")]
    NoBuildings,
}

/// Result of classifying a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementClassification {
    /// Assigned label.
    pub settlement_type: SettlementType,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Buildings per km².
    pub building_density_per_sqkm: f64,
    /// Mean footprint area.
    pub avg_building_size_sqm: f64,
    /// Share of the zone covered by footprints, in `[0, 1]`.
    pub built_up_ratio: f64,
    /// Buildings per hectare.
    pub buildings_per_hectare: f64,
    /// Which rules fired.
    pub indicators: Vec<String>,
}

/// Classifies a zone from its footprint summary.
///
/// # Errors
///
/// * [`ClassificationError::InvalidArea`] for a non-positive area
/// * [`ClassificationError::NoBuildings`] for an empty summary
#[allow(clippy::cast_precision_loss)]
pub fn classify(
    summary: &BuildingSummary,
    area_sqkm: f64,
) -> Result<SettlementClassification, ClassificationError> {
    if !area_sqkm.is_finite() || area_sqkm <= 0.0 {
        return Err(ClassificationError::InvalidArea { area_sqkm });
    }
    if summary.is_empty() {
        return Err(ClassificationError::NoBuildings);
    }

    let count = summary.count as f64;
    let building_density_per_sqkm = count / area_sqkm;
    let avg_building_size_sqm = summary.area_statistics.mean;
    let built_up_ratio = (summary.area_statistics.sum / (area_sqkm * 1_000_000.0)).clamp(0.0, 1.0);
    let buildings_per_hectare = count / (area_sqkm * 100.0);

    let mut confidence = BASE_CONFIDENCE;
    let mut informal_signals = 0;
    let mut indicators = Vec::new();

    if building_density_per_sqkm > INFORMAL_DENSITY_PER_SQKM {
        informal_signals += 1;
        confidence += 0.3;
        indicators.push(format!(
            "High building density ({building_density_per_sqkm:.0}/km2)"
        ));
    }
    if avg_building_size_sqm < INFORMAL_MAX_MEAN_AREA_SQM {
        informal_signals += 1;
        confidence += 0.2;
        indicators.push(format!(
            "Small average building size ({avg_building_size_sqm:.0} m2)"
        ));
    }
    let mut organic_growth = false;
    if let Some(cv) = summary.area_coefficient_of_variation()
        && cv > ORGANIC_GROWTH_CV
    {
        organic_growth = true;
        confidence += 0.2;
        indicators.push(format!("High building size variability (CV {cv:.2})"));
    }

    let settlement_type = if informal_signals > 0 {
        SettlementType::Informal
    } else if organic_growth {
        SettlementType::Mixed
    } else {
        SettlementType::Formal
    };

    log::debug!(
        "Classified {settlement_type} ({} indicators, {building_density_per_sqkm:.0} buildings/km2)",
        indicators.len()
    );

    Ok(SettlementClassification {
        settlement_type,
        confidence: confidence.clamp(0.0, 1.0),
        building_density_per_sqkm,
        avg_building_size_sqm,
        built_up_ratio,
        buildings_per_hectare,
        indicators,
    })
}
