//! Writes batch results to an output directory.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use lusaka_waste_logistics::TruckClass;
use lusaka_waste_population_models::EstimationMethod;
use lusaka_waste_validation::QualityLevel;
use lusaka_waste_waste_models::CollectionFrequency;
use lusaka_waste_zone_models::{Confidence, DensityCategory, SettlementType, ZoneType};
use serde::Serialize;

use crate::compare::ComparisonSummary;
use crate::{BatchOutcome, ZoneAnalysis};

/// Flat per-zone table.
pub const RESULTS_CSV: &str = "results.csv";
/// Full analyses.
pub const RESULTS_JSON: &str = "results.json";
/// Batch comparison, written only for two or more zones.
pub const COMPARISON_JSON: &str = "comparison.json";
/// Zones that failed.
pub const FAILURES_JSON: &str = "failures.json";

/// Errors writing output files.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A file or directory could not be created or written.
    #[error("Failed to write {path}: {source}")]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// CSV serialisation failed.
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialisation failed.
    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    zone_id: &'a str,
    zone_name: &'a str,
    zone_type: ZoneType,
    area_sqkm: f64,
    area_hectares: f64,
    perimeter_km: f64,
    compactness_index: f64,
    aspect_ratio: f64,
    centroid_lon: f64,
    centroid_lat: f64,
    settlement_type: SettlementType,
    settlement_confidence: Option<f64>,
    building_density_per_sqkm: Option<f64>,
    avg_building_size_sqm: Option<f64>,
    vegetation_index: Option<f64>,
    built_up_index: Option<f64>,
    population: u64,
    population_confidence: Confidence,
    population_confidence_score: f64,
    population_method: EstimationMethod,
    density_per_sqkm: f64,
    density_category: DensityCategory,
    population_cagr_percent: Option<f64>,
    per_capita_kg_per_day: f64,
    daily_kg: f64,
    weekly_kg: f64,
    monthly_kg: f64,
    annual_tonnes: f64,
    dry_season_daily_kg: f64,
    wet_season_daily_kg: f64,
    seasonal_variation_percent: f64,
    organic_percent: f64,
    plastic_percent: f64,
    paper_percent: f64,
    metal_percent: f64,
    glass_percent: f64,
    other_percent: f64,
    frequency_per_week: u8,
    waste_per_collection_kg: f64,
    collection_points: u32,
    trucks_10t: u32,
    trucks_20t: u32,
    staff_required: u32,
    recommended_frequency: CollectionFrequency,
    revenue_per_collection: f64,
    monthly_revenue: f64,
    annual_revenue: f64,
    monthly_charge_per_household: Option<f64>,
    distance_km: f64,
    recommended_truck_class: TruckClass,
    monthly_operational_cost: f64,
    monthly_fuel_cost: f64,
    monthly_franchise_fee: f64,
    monthly_cost: f64,
    agreement_score: f64,
    coefficient_of_variation: Option<f64>,
    ci_95_lower: Option<f64>,
    ci_95_upper: Option<f64>,
    reliability_score: f64,
    completeness_score: f64,
    plausibility_score: f64,
    overall_quality_score: f64,
    quality_level: QualityLevel,
    data_issue_count: usize,
}

impl<'a> From<&'a ZoneAnalysis> for ResultRow<'a> {
    fn from(a: &'a ZoneAnalysis) -> Self {
        let composition = &a.waste.composition;
        let monthly = &a.logistics.recommended().monthly;
        let ci_95 = a.validation.confidence_intervals.map(|ci| ci.ci_95);

        Self {
            zone_id: &a.zone.id,
            zone_name: a.zone.display_name(),
            zone_type: a.zone.zone_type,
            area_sqkm: a.geometry.area_sqkm,
            area_hectares: a.geometry.area_hectares,
            perimeter_km: a.geometry.perimeter_km,
            compactness_index: a.geometry.compactness_index,
            aspect_ratio: a.geometry.aspect_ratio,
            centroid_lon: a.geometry.centroid[0],
            centroid_lat: a.geometry.centroid[1],
            settlement_type: a.settlement_type,
            settlement_confidence: a.settlement.as_ref().map(|s| s.confidence),
            building_density_per_sqkm: a
                .settlement
                .as_ref()
                .map(|s| s.building_density_per_sqkm),
            avg_building_size_sqm: a.settlement.as_ref().map(|s| s.avg_building_size_sqm),
            vegetation_index: a.land_cover.map(|l| l.vegetation_index),
            built_up_index: a.land_cover.map(|l| l.built_up_index),
            population: a.population.consensus_value,
            population_confidence: a.population.confidence_level,
            population_confidence_score: a.population.confidence_score,
            population_method: a.population.primary_method,
            density_per_sqkm: a.population.density_per_sqkm,
            density_category: a.population.density_category,
            population_cagr_percent: a.population_trend.as_ref().and_then(|t| t.cagr_percent),
            per_capita_kg_per_day: a.waste.per_capita_kg_per_day,
            daily_kg: a.waste.daily_kg,
            weekly_kg: a.waste.weekly_kg,
            monthly_kg: a.waste.monthly_kg,
            annual_tonnes: a.waste.annual_tonnes,
            dry_season_daily_kg: a.waste.dry_season_daily_kg,
            wet_season_daily_kg: a.waste.wet_season_daily_kg,
            seasonal_variation_percent: a.waste.seasonal_variation_percent,
            organic_percent: composition.organic,
            plastic_percent: composition.plastic,
            paper_percent: composition.paper,
            metal_percent: composition.metal,
            glass_percent: composition.glass,
            other_percent: composition.other,
            frequency_per_week: a.collection.frequency_per_week,
            waste_per_collection_kg: a.collection.waste_per_collection_kg,
            collection_points: a.collection.collection_points,
            trucks_10t: a.collection.trucks_10t,
            trucks_20t: a.collection.trucks_20t,
            staff_required: a.collection.staff_required,
            recommended_frequency: a.collection.recommended_frequency,
            revenue_per_collection: a.revenue.per_collection.amount,
            monthly_revenue: a.revenue.monthly_revenue,
            annual_revenue: a.revenue.annual_revenue,
            monthly_charge_per_household: a.revenue.monthly_charge_per_household,
            distance_km: a.logistics.distance_km,
            recommended_truck_class: a.logistics.recommended_truck_class,
            monthly_operational_cost: monthly.operational,
            monthly_fuel_cost: monthly.fuel,
            monthly_franchise_fee: monthly.franchise_fee,
            monthly_cost: a.logistics.monthly_cost,
            agreement_score: a.validation.agreement_score,
            coefficient_of_variation: a.validation.coefficient_of_variation,
            ci_95_lower: ci_95.map(|ci| ci.lower),
            ci_95_upper: ci_95.map(|ci| ci.upper),
            reliability_score: a.validation.reliability_score(),
            completeness_score: a.validation.completeness_score,
            plausibility_score: a.validation.plausibility_score,
            overall_quality_score: a.validation.overall_quality_score,
            quality_level: a.validation.quality_level,
            data_issue_count: a.data_issues.len(),
        }
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, ExportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the per-zone table.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be written.
pub fn write_csv(path: &Path, analyses: &[ZoneAnalysis]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    for analysis in analyses {
        writer.serialize(ResultRow::from(analysis))?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Writes every output file into `dir`, creating it if needed, and returns
/// the paths written.
///
/// # Errors
///
/// Returns [`ExportError`] if the directory or any file cannot be written.
pub fn write_all(
    dir: &Path,
    outcome: &BatchOutcome,
    comparison: Option<&ComparisonSummary>,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();

    let path = dir.join(RESULTS_CSV);
    write_csv(&path, &outcome.analyses)?;
    written.push(path);

    let path = dir.join(RESULTS_JSON);
    write_json(&path, &outcome.analyses)?;
    written.push(path);

    if let Some(comparison) = comparison {
        let path = dir.join(COMPARISON_JSON);
        write_json(&path, comparison)?;
        written.push(path);
    }

    let path = dir.join(FAILURES_JSON);
    write_json(&path, &outcome.failures)?;
    written.push(path);

    for path in &written {
        log::info!("Wrote {}", path.display());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use lusaka_waste_zone_models::Zone;

    use super::*;
    use crate::config::AnalysisConfig;
    use crate::input::{ZoneInput, provider_for};
    use crate::progress::NullProgress;
    use crate::{ZoneFailure, compare::compare, run_batch};

    fn zone(id: &str, lon: f64) -> ZoneInput {
        ZoneInput {
            zone: Zone::new(
                id,
                vec![
                    [lon, -15.40],
                    [lon + 0.01, -15.40],
                    [lon + 0.01, -15.39],
                    [lon, -15.39],
                ],
            ),
            record: lusaka_waste_provider::memory::ZoneRecord::default(),
            user: None,
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lusaka-waste-export-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn writes_all_files() {
        let inputs = [zone("a", 28.20), zone("b", 28.30)];
        let provider = provider_for(&inputs);
        let mut outcome = run_batch(
            &provider,
            &inputs,
            &AnalysisConfig::default(),
            None,
            &NullProgress,
        )
        .await
        .unwrap();
        outcome.failures.push(ZoneFailure {
            zone_id: "c".to_string(),
            error: "bad ring".to_string(),
        });
        let comparison = compare(&outcome.analyses);
        assert!(comparison.is_some());

        let dir = scratch_dir("all");
        let written = write_all(&dir, &outcome, comparison.as_ref()).unwrap();
        assert_eq!(written.len(), 4);

        let csv = std::fs::read_to_string(dir.join(RESULTS_CSV)).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("zone_id,zone_name,zone_type,area_sqkm"));
        assert_eq!(lines.count(), 2);

        let failures: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join(FAILURES_JSON)).unwrap())
                .unwrap();
        assert_eq!(failures[0]["zoneId"], "c");

        let results: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join(RESULTS_JSON)).unwrap())
                .unwrap();
        assert_eq!(results.as_array().unwrap().len(), 2);
        assert_eq!(results[0]["population"]["primaryMethod"], "area_fallback");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn comparison_skipped_for_single_zone() {
        let inputs = [zone("solo", 28.20)];
        let provider = provider_for(&inputs);
        let outcome = run_batch(
            &provider,
            &inputs,
            &AnalysisConfig::default(),
            None,
            &NullProgress,
        )
        .await
        .unwrap();
        assert!(compare(&outcome.analyses).is_none());

        let dir = scratch_dir("solo");
        let written = write_all(&dir, &outcome, None).unwrap();
        assert_eq!(written.len(), 3);
        assert!(!dir.join(COMPARISON_JSON).exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
