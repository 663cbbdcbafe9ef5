#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone analysis pipeline.
//!
//! [`ZoneAnalyzer::analyze_zone`] runs one zone through geometry,
//! provider lookups, settlement classification, population estimation,
//! waste generation, collection sizing, revenue, logistics and
//! validation. Only an invalid boundary or an invalid configuration
//! aborts a zone. Provider failures are recorded as data issues and the
//! estimators fall back to whatever data remains.
//!
//! [`ZoneAnalyzer::analyze_batch`] runs many zones through a bounded
//! stream, keeping input order and collecting per-zone failures.

pub mod compare;
pub mod config;
pub mod export;
pub mod input;
pub mod insights;
pub mod progress;
pub mod temporal;

use std::time::Duration;

use futures::future::join4;
use futures::stream::{self, StreamExt as _};
use lusaka_waste_billing::{BillingError, RevenueProjection, project_revenue};
use lusaka_waste_generation::{WasteError, WasteInputs, collection_requirements, generate};
use lusaka_waste_geometry::{GeometryError, GeometryMetrics};
use lusaka_waste_logistics::{CollectionLogistics, LogisticsError, LogisticsReport};
use lusaka_waste_population::{EstimationContext, EstimationError, PopulationEstimator};
use lusaka_waste_population_models::ConsensusPopulationEstimate;
use lusaka_waste_provider::cache::AnalysisCache;
use lusaka_waste_provider::gateway::ProviderGateway;
use lusaka_waste_provider::{ProviderError, SatelliteDataProvider};
use lusaka_waste_provider_models::{BuildingDataset, DateRange, LandCoverIndices};
use lusaka_waste_settlement::SettlementClassification;
use lusaka_waste_validation::{DataAvailability, ValidationInputs, ValidationReport};
use lusaka_waste_waste_models::{CollectionRequirement, WasteGenerationResult};
use lusaka_waste_zone_models::{LonLat, SettlementType, Zone};
use serde::Serialize;

use crate::config::{AnalysisConfig, ConfigError};
use crate::input::ZoneInput;
use crate::insights::{InsightProvider, ZoneSummary};
use crate::progress::ProgressCallback;
use crate::temporal::PopulationTrend;

/// Insight timeout used when the configured one is unusable.
pub const DEFAULT_INSIGHT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that abort one zone's analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The boundary is not a valid polygon.
    #[error("Zone {zone_id}: {source}")]
    Geometry {
        /// Zone id.
        zone_id: String,
        /// Underlying error.
        source: GeometryError,
    },

    /// No population figure could be produced.
    #[error("Zone {zone_id}: {source}")]
    Estimation {
        /// Zone id.
        zone_id: String,
        /// Underlying error.
        source: EstimationError,
    },

    /// Waste or collection sizing rejected its inputs.
    #[error("Zone {zone_id}: {source}")]
    Waste {
        /// Zone id.
        zone_id: String,
        /// Underlying error.
        source: WasteError,
    },

    /// Revenue projection failed.
    #[error("Zone {zone_id}: {source}")]
    Billing {
        /// Zone id.
        zone_id: String,
        /// Underlying error.
        source: BillingError,
    },

    /// Logistics planning failed.
    #[error("Zone {zone_id}: {source}")]
    Logistics {
        /// Zone id.
        zone_id: String,
        /// Underlying error.
        source: LogisticsError,
    },

    /// The configuration cannot be turned into a provider setup.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Full result for one zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneAnalysis {
    /// The zone, with `estimated_population` set to the consensus value.
    pub zone: Zone,
    /// Provider the data came from.
    pub provider_id: String,
    /// Gridded population year used.
    pub year: i32,
    /// Boundary metrics.
    pub geometry: GeometryMetrics,
    /// Footprint-based classification, when footprints were available.
    pub settlement: Option<SettlementClassification>,
    /// Settlement type used downstream (user, then classifier, then mixed).
    pub settlement_type: SettlementType,
    /// Land-cover indices, when available.
    pub land_cover: Option<LandCoverIndices>,
    /// Consensus population.
    pub population: ConsensusPopulationEstimate,
    /// Per-year population series, when extra years were requested.
    pub population_trend: Option<PopulationTrend>,
    /// Waste generation.
    pub waste: WasteGenerationResult,
    /// Collection sizing at the zone's configured frequency.
    pub collection: CollectionRequirement,
    /// Revenue at the configured company type.
    pub revenue: RevenueProjection,
    /// Fleet comparison and monthly cost.
    pub logistics: LogisticsReport,
    /// Cross-validation and quality scoring.
    pub validation: ValidationReport,
    /// Advisory recommendations. Absent when the provider failed.
    pub insights: Option<Vec<String>>,
    /// Provider and classifier problems that degraded the analysis.
    pub data_issues: Vec<String>,
}

impl ZoneAnalysis {
    /// Daily waste per hectare of zone area.
    #[must_use]
    pub fn waste_per_hectare(&self) -> f64 {
        if self.geometry.area_hectares > 0.0 {
            self.waste.daily_kg / self.geometry.area_hectares
        } else {
            0.0
        }
    }

    fn summary(&self) -> ZoneSummary {
        ZoneSummary {
            zone_id: self.zone.id.clone(),
            population: self.population.consensus_value,
            population_confidence: self.population.confidence_level,
            adjustment_reason: self.population.adjustment_reason.clone(),
            density_category: self.population.density_category,
            settlement_type: self.settlement_type,
            daily_kg: self.waste.daily_kg,
            frequency_per_week: self.collection.frequency_per_week,
            recommended_interval_days: self.collection.recommended_frequency.interval_days(),
            trucks_10t: self.collection.trucks_10t,
            monthly_cost: self.logistics.monthly_cost,
            monthly_revenue: self.revenue.monthly_revenue,
            quality_level: self.validation.quality_level,
            outliers: self.validation.outliers.clone(),
            data_issues: self.data_issues.clone(),
        }
    }
}

/// A zone that could not be analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneFailure {
    /// Zone id.
    pub zone_id: String,
    /// Error message.
    pub error: String,
}

/// Results of a batch run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// Successfully analysed zones.
    pub analyses: Vec<ZoneAnalysis>,
    /// Zones that failed.
    pub failures: Vec<ZoneFailure>,
}

/// Runs zones through the analysis pipeline.
pub struct ZoneAnalyzer<'a> {
    gateway: ProviderGateway<'a>,
    config: &'a AnalysisConfig,
    estimator: PopulationEstimator,
    logistics: CollectionLogistics,
    insights: Option<&'a dyn InsightProvider>,
    insight_timeout: Duration,
}

impl<'a> ZoneAnalyzer<'a> {
    /// Creates an analyzer using great-circle logistics and no insights.
    #[must_use]
    pub fn new(gateway: ProviderGateway<'a>, config: &'a AnalysisConfig) -> Self {
        let insight_timeout = config.analysis.insight_timeout().unwrap_or_else(|e| {
            log::warn!("{e}; using {DEFAULT_INSIGHT_TIMEOUT:?}");
            DEFAULT_INSIGHT_TIMEOUT
        });
        Self {
            gateway,
            config,
            estimator: PopulationEstimator::new(config.estimator.clone()),
            logistics: CollectionLogistics::new(config.logistics.clone()),
            insights: None,
            insight_timeout,
        }
    }

    /// Replaces the logistics planner, e.g. to add a routing provider.
    #[must_use]
    pub fn with_logistics(mut self, logistics: CollectionLogistics) -> Self {
        self.logistics = logistics;
        self
    }

    /// Attaches an insight provider.
    #[must_use]
    pub fn with_insights(mut self, provider: &'a dyn InsightProvider) -> Self {
        self.insights = Some(provider);
        self
    }

    /// Analyses one zone.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Geometry`] for an invalid boundary. The
    /// remaining variants only occur with out-of-range configuration.
    #[allow(clippy::too_many_lines)]
    pub async fn analyze_zone(&self, input: &ZoneInput) -> Result<ZoneAnalysis, AnalysisError> {
        let zone = &input.zone;
        let zone_id = || zone.id.clone();
        log::debug!("Analysing zone {}", zone.id);

        let geometry = lusaka_waste_geometry::compute(&zone.boundary)
            .map_err(|source| AnalysisError::Geometry {
                zone_id: zone_id(),
                source,
            })?;

        let run = &self.config.analysis;
        let threshold = run.building_confidence_threshold;
        let boundary = zone.boundary.as_slice();

        let (primary, secondary, gridded, land_cover) = join4(
            self.gateway
                .building_summary(boundary, BuildingDataset::OpenBuildings, threshold),
            self.gateway
                .building_summary(boundary, BuildingDataset::MicrosoftBuildings, threshold),
            self.gateway.gridded_population(boundary, run.year),
            self.land_cover(boundary, run.year),
        )
        .await;

        let mut issues = Vec::new();
        let primary = usable(primary, "primary buildings", &zone.id, &mut issues);
        let secondary = usable(secondary, "secondary buildings", &zone.id, &mut issues);
        let gridded = usable(gridded, "gridded population", &zone.id, &mut issues);
        let land_cover = usable(land_cover, "land cover", &zone.id, &mut issues);

        let settlement = match &primary {
            Some(summary) => {
                match lusaka_waste_settlement::classify(summary, geometry.area_sqkm) {
                    Ok(classification) => Some(classification),
                    Err(e) => {
                        issues.push(format!("settlement classification: {e}"));
                        None
                    }
                }
            }
            None => None,
        };

        let mut ctx = EstimationContext::new(zone, geometry.area_sqkm);
        ctx.gridded = gridded.as_ref();
        ctx.buildings = primary.as_ref();
        ctx.inferred_settlement = settlement.as_ref().map(|s| s.settlement_type);
        ctx.user = input.user.as_ref();

        let population = self
            .estimator
            .estimate(&ctx)
            .map_err(|source| AnalysisError::Estimation {
                zone_id: zone_id(),
                source,
            })?;
        let settlement_type = ctx.settlement_type();

        let built_up_ratio = settlement
            .as_ref()
            .map(|s| s.built_up_ratio)
            .or_else(|| land_cover.map(|l| l.built_up_ratio()));
        let mut waste_inputs = WasteInputs::new(
            population.density_category,
            settlement_type,
            zone.zone_type,
        )
        .with_built_up(
            built_up_ratio,
            settlement.as_ref().map(|s| s.buildings_per_hectare),
        );
        if let Some(date) = run.date {
            waste_inputs = waste_inputs.with_date(date);
        }

        let waste = generate(population.consensus_value, &waste_inputs, &self.config.waste)
            .map_err(|source| AnalysisError::Waste {
                zone_id: zone_id(),
                source,
            })?;
        let collection = collection_requirements(
            &waste,
            zone.collection_frequency_per_week,
            &self.config.waste,
        )
        .map_err(|source| AnalysisError::Waste {
            zone_id: zone_id(),
            source,
        })?;
        let revenue = project_revenue(
            &waste,
            &collection,
            self.config.billing.company_type,
            zone.household_count,
        )
        .map_err(|source| AnalysisError::Billing {
            zone_id: zone_id(),
            source,
        })?;
        let logistics = self
            .logistics
            .plan(geometry.centroid, &collection)
            .await
            .map_err(|source| AnalysisError::Logistics {
                zone_id: zone_id(),
                source,
            })?;

        let estimates = population.estimates_by_method();
        let validation = lusaka_waste_validation::validate(&ValidationInputs {
            population_estimates: &estimates,
            density_per_sqkm: Some(population.density_per_sqkm),
            waste: Some(&waste),
            primary_buildings: primary.as_ref(),
            secondary_buildings: secondary.as_ref(),
            availability: DataAvailability {
                gridded_population: gridded.is_some_and(|g| g.total_population > 0.0),
                primary_buildings: primary.as_ref().is_some_and(|b| !b.is_empty()),
                secondary_buildings: secondary.as_ref().is_some_and(|b| !b.is_empty()),
                building_heights: primary
                    .as_ref()
                    .is_some_and(|b| b.height_statistics.is_some()),
                land_cover: land_cover.is_some(),
                household_count: zone.household_count.is_some(),
                business_count: zone.business_count.is_some(),
                user_classification: input.user.is_some(),
            },
        });

        let population_trend = if run.years.is_empty() {
            None
        } else {
            Some(temporal::population_trend(&self.gateway, boundary, &run.years).await)
        };

        let mut zone = zone.clone();
        zone.set_estimated_population(population.consensus_value);

        let mut analysis = ZoneAnalysis {
            zone,
            provider_id: self.gateway.provider_id().to_string(),
            year: run.year,
            geometry,
            settlement,
            settlement_type,
            land_cover,
            population,
            population_trend,
            waste,
            collection,
            revenue,
            logistics,
            validation,
            insights: None,
            data_issues: issues,
        };

        if let Some(provider) = self.insights {
            analysis.insights =
                insights::gather(provider, &analysis.summary(), self.insight_timeout).await;
        }

        log::info!(
            "Zone {}: population {} ({}), {:.0} kg/day, quality {}",
            analysis.zone.id,
            analysis.population.consensus_value,
            analysis.population.confidence_level,
            analysis.waste.daily_kg,
            analysis.validation.quality_level
        );

        Ok(analysis)
    }

    async fn land_cover(
        &self,
        boundary: &[LonLat],
        year: i32,
    ) -> Result<LandCoverIndices, ProviderError> {
        let range = DateRange::for_year(year)
            .ok_or_else(|| ProviderError::unavailable(format!("no calendar for year {year}")))?;
        self.gateway.land_cover_indices(boundary, range).await
    }

    /// Analyses `inputs` with at most `analysis.concurrency` zones in
    /// flight, reporting one progress unit per zone.
    pub async fn analyze_batch(
        &self,
        inputs: &[ZoneInput],
        progress: &dyn ProgressCallback,
    ) -> BatchOutcome {
        let concurrency = self.config.analysis.concurrency.max(1);
        log::info!(
            "Analysing {} zone(s), {concurrency} at a time",
            inputs.len()
        );
        progress.set_total(inputs.len() as u64);

        let results: Vec<_> = stream::iter(inputs)
            .map(|input| async move {
                let result = self.analyze_zone(input).await;
                progress.inc(1);
                (input, result)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut outcome = BatchOutcome::default();
        for (input, result) in results {
            match result {
                Ok(analysis) => outcome.analyses.push(analysis),
                Err(e) => {
                    log::error!("Zone {} failed: {e}", input.zone.id);
                    outcome.failures.push(ZoneFailure {
                        zone_id: input.zone.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        progress.finish(format!(
            "{} analysed, {} failed",
            outcome.analyses.len(),
            outcome.failures.len()
        ));
        outcome
    }
}

fn usable<T>(
    result: Result<T, ProviderError>,
    what: &str,
    zone_id: &str,
    issues: &mut Vec<String>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Zone {zone_id}: {what} unavailable: {e}");
            issues.push(format!("{what}: {e}"));
            None
        }
    }
}

/// Builds the cache, retry policy and analyzer for `config` and runs a
/// batch against `provider`.
///
/// # Errors
///
/// Returns [`AnalysisError::Config`] if the provider settings are invalid.
pub async fn run_batch(
    provider: &dyn SatelliteDataProvider,
    inputs: &[ZoneInput],
    config: &AnalysisConfig,
    insights: Option<&dyn InsightProvider>,
    progress: &dyn ProgressCallback,
) -> Result<BatchOutcome, AnalysisError> {
    let policy = config.provider.retry_policy()?;
    let cache = AnalysisCache::new(config.provider.cache_settings()?);
    let gateway = ProviderGateway::new(provider, &cache, &policy);

    let mut analyzer = ZoneAnalyzer::new(gateway, config);
    if let Some(provider) = insights {
        analyzer = analyzer.with_insights(provider);
    }
    Ok(analyzer.analyze_batch(inputs, progress).await)
}

#[cfg(test)]
mod tests {
    use lusaka_waste_population_models::{EstimationMethod, UserClassification};
    use lusaka_waste_provider::memory::ZoneRecord;
    use lusaka_waste_provider_models::{
        AreaStatistics, BuildingSummary, GriddedPopulation, HeightStatistics,
    };
    use lusaka_waste_zone_models::{Confidence, DensityCategory};

    use super::*;
    use crate::input::provider_for;
    use crate::insights::RuleBasedInsights;
    use crate::progress::NullProgress;

    fn square(lon: f64, lat: f64) -> Vec<LonLat> {
        vec![
            [lon, lat],
            [lon + 0.01, lat],
            [lon + 0.01, lat + 0.01],
            [lon, lat + 0.01],
            [lon, lat],
        ]
    }

    #[allow(clippy::cast_precision_loss)]
    fn buildings(dataset: BuildingDataset, count: u64, mean: f64) -> BuildingSummary {
        BuildingSummary {
            dataset,
            count,
            area_statistics: AreaStatistics {
                mean,
                stddev: mean * 1.2,
                min: 12.0,
                max: mean * 8.0,
                sum: mean * count as f64,
            },
            height_statistics: Some(HeightStatistics {
                mean: 3.0,
                stddev: 0.5,
                max: 6.0,
            }),
            confidence_threshold: 0.75,
        }
    }

    fn kanyama() -> ZoneInput {
        let mut zone = Zone::new("kanyama", square(28.25, -15.40));
        zone.household_count = Some(3_000);
        ZoneInput {
            zone,
            record: ZoneRecord {
                buildings: Some(buildings(BuildingDataset::OpenBuildings, 4_000, 45.0)),
                secondary_buildings: Some(buildings(
                    BuildingDataset::MicrosoftBuildings,
                    3_800,
                    47.0,
                )),
                population: vec![
                    GriddedPopulation {
                        year: 2015,
                        total_population: 10_000.0,
                        density_per_sqkm: 8_400.0,
                        pixel_count: 4,
                        pixel_coefficient_of_variation: Some(0.2),
                    },
                    GriddedPopulation {
                        year: 2020,
                        total_population: 12_100.0,
                        density_per_sqkm: 10_200.0,
                        pixel_count: 4,
                        pixel_coefficient_of_variation: Some(0.2),
                    },
                ],
                land_cover: None,
            },
            user: None,
        }
    }

    fn empty(id: &str, lon: f64) -> ZoneInput {
        ZoneInput {
            zone: Zone::new(id, square(lon, -15.30)),
            record: ZoneRecord::default(),
            user: None,
        }
    }

    async fn run(inputs: &[ZoneInput], config: &AnalysisConfig) -> BatchOutcome {
        let provider = provider_for(inputs);
        run_batch(&provider, inputs, config, Some(&RuleBasedInsights), &NullProgress)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn full_data_zone_uses_gridded_population() {
        let outcome = run(&[kanyama()], &AnalysisConfig::default()).await;
        assert!(outcome.failures.is_empty());
        let analysis = &outcome.analyses[0];

        assert_eq!(
            analysis.population.primary_method,
            EstimationMethod::GriddedPopulation
        );
        assert!(analysis.population.consensus_value > 12_100);
        assert_eq!(
            analysis.zone.estimated_population,
            Some(analysis.population.consensus_value)
        );
        assert_eq!(analysis.settlement_type, SettlementType::Informal);
        assert!(analysis.settlement.is_some());
        assert!(analysis.waste.composition.is_valid());
        assert!(analysis.waste.daily_kg > 0.0);
        assert_eq!(analysis.collection.frequency_per_week, 2);
        assert!(analysis.collection.trucks_10t >= analysis.collection.trucks_20t);
        assert!(analysis.revenue.monthly_charge_per_household.is_some());
        assert!(analysis.validation.building_agreement.is_some());
        assert!(analysis.insights.is_some());
        assert_eq!(
            analysis.data_issues,
            vec!["land cover: Data unavailable: no land cover imagery".to_string()]
        );
        assert!(analysis.population_trend.is_none());
    }

    #[tokio::test]
    async fn zone_without_data_falls_back_to_area() {
        let outcome = run(&[empty("bare", 28.40)], &AnalysisConfig::default()).await;
        let analysis = &outcome.analyses[0];

        assert_eq!(analysis.population.primary_method, EstimationMethod::AreaFallback);
        assert_eq!(analysis.population.confidence_level, Confidence::Low);
        assert!(analysis.population.consensus_value > 0);
        assert_eq!(analysis.settlement_type, SettlementType::Mixed);
        assert_eq!(analysis.data_issues.len(), 4);
        assert!(analysis.validation.building_agreement.is_none());
    }

    #[tokio::test]
    async fn user_classification_overrides_settlement() {
        let mut input = empty("user", 28.45);
        input.user = Some(UserClassification {
            density: DensityCategory::MediumDensityUrban,
            settlement_type: Some(SettlementType::Formal),
            socio_economic: lusaka_waste_population_models::SocioEconomicLevel::Middle,
        });
        let outcome = run(&[input], &AnalysisConfig::default()).await;
        let analysis = &outcome.analyses[0];

        assert_eq!(
            analysis.population.primary_method,
            EstimationMethod::UserClassification
        );
        assert_eq!(analysis.settlement_type, SettlementType::Formal);
    }

    #[tokio::test]
    async fn invalid_geometry_fails_only_that_zone() {
        let mut bad = empty("bowtie", 28.50);
        bad.zone.boundary = vec![
            [28.50, -15.30],
            [28.51, -15.29],
            [28.51, -15.30],
            [28.50, -15.29],
            [28.50, -15.30],
        ];
        let inputs = [empty("first", 28.40), bad, empty("last", 28.60)];
        let outcome = run(&inputs, &AnalysisConfig::default()).await;

        assert_eq!(
            outcome
                .analyses
                .iter()
                .map(|a| a.zone.id.as_str())
                .collect::<Vec<_>>(),
            vec!["first", "last"]
        );
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].zone_id, "bowtie");
    }

    #[tokio::test]
    async fn extra_years_produce_a_trend() {
        let mut config = AnalysisConfig::default();
        config.analysis.years = vec![2015, 2020, 2025];
        let outcome = run(&[kanyama()], &config).await;
        let trend = outcome.analyses[0].population_trend.as_ref().unwrap();

        assert_eq!(trend.series.len(), 2);
        assert_eq!(trend.missing_years, vec![2025]);
        let cagr = trend.cagr_percent.unwrap();
        assert!((cagr - (1.21_f64.powf(0.2) - 1.0) * 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_year_is_a_data_issue() {
        let mut config = AnalysisConfig::default();
        config.analysis.year = 2010;
        let outcome = run(&[kanyama()], &config).await;
        let analysis = &outcome.analyses[0];

        assert_eq!(
            analysis.population.primary_method,
            EstimationMethod::BuildingFootprint
        );
        assert!(
            analysis
                .data_issues
                .iter()
                .any(|i| i.starts_with("gridded population"))
        );
    }
}
