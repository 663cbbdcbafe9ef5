//! Advisory insights attached to a zone analysis.
//!
//! Insights never change numeric results. A provider that fails or runs
//! past its timeout leaves the insights field empty.

use std::time::Duration;

use async_trait::async_trait;
use lusaka_waste_validation::QualityLevel;
use lusaka_waste_zone_models::{Confidence, DensityCategory, SettlementType};
use serde::Serialize;

/// Figures an insight provider sees for one zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSummary {
    /// Zone id.
    pub zone_id: String,
    /// Consensus population.
    pub population: u64,
    /// Confidence of the consensus population.
    pub population_confidence: Confidence,
    /// Why the consensus was adjusted, if it was.
    pub adjustment_reason: Option<String>,
    /// Density bucket.
    pub density_category: DensityCategory,
    /// Settlement type used by the waste model.
    pub settlement_type: SettlementType,
    /// Daily waste in kg.
    pub daily_kg: f64,
    /// Configured collections per week.
    pub frequency_per_week: u8,
    /// Days between collections the density suggests.
    pub recommended_interval_days: u8,
    /// 10-tonne trucks needed.
    pub trucks_10t: u32,
    /// Monthly cost of the recommended fleet.
    pub monthly_cost: f64,
    /// Monthly revenue at the configured tariff.
    pub monthly_revenue: f64,
    /// Quality bucket of the validation report.
    pub quality_level: QualityLevel,
    /// Estimation methods flagged as outliers.
    pub outliers: Vec<String>,
    /// Data problems encountered during the analysis.
    pub data_issues: Vec<String>,
}

/// Errors an insight provider may return.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InsightError {
    /// The provider could not produce insights.
    #[error("Insight provider unavailable: {0}")]
    Unavailable(String),
}

/// Produces free-text recommendations for a zone.
#[async_trait]
pub trait InsightProvider: Send + Sync {
    /// Returns a unique identifier for this provider.
    fn id(&self) -> &str;

    /// Generates recommendations for `summary`.
    ///
    /// # Errors
    ///
    /// Returns [`InsightError`] if the provider cannot answer.
    async fn generate_insights(&self, summary: &ZoneSummary) -> Result<Vec<String>, InsightError>;
}

/// Calls `provider`, swallowing failures and timeouts into `None`.
pub async fn gather(
    provider: &dyn InsightProvider,
    summary: &ZoneSummary,
    timeout: Duration,
) -> Option<Vec<String>> {
    match tokio::time::timeout(timeout, provider.generate_insights(summary)).await {
        Ok(Ok(insights)) => Some(insights),
        Ok(Err(e)) => {
            log::warn!("{} insights failed for {}: {e}", provider.id(), summary.zone_id);
            None
        }
        Err(_) => {
            log::warn!(
                "{} insights timed out after {timeout:?} for {}",
                provider.id(),
                summary.zone_id
            );
            None
        }
    }
}

/// Deterministic recommendations from fixed thresholds.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedInsights;

impl RuleBasedInsights {
    fn rules(summary: &ZoneSummary) -> Vec<String> {
        let mut out = Vec::new();

        if summary.population_confidence == Confidence::Low {
            out.push(
                "Population is a low-confidence fallback; confirm with a household count before committing fleet."
                    .to_string(),
            );
        }
        if let Some(reason) = &summary.adjustment_reason {
            out.push(format!("Population sources disagree: {reason}."));
        }
        if !summary.outliers.is_empty() {
            out.push(format!(
                "Outlying estimates from {}; review their inputs.",
                summary.outliers.join(", ")
            ));
        }

        let recommended_per_week = 7 / summary.recommended_interval_days.max(1);
        if summary.frequency_per_week < recommended_per_week {
            out.push(format!(
                "{} zones usually need collection every {} day(s); {} per week risks overflow.",
                summary.density_category.label(),
                summary.recommended_interval_days,
                summary.frequency_per_week
            ));
        }

        if summary.settlement_type == SettlementType::Informal {
            out.push(
                "Informal layout: plan communal collection points where truck access is limited."
                    .to_string(),
            );
        }
        if summary.trucks_10t > lusaka_waste_logistics::SMALL_FLEET_LIMIT {
            out.push(format!(
                "{} ten-tonne trucks per collection; twenty-tonne trucks reduce trips.",
                summary.trucks_10t
            ));
        }
        if summary.monthly_revenue < summary.monthly_cost {
            out.push(format!(
                "Projected revenue K{:.0} does not cover monthly cost K{:.0}.",
                summary.monthly_revenue, summary.monthly_cost
            ));
        }
        if matches!(summary.quality_level, QualityLevel::Poor | QualityLevel::VeryPoor) {
            out.push(format!(
                "Data quality is {}; treat figures as indicative.",
                summary.quality_level
            ));
        }

        out
    }
}

#[async_trait]
impl InsightProvider for RuleBasedInsights {
    fn id(&self) -> &str {
        "rules"
    }

    async fn generate_insights(&self, summary: &ZoneSummary) -> Result<Vec<String>, InsightError> {
        Ok(Self::rules(summary))
    }
}
