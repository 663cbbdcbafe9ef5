//! Population change across gridded-population years.

use futures::future::join_all;
use lusaka_waste_provider::gateway::ProviderGateway;
use lusaka_waste_zone_models::LonLat;
use serde::{Deserialize, Serialize};

/// Gridded population for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearPopulation {
    /// Raster year.
    pub year: i32,
    /// Uncorrected raster sum.
    pub population: f64,
    /// Density reported with the raster.
    pub density_per_sqkm: f64,
}

/// Per-year population series for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationTrend {
    /// Available years in ascending order.
    pub series: Vec<YearPopulation>,
    /// Requested years the provider had no data for.
    pub missing_years: Vec<i32>,
    /// Compound annual growth between the first and last available year,
    /// in percent.
    pub cagr_percent: Option<f64>,
}

impl PopulationTrend {
    /// Builds a trend from unordered observations.
    #[must_use]
    pub fn from_series(mut series: Vec<YearPopulation>, mut missing_years: Vec<i32>) -> Self {
        series.sort_by_key(|p| p.year);
        series.dedup_by_key(|p| p.year);
        missing_years.sort_unstable();
        missing_years.dedup();

        let cagr_percent = match (series.first(), series.last()) {
            (Some(first), Some(last)) => compound_annual_growth(first, last),
            _ => None,
        };

        Self {
            series,
            missing_years,
            cagr_percent,
        }
    }
}

/// `((last / first)^(1 / years) - 1) × 100`, or `None` when the span is
/// empty or the first value is not positive.
#[must_use]
pub fn compound_annual_growth(first: &YearPopulation, last: &YearPopulation) -> Option<f64> {
    let years = last.year - first.year;
    if years <= 0 || first.population <= 0.0 || last.population < 0.0 {
        return None;
    }
    let growth = (last.population / first.population).powf(1.0 / f64::from(years));
    Some((growth - 1.0) * 100.0)
}

/// Queries every year in `years` and assembles the trend.
pub async fn population_trend(
    gateway: &ProviderGateway<'_>,
    boundary: &[LonLat],
    years: &[i32],
) -> PopulationTrend {
    let lookups = years.iter().map(|&year| async move {
        (year, gateway.gridded_population(boundary, year).await)
    });

    let mut series = Vec::new();
    let mut missing = Vec::new();
    for (year, result) in join_all(lookups).await {
        match result {
            Ok(p) => series.push(YearPopulation {
                year,
                population: p.total_population,
                density_per_sqkm: p.density_per_sqkm,
            }),
            Err(e) => {
                log::debug!("No gridded population for {year}: {e}");
                missing.push(year);
            }
        }
    }

    PopulationTrend::from_series(series, missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(year: i32, population: f64) -> YearPopulation {
        YearPopulation {
            year,
            population,
            density_per_sqkm: population,
        }
    }

    #[test]
    fn cagr_over_two_years() {
        let cagr = compound_annual_growth(&point(2018, 1_000.0), &point(2020, 1_210.0)).unwrap();
        assert!((cagr - 10.0).abs() < 1e-9);
    }

    #[test]
    fn cagr_undefined_for_single_year_or_zero_start() {
        assert!(compound_annual_growth(&point(2020, 1_000.0), &point(2020, 1_000.0)).is_none());
        assert!(compound_annual_growth(&point(2015, 0.0), &point(2020, 1_000.0)).is_none());
    }

    #[test]
    fn series_is_sorted_and_deduplicated() {
        let trend = PopulationTrend::from_series(
            vec![point(2020, 1_210.0), point(2018, 1_000.0), point(2020, 1_210.0)],
            vec![2019, 2017, 2019],
        );
        assert_eq!(
            trend.series.iter().map(|p| p.year).collect::<Vec<_>>(),
            vec![2018, 2020]
        );
        assert_eq!(trend.missing_years, vec![2017, 2019]);
        assert!((trend.cagr_percent.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_series_has_no_growth() {
        let trend = PopulationTrend::from_series(vec![], vec![2020]);
        assert!(trend.cagr_percent.is_none());
    }
}
