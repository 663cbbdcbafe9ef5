//! Ranking of zones analysed in the same batch.

use serde::Serialize;

use crate::ZoneAnalysis;

/// One zone's position in each ranking. Rank 1 is the highest value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRanking {
    /// Zone id.
    pub zone_id: String,
    /// Display name.
    pub zone_name: String,
    /// Daily waste in kg.
    pub daily_kg: f64,
    /// Daily waste per hectare.
    pub waste_per_hectare: f64,
    /// Validation reliability score.
    pub reliability_score: f64,
    /// Rank by daily waste.
    pub daily_waste_rank: usize,
    /// Rank by waste per hectare.
    pub waste_per_hectare_rank: usize,
    /// Rank by reliability.
    pub reliability_rank: usize,
}

/// Totals and rankings across a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    /// Zones compared.
    pub zone_count: usize,
    /// Sum of consensus populations.
    pub total_population: u64,
    /// Sum of daily waste.
    pub total_daily_kg: f64,
    /// Sum of monthly fleet cost.
    pub total_monthly_cost: f64,
    /// Sum of monthly revenue.
    pub total_monthly_revenue: f64,
    /// Zone generating the most waste.
    pub highest_waste_zone: String,
    /// Zone with the most reliable estimate.
    pub most_reliable_zone: String,
    /// Per-zone rankings, in input order.
    pub rankings: Vec<ZoneRanking>,
}

/// 1-based descending ranks. Ties keep input order.
fn ranks(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let mut out = vec![0; values.len()];
    for (rank, index) in order.into_iter().enumerate() {
        out[index] = rank + 1;
    }
    out
}

fn first_ranked(rankings: &[ZoneRanking], rank_of: impl Fn(&ZoneRanking) -> usize) -> String {
    rankings
        .iter()
        .find(|r| rank_of(r) == 1)
        .map(|r| r.zone_id.clone())
        .unwrap_or_default()
}

/// Compares the zones of a batch. Returns `None` for fewer than two.
#[must_use]
pub fn compare(analyses: &[ZoneAnalysis]) -> Option<ComparisonSummary> {
    if analyses.len() < 2 {
        return None;
    }

    let daily: Vec<f64> = analyses.iter().map(|a| a.waste.daily_kg).collect();
    let per_hectare: Vec<f64> = analyses.iter().map(ZoneAnalysis::waste_per_hectare).collect();
    let reliability: Vec<f64> = analyses
        .iter()
        .map(|a| a.validation.reliability_score())
        .collect();

    let daily_ranks = ranks(&daily);
    let per_hectare_ranks = ranks(&per_hectare);
    let reliability_ranks = ranks(&reliability);

    let rankings: Vec<ZoneRanking> = analyses
        .iter()
        .enumerate()
        .map(|(i, a)| ZoneRanking {
            zone_id: a.zone.id.clone(),
            zone_name: a.zone.display_name().to_string(),
            daily_kg: daily[i],
            waste_per_hectare: per_hectare[i],
            reliability_score: reliability[i],
            daily_waste_rank: daily_ranks[i],
            waste_per_hectare_rank: per_hectare_ranks[i],
            reliability_rank: reliability_ranks[i],
        })
        .collect();

    let highest_waste_zone = first_ranked(&rankings, |r| r.daily_waste_rank);
    let most_reliable_zone = first_ranked(&rankings, |r| r.reliability_rank);

    Some(ComparisonSummary {
        zone_count: analyses.len(),
        total_population: analyses.iter().map(|a| a.population.consensus_value).sum(),
        total_daily_kg: daily.iter().sum(),
        total_monthly_cost: analyses.iter().map(|a| a.logistics.monthly_cost).sum(),
        total_monthly_revenue: analyses.iter().map(|a| a.revenue.monthly_revenue).sum(),
        highest_waste_zone,
        most_reliable_zone,
        rankings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_descending_with_stable_ties() {
        assert_eq!(ranks(&[3.0, 9.0, 3.0, 1.0]), vec![2, 1, 3, 4]);
        assert!(ranks(&[]).is_empty());
    }

    #[test]
    fn single_zone_is_not_compared() {
        assert!(compare(&[]).is_none());
    }
}
