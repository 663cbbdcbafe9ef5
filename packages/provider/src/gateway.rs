//! Cached, retrying access to a [`SatelliteDataProvider`].

use lusaka_waste_provider_models::{
    BuildingDataset, BuildingSummary, DateRange, GriddedPopulation, LandCoverIndices,
};
use lusaka_waste_zone_models::LonLat;

use crate::cache::{AnalysisCache, cache_key};
use crate::retry::{RetryPolicy, with_backoff};
use crate::{ProviderError, SatelliteDataProvider};

/// Borrowed view combining a provider, the run's cache and a retry policy.
#[derive(Clone, Copy)]
pub struct ProviderGateway<'a> {
    provider: &'a dyn SatelliteDataProvider,
    cache: &'a AnalysisCache,
    policy: &'a RetryPolicy,
}

impl<'a> ProviderGateway<'a> {
    /// Creates a gateway over `provider`.
    #[must_use]
    pub const fn new(
        provider: &'a dyn SatelliteDataProvider,
        cache: &'a AnalysisCache,
        policy: &'a RetryPolicy,
    ) -> Self {
        Self {
            provider,
            cache,
            policy,
        }
    }

    /// The underlying provider's id.
    #[must_use]
    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Fetches a building summary, consulting the cache first.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the provider fails after retries.
    pub async fn building_summary(
        &self,
        boundary: &[LonLat],
        dataset: BuildingDataset,
        confidence_threshold: f64,
    ) -> Result<BuildingSummary, ProviderError> {
        let key = cache_key(
            boundary,
            &format!("buildings:{dataset}:{confidence_threshold}"),
        );
        if let Some(hit) = self.cache.buildings.get(&key) {
            log::debug!("Building summary cache hit ({dataset})");
            return Ok(hit);
        }

        let label = format!("{} buildings ({dataset})", self.provider.id());
        let summary = with_backoff(self.policy, &label, || {
            self.provider
                .building_summary(boundary, dataset, confidence_threshold)
        })
        .await?;

        self.cache.buildings.insert(key, summary.clone());
        Ok(summary)
    }

    /// Fetches the gridded population for `year`, consulting the cache first.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the provider fails after retries.
    pub async fn gridded_population(
        &self,
        boundary: &[LonLat],
        year: i32,
    ) -> Result<GriddedPopulation, ProviderError> {
        let key = cache_key(boundary, &format!("population:{year}"));
        if let Some(hit) = self.cache.population.get(&key) {
            log::debug!("Gridded population cache hit ({year})");
            return Ok(hit);
        }

        let label = format!("{} population ({year})", self.provider.id());
        let population = with_backoff(self.policy, &label, || {
            self.provider.gridded_population(boundary, year)
        })
        .await?;

        self.cache.population.insert(key, population);
        Ok(population)
    }

    /// Fetches land-cover indices for `range`, consulting the cache first.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the provider fails after retries.
    pub async fn land_cover_indices(
        &self,
        boundary: &[LonLat],
        range: DateRange,
    ) -> Result<LandCoverIndices, ProviderError> {
        let key = cache_key(
            boundary,
            &format!("land_cover:{}:{}", range.start, range.end),
        );
        if let Some(hit) = self.cache.land_cover.get(&key) {
            log::debug!("Land cover cache hit ({}..{})", range.start, range.end);
            return Ok(hit);
        }

        let label = format!("{} land cover", self.provider.id());
        let indices = with_backoff(self.policy, &label, || {
            self.provider.land_cover_indices(boundary, range)
        })
        .await?;

        self.cache.land_cover.insert(key, indices);
        Ok(indices)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;

    const SQUARE: &[LonLat] = &[
        [28.28, -15.41],
        [28.29, -15.41],
        [28.29, -15.40],
        [28.28, -15.40],
    ];

    struct CountingProvider {
        population_calls: AtomicU32,
    }

    #[async_trait]
    impl SatelliteDataProvider for CountingProvider {
        fn id(&self) -> &str {
            "counting"
        }

        async fn building_summary(
            &self,
            _boundary: &[LonLat],
            _dataset: BuildingDataset,
            _confidence_threshold: f64,
        ) -> Result<BuildingSummary, ProviderError> {
            Err(ProviderError::unavailable("no footprints"))
        }

        async fn gridded_population(
            &self,
            _boundary: &[LonLat],
            year: i32,
        ) -> Result<GriddedPopulation, ProviderError> {
            self.population_calls.fetch_add(1, Ordering::SeqCst);
            Ok(GriddedPopulation {
                year,
                total_population: 12_000.0,
                density_per_sqkm: 10_000.0,
                pixel_count: 4,
                pixel_coefficient_of_variation: None,
            })
        }

        async fn land_cover_indices(
            &self,
            _boundary: &[LonLat],
            _range: DateRange,
        ) -> Result<LandCoverIndices, ProviderError> {
            Err(ProviderError::unavailable("cloudy"))
        }
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let provider = CountingProvider {
            population_calls: AtomicU32::new(0),
        };
        let cache = AnalysisCache::default();
        let policy = RetryPolicy::default();
        let gateway = ProviderGateway::new(&provider, &cache, &policy);

        let first = gateway.gridded_population(SQUARE, 2020).await.unwrap();
        let second = gateway.gridded_population(SQUARE, 2020).await.unwrap();
        gateway.gridded_population(SQUARE, 2015).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.population_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let provider = CountingProvider {
            population_calls: AtomicU32::new(0),
        };
        let cache = AnalysisCache::default();
        let policy = RetryPolicy::default();
        let gateway = ProviderGateway::new(&provider, &cache, &policy);

        let result = gateway
            .building_summary(SQUARE, BuildingDataset::OpenBuildings, 0.75)
            .await;
        assert!(matches!(result, Err(ProviderError::DataUnavailable { .. })));
        assert!(cache.buildings.is_empty());
    }
}
