//! Provider backed by pre-computed summaries held in memory.
//!
//! Used by the batch CLI, where zone input files carry the provider
//! summaries alongside each polygon, and by tests. Records are looked up
//! by a hash of the boundary ring, so the same polygon always resolves to
//! the same record regardless of which zone id it was loaded under.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lusaka_waste_provider_models::{
    BuildingDataset, BuildingSummary, DateRange, GriddedPopulation, LandCoverIndices,
};
use lusaka_waste_zone_models::LonLat;
use serde::{Deserialize, Serialize};

use crate::cache::cache_key;
use crate::{ProviderError, SatelliteDataProvider};

/// Everything the provider knows about one polygon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRecord {
    /// Primary footprint dataset summary.
    #[serde(default)]
    pub buildings: Option<BuildingSummary>,
    /// Secondary footprint dataset summary.
    #[serde(default)]
    pub secondary_buildings: Option<BuildingSummary>,
    /// Gridded population, one entry per raster year.
    #[serde(default)]
    pub population: Vec<GriddedPopulation>,
    /// Land-cover indices.
    #[serde(default)]
    pub land_cover: Option<LandCoverIndices>,
}

impl ZoneRecord {
    /// `true` when the record carries no data at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_none()
            && self.secondary_buildings.is_none()
            && self.population.is_empty()
            && self.land_cover.is_none()
    }
}

/// A [`SatelliteDataProvider`] answering from a fixed set of records.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    records: BTreeMap<String, ZoneRecord>,
}

impl InMemoryProvider {
    /// Creates a provider with no records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the record for `boundary`, replacing any previous one.
    pub fn insert(&mut self, boundary: &[LonLat], record: ZoneRecord) {
        self.records.insert(boundary_key(boundary), record);
    }

    /// Number of registered polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` when no polygons are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record(&self, boundary: &[LonLat]) -> Result<&ZoneRecord, ProviderError> {
        self.records
            .get(&boundary_key(boundary))
            .ok_or_else(|| ProviderError::unavailable("no satellite coverage for this polygon"))
    }
}

fn boundary_key(boundary: &[LonLat]) -> String {
    cache_key(boundary, "")
}

#[async_trait]
impl SatelliteDataProvider for InMemoryProvider {
    fn id(&self) -> &str {
        "memory"
    }

    async fn building_summary(
        &self,
        boundary: &[LonLat],
        dataset: BuildingDataset,
        _confidence_threshold: f64,
    ) -> Result<BuildingSummary, ProviderError> {
        let record = self.record(boundary)?;
        let summary = match dataset {
            BuildingDataset::OpenBuildings => record.buildings.as_ref(),
            BuildingDataset::MicrosoftBuildings => record.secondary_buildings.as_ref(),
        };
        summary
            .map(|s| BuildingSummary {
                dataset,
                ..s.clone()
            })
            .ok_or_else(|| ProviderError::unavailable(format!("no {dataset} footprints")))
    }

    async fn gridded_population(
        &self,
        boundary: &[LonLat],
        year: i32,
    ) -> Result<GriddedPopulation, ProviderError> {
        self.record(boundary)?
            .population
            .iter()
            .find(|p| p.year == year)
            .copied()
            .ok_or_else(|| ProviderError::unavailable(format!("no population raster for {year}")))
    }

    async fn land_cover_indices(
        &self,
        boundary: &[LonLat],
        _range: DateRange,
    ) -> Result<LandCoverIndices, ProviderError> {
        self.record(boundary)?
            .land_cover
            .ok_or_else(|| ProviderError::unavailable("no land cover imagery"))
    }
}
