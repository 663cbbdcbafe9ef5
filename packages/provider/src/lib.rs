#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Satellite data provider contract.
//!
//! The raw imagery layer is an external collaborator. Anything that can
//! reduce building footprints, height rasters and gridded population
//! rasters to the summaries in [`lusaka_waste_provider_models`] implements
//! [`SatelliteDataProvider`]. Every call returns an explicit
//! [`ProviderError`] on failure so the estimation chain can fall back
//! deterministically.
//!
//! Callers should not invoke a provider directly. [`gateway::ProviderGateway`]
//! adds per-call timeouts, exponential backoff on quota errors and the
//! TTL [`cache::AnalysisCache`].

pub mod cache;
pub mod gateway;
pub mod memory;
pub mod retry;

use async_trait::async_trait;
use lusaka_waste_provider_models::{
    BuildingDataset, BuildingSummary, DateRange, GriddedPopulation, LandCoverIndices,
};
use lusaka_waste_zone_models::LonLat;

/// Errors a provider can report for a single request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// The provider has no data for this place or time.
    #[error("Data unavailable: {message}")]
    DataUnavailable {
        /// What was missing.
        message: String,
    },

    /// Rate limit or quota exhausted. The only retryable error.
    #[error("Quota exceeded: {message}")]
    QuotaExceeded {
        /// Provider message.
        message: String,
    },

    /// Credentials rejected.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Provider message.
        message: String,
    },

    /// The request did not complete within the per-call timeout.
    #[error("Request timed out after {seconds:.1}s")]
    Timeout {
        /// The timeout that elapsed.
        seconds: f64,
    },
}

impl ProviderError {
    /// Returns `true` if the request may succeed when retried later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Shorthand for a [`Self::DataUnavailable`] error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::DataUnavailable {
            message: message.into(),
        }
    }
}

/// Trait that every satellite data backend implements.
#[async_trait]
pub trait SatelliteDataProvider: Send + Sync {
    /// Returns a unique identifier for this provider (e.g., `"memory"`).
    fn id(&self) -> &str;

    /// Summarises building footprints intersecting `boundary`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the dataset has no coverage or the
    /// request fails.
    async fn building_summary(
        &self,
        boundary: &[LonLat],
        dataset: BuildingDataset,
        confidence_threshold: f64,
    ) -> Result<BuildingSummary, ProviderError>;

    /// Sums the gridded population raster for `year` over `boundary`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if no raster exists for the year or the
    /// request fails.
    async fn gridded_population(
        &self,
        boundary: &[LonLat],
        year: i32,
    ) -> Result<GriddedPopulation, ProviderError>;

    /// Averages vegetation and built-up indices over `boundary`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if no cloud-free imagery exists for the
    /// range or the request fails.
    async fn land_cover_indices(
        &self,
        boundary: &[LonLat],
        range: DateRange,
    ) -> Result<LandCoverIndices, ProviderError>;
}
