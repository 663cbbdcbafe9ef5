//! Bounded in-process cache for provider results.
//!
//! Entries are keyed by a SHA-256 of the zone boundary plus the request
//! parameters, and every entry type carries its own TTL: building
//! summaries are long-lived, population raster lookups expire after an
//! hour. Only successful responses are cached.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lusaka_waste_provider_models::{BuildingSummary, GriddedPopulation, LandCoverIndices};
use lusaka_waste_zone_models::LonLat;
use sha2::{Digest as _, Sha256};

/// Default maximum number of entries per entry type.
pub const DEFAULT_CAPACITY: usize = 1_024;

/// Default TTL for building summaries.
pub const DEFAULT_BUILDING_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default TTL for gridded population lookups.
pub const DEFAULT_POPULATION_TTL: Duration = Duration::from_secs(60 * 60);

/// Default TTL for land-cover indices.
pub const DEFAULT_LAND_COVER_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Hashes a boundary ring and request parameters into a cache key.
#[must_use]
pub fn cache_key(boundary: &[LonLat], params: &str) -> String {
    let mut hasher = Sha256::new();
    for [lon, lat] in boundary {
        hasher.update(lon.to_le_bytes());
        hasher.update(lat.to_le_bytes());
    }
    hasher.update(params.as_bytes());
    hex::encode(hasher.finalize())
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// A size-bounded map whose entries expire after a fixed TTL.
pub struct TtlCache<V> {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<BTreeMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache. A zero `capacity` disables caching.
    #[must_use]
    pub const fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns a live entry, dropping it if it has expired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Inserts or replaces an entry, evicting to stay within capacity.
    pub fn insert(&self, key: String, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Number of stored entries, including any not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if now.saturating_duration_since(entry.inserted_at) > self.ttl {
            entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    fn insert_at(&self, key: String, value: V, now: Instant) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, e| now.saturating_duration_since(e.inserted_at) <= ttl);

            if entries.len() >= self.capacity
                && let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }
}

/// Capacity and TTL settings for [`AnalysisCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum entries per entry type.
    pub capacity: usize,
    /// TTL for building summaries.
    pub building_ttl: Duration,
    /// TTL for gridded population lookups.
    pub population_ttl: Duration,
    /// TTL for land-cover indices.
    pub land_cover_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            building_ttl: DEFAULT_BUILDING_TTL,
            population_ttl: DEFAULT_POPULATION_TTL,
            land_cover_ttl: DEFAULT_LAND_COVER_TTL,
        }
    }
}

/// Provider response cache shared by reference across one analysis run.
pub struct AnalysisCache {
    /// Building summaries keyed by boundary, dataset and threshold.
    pub buildings: TtlCache<BuildingSummary>,
    /// Gridded population keyed by boundary and year.
    pub population: TtlCache<GriddedPopulation>,
    /// Land-cover indices keyed by boundary and date range.
    pub land_cover: TtlCache<LandCoverIndices>,
}

impl AnalysisCache {
    /// Creates empty caches with the given settings.
    #[must_use]
    pub const fn new(settings: CacheSettings) -> Self {
        Self {
            buildings: TtlCache::new(settings.capacity, settings.building_ttl),
            population: TtlCache::new(settings.capacity, settings.population_ttl),
            land_cover: TtlCache::new(settings.capacity, settings.land_cover_ttl),
        }
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &[LonLat] = &[
        [28.28, -15.41],
        [28.29, -15.41],
        [28.29, -15.40],
        [28.28, -15.40],
        [28.28, -15.41],
    ];

    #[test]
    fn key_depends_on_geometry_and_params() {
        let a = cache_key(SQUARE, "year=2020");
        assert_eq!(a, cache_key(SQUARE, "year=2020"));
        assert_ne!(a, cache_key(SQUARE, "year=2021"));
        assert_ne!(a, cache_key(&SQUARE[1..], "year=2020"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = TtlCache::new(8, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("k".to_string(), 7, t0);

        assert_eq!(cache.get_at("k", t0 + Duration::from_secs(30)), Some(7));
        assert_eq!(cache.get_at("k", t0 + Duration::from_secs(61)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = TtlCache::new(2, Duration::from_secs(600));
        let t0 = Instant::now();
        cache.insert_at("a".to_string(), 1, t0);
        cache.insert_at("b".to_string(), 2, t0 + Duration::from_secs(1));
        cache.insert_at("c".to_string(), 3, t0 + Duration::from_secs(2));

        let now = t0 + Duration::from_secs(3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at("a", now), None);
        assert_eq!(cache.get_at("b", now), Some(2));
        assert_eq!(cache.get_at("c", now), Some(3));
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let cache = TtlCache::new(0, Duration::from_secs(600));
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get("a"), None);
    }
}
