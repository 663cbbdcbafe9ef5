//! GeoJSON zone input.
//!
//! Zones arrive as a `FeatureCollection` (or a single `Feature`) whose
//! polygon is the zone boundary. Zone metadata and the pre-computed
//! provider summaries travel in the feature properties:
//!
//! ```json
//! {
//!   "type": "Feature",
//!   "geometry": { "type": "Polygon", "coordinates": [[...]] },
//!   "properties": {
//!     "id": "kanyama-1",
//!     "zoneType": "mixed_use",
//!     "householdCount": 2400,
//!     "userClassification": { "density": "very_high_density_urban", "socioEconomic": "low" },
//!     "satellite": { "buildings": { ... }, "population": [ ... ] }
//!   }
//! }
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use geojson::{Feature, GeoJson, feature::Id};
use lusaka_waste_generation::collection::FREQUENCY_PER_WEEK;
use lusaka_waste_population_models::UserClassification;
use lusaka_waste_provider::memory::{InMemoryProvider, ZoneRecord};
use lusaka_waste_zone_models::{LonLat, Zone, ZoneType};
use serde::Deserialize;

/// File extensions picked up when the input is a directory.
pub const INPUT_EXTENSIONS: &[&str] = &["geojson", "json"];

/// Errors reading zone input.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// A file or directory could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The document is not valid GeoJSON.
    #[error("Invalid GeoJSON in {path}: {source}")]
    GeoJson {
        /// Source file.
        path: PathBuf,
        /// Underlying error.
        source: Box<geojson::Error>,
    },

    /// The document is a bare geometry rather than features.
    #[error("{path} is not a Feature or FeatureCollection")]
    NotFeatures {
        /// Source file.
        path: PathBuf,
    },

    /// A feature has no geometry.
    #[error("Zone {zone_id} has no geometry")]
    MissingGeometry {
        /// Zone id.
        zone_id: String,
    },

    /// A feature's geometry is not a single polygon.
    #[error("Zone {zone_id} has unsupported geometry: {kind}")]
    UnsupportedGeometry {
        /// Zone id.
        zone_id: String,
        /// What was found instead.
        kind: String,
    },

    /// Feature properties do not match the expected shape.
    #[error("Zone {zone_id} has invalid properties: {message}")]
    Properties {
        /// Zone id.
        zone_id: String,
        /// Deserialisation error.
        message: String,
    },

    /// The collection frequency is outside one to seven per week.
    #[error("Zone {zone_id} has invalid collection frequency: {frequency} per week")]
    InvalidFrequency {
        /// Zone id.
        zone_id: String,
        /// The rejected frequency.
        frequency: u8,
    },

    /// Two features share an id.
    #[error("Duplicate zone id {zone_id}")]
    DuplicateId {
        /// The repeated id.
        zone_id: String,
    },

    /// The input contained no zones.
    #[error("No zones found in {path}")]
    Empty {
        /// Input path.
        path: PathBuf,
    },
}

/// One zone ready for analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneInput {
    /// The zone and its metadata.
    pub zone: Zone,
    /// Provider summaries for the zone's polygon.
    pub record: ZoneRecord,
    /// Optional user classification.
    pub user: Option<UserClassification>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ZoneProperties {
    id: Option<String>,
    name: Option<String>,
    zone_type: Option<ZoneType>,
    estimated_population: Option<u64>,
    household_count: Option<u32>,
    business_count: Option<u32>,
    collection_frequency_per_week: Option<u8>,
    user_classification: Option<UserClassification>,
    satellite: ZoneRecord,
}

/// Loads zones from a GeoJSON file or from every GeoJSON file in a
/// directory, in file-name order.
///
/// # Errors
///
/// Returns [`InputError`] if any file cannot be read or parsed, a zone's
/// collection frequency is outside one to seven per week, a zone id
/// repeats, or no zones are found.
pub fn load_zones(path: &Path) -> Result<Vec<ZoneInput>, InputError> {
    let io_err = |source| InputError::Io {
        path: path.to_path_buf(),
        source,
    };

    let files = if path.is_dir() {
        let mut files = std::fs::read_dir(path)
            .map_err(io_err)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?;
        files.retain(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| INPUT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        });
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut zones = Vec::new();
    for file in &files {
        let source = std::fs::read_to_string(file).map_err(|source| InputError::Io {
            path: file.clone(),
            source,
        })?;
        let parsed = parse_zones(&source, file)?;
        log::info!("Loaded {} zone(s) from {}", parsed.len(), file.display());
        zones.extend(parsed);
    }

    check_unique(&zones)?;
    if zones.is_empty() {
        return Err(InputError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(zones)
}

/// Parses one GeoJSON document. `origin` is only used in error messages.
///
/// # Errors
///
/// Returns [`InputError`] if the document is not a feature or feature
/// collection, or a feature is not a valid zone.
pub fn parse_zones(source: &str, origin: &Path) -> Result<Vec<ZoneInput>, InputError> {
    let geojson: GeoJson = source.parse().map_err(|e| InputError::GeoJson {
        path: origin.to_path_buf(),
        source: Box::new(e),
    })?;

    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(InputError::NotFeatures {
                path: origin.to_path_buf(),
            });
        }
    };

    let stem = origin
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("zone");

    features
        .into_iter()
        .enumerate()
        .map(|(i, feature)| zone_from_feature(feature, &format!("{stem}-{}", i + 1)))
        .collect()
}

fn zone_from_feature(feature: Feature, fallback_id: &str) -> Result<ZoneInput, InputError> {
    let feature_id = feature.id.as_ref().map(|id| match id {
        Id::String(s) => s.clone(),
        Id::Number(n) => n.to_string(),
    });

    let properties: ZoneProperties = match feature.properties {
        Some(map) => serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| {
            InputError::Properties {
                zone_id: feature_id.clone().unwrap_or_else(|| fallback_id.to_string()),
                message: e.to_string(),
            }
        })?,
        None => ZoneProperties::default(),
    };

    let zone_id = properties
        .id
        .or(feature_id)
        .unwrap_or_else(|| fallback_id.to_string());

    let geometry = feature.geometry.ok_or_else(|| InputError::MissingGeometry {
        zone_id: zone_id.clone(),
    })?;
    let boundary = boundary_from(geometry, &zone_id)?;

    let mut zone = Zone::new(zone_id, boundary);
    zone.name = properties.name;
    if let Some(zone_type) = properties.zone_type {
        zone.zone_type = zone_type;
    }
    zone.estimated_population = properties.estimated_population;
    zone.household_count = properties.household_count;
    zone.business_count = properties.business_count;
    if let Some(frequency) = properties.collection_frequency_per_week {
        if !FREQUENCY_PER_WEEK.contains(&frequency) {
            return Err(InputError::InvalidFrequency {
                zone_id: zone.id,
                frequency,
            });
        }
        zone.collection_frequency_per_week = frequency;
    }

    Ok(ZoneInput {
        zone,
        record: properties.satellite,
        user: properties.user_classification,
    })
}

fn boundary_from(geometry: geojson::Geometry, zone_id: &str) -> Result<Vec<LonLat>, InputError> {
    let unsupported = |kind: &str| InputError::UnsupportedGeometry {
        zone_id: zone_id.to_string(),
        kind: kind.to_string(),
    };

    let geometry: geo::Geometry<f64> = geometry
        .try_into()
        .map_err(|e: geojson::Error| unsupported(&e.to_string()))?;

    let polygon = match geometry {
        geo::Geometry::Polygon(polygon) => polygon,
        geo::Geometry::MultiPolygon(multi) if multi.0.len() == 1 => {
            multi.0.into_iter().next().ok_or_else(|| unsupported("empty MultiPolygon"))?
        }
        geo::Geometry::MultiPolygon(multi) => {
            return Err(unsupported(&format!("MultiPolygon with {} parts", multi.0.len())));
        }
        other => return Err(unsupported(geometry_kind(&other))),
    };

    if !polygon.interiors().is_empty() {
        log::warn!(
            "Zone {zone_id}: ignoring {} interior ring(s)",
            polygon.interiors().len()
        );
    }

    Ok(polygon.exterior().coords().map(|c| [c.x, c.y]).collect())
}

const fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}

fn check_unique(zones: &[ZoneInput]) -> Result<(), InputError> {
    let mut seen = BTreeSet::new();
    for input in zones {
        if !seen.insert(input.zone.id.as_str()) {
            return Err(InputError::DuplicateId {
                zone_id: input.zone.id.clone(),
            });
        }
    }
    Ok(())
}

/// Builds a provider answering from the records carried by `zones`.
#[must_use]
pub fn provider_for(zones: &[ZoneInput]) -> InMemoryProvider {
    let mut provider = InMemoryProvider::new();
    for input in zones {
        if input.record.is_empty() {
            log::debug!("Zone {} carries no provider data", input.zone.id);
        }
        provider.insert(&input.zone.boundary, input.record.clone());
    }
    provider
}

#[cfg(test)]
mod tests {
    use lusaka_waste_population_models::SocioEconomicLevel;
    use lusaka_waste_zone_models::DensityCategory;

    use super::*;

    const COLLECTION: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "id": "chawama",
          "geometry": {
            "type": "Polygon",
            "coordinates": [[[28.27, -15.45], [28.28, -15.45], [28.28, -15.44], [28.27, -15.44], [28.27, -15.45]]]
          },
          "properties": {
            "name": "Chawama",
            "zoneType": "MIXED_USE",
            "householdCount": 2400,
            "collectionFrequencyPerWeek": 3,
            "userClassification": { "density": "very_high_density_urban", "socioEconomic": "low" },
            "satellite": {
              "population": [
                { "year": 2020, "totalPopulation": 16000.0, "densityPerSqkm": 13500.0, "pixelCount": 4 }
              ]
            }
          }
        },
        {
          "type": "Feature",
          "geometry": {
            "type": "MultiPolygon",
            "coordinates": [[[[28.30, -15.40], [28.31, -15.40], [28.31, -15.39], [28.30, -15.40]]]]
          },
          "properties": null
        }
      ]
    }"#;

    #[test]
    fn parses_properties_and_satellite_record() {
        let zones = parse_zones(COLLECTION, Path::new("lusaka.geojson")).unwrap();
        assert_eq!(zones.len(), 2);

        let chawama = &zones[0];
        assert_eq!(chawama.zone.id, "chawama");
        assert_eq!(chawama.zone.display_name(), "Chawama");
        assert_eq!(chawama.zone.zone_type, ZoneType::MixedUse);
        assert_eq!(chawama.zone.household_count, Some(2400));
        assert_eq!(chawama.zone.collection_frequency_per_week, 3);
        assert_eq!(chawama.zone.boundary.len(), 5);
        assert_eq!(chawama.zone.boundary[1], [28.28, -15.45]);
        assert_eq!(chawama.record.population.len(), 1);

        let user = chawama.user.as_ref().unwrap();
        assert_eq!(user.density, DensityCategory::VeryHighDensityUrban);
        assert_eq!(user.socio_economic, SocioEconomicLevel::Low);
    }

    #[test]
    fn unnamed_feature_gets_positional_id_and_defaults() {
        let zones = parse_zones(COLLECTION, Path::new("lusaka.geojson")).unwrap();
        let second = &zones[1];
        assert_eq!(second.zone.id, "lusaka-2");
        assert_eq!(second.zone.zone_type, ZoneType::Residential);
        assert_eq!(second.zone.collection_frequency_per_week, 2);
        assert!(second.record.is_empty());
        assert!(second.user.is_none());
    }

    #[test]
    fn rejects_non_polygon_geometry() {
        let source = r#"{
          "type": "Feature",
          "id": "depot",
          "geometry": { "type": "Point", "coordinates": [28.28, -15.41] },
          "properties": {}
        }"#;
        assert!(matches!(
            parse_zones(source, Path::new("depot.geojson")),
            Err(InputError::UnsupportedGeometry { zone_id, kind }) if zone_id == "depot" && kind == "Point"
        ));
    }

    #[test]
    fn rejects_bare_geometry_and_bad_properties() {
        let bare = r#"{ "type": "Point", "coordinates": [28.28, -15.41] }"#;
        assert!(matches!(
            parse_zones(bare, Path::new("bare.geojson")),
            Err(InputError::NotFeatures { .. })
        ));

        let bad = r#"{
          "type": "Feature",
          "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] },
          "properties": { "zoneType": "farmland" }
        }"#;
        assert!(matches!(
            parse_zones(bad, Path::new("bad.geojson")),
            Err(InputError::Properties { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_collection_frequency() {
        for frequency in [0, 9] {
            let source = format!(
                r#"{{
                  "type": "Feature",
                  "id": "matero",
                  "geometry": {{ "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] }},
                  "properties": {{ "collectionFrequencyPerWeek": {frequency} }}
                }}"#
            );
            let err = parse_zones(&source, Path::new("matero.geojson")).unwrap_err();
            assert!(matches!(
                &err,
                InputError::InvalidFrequency { zone_id, frequency: f } if zone_id == "matero" && *f == frequency
            ));
            assert!(err.to_string().contains("matero"));
        }

        let daily = r#"{
          "type": "Feature",
          "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] },
          "properties": { "collectionFrequencyPerWeek": 7 }
        }"#;
        let zones = parse_zones(daily, Path::new("daily.geojson")).unwrap();
        assert_eq!(zones[0].zone.collection_frequency_per_week, 7);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut zones = parse_zones(COLLECTION, Path::new("lusaka.geojson")).unwrap();
        zones[1].zone.id = "chawama".to_string();
        assert!(matches!(
            check_unique(&zones),
            Err(InputError::DuplicateId { zone_id }) if zone_id == "chawama"
        ));
    }

    #[test]
    fn provider_is_keyed_by_boundary() {
        let zones = parse_zones(COLLECTION, Path::new("lusaka.geojson")).unwrap();
        assert_eq!(provider_for(&zones).len(), 2);
    }
}
