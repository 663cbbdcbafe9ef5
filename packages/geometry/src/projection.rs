//! Local equirectangular projection between WGS84 degrees and metres.

use geo::Coord;
use lusaka_waste_zone_models::LonLat;

/// Mean length of one degree of latitude, in metres.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Projects degrees onto a plane tangent at the ring's mean position.
///
/// Longitude degrees shrink with `cos(latitude)`; the scale is fixed at
/// the origin latitude, which is accurate to well under a percent across
/// a zone a few kilometres tall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin: LonLat,
    meters_per_degree_lon: f64,
    meters_per_degree_lat: f64,
}

impl LocalProjection {
    /// Creates a projection centred on `origin`.
    #[must_use]
    pub fn new(origin: LonLat) -> Self {
        Self {
            origin,
            meters_per_degree_lon: METERS_PER_DEGREE * origin[1].to_radians().cos().abs(),
            meters_per_degree_lat: METERS_PER_DEGREE,
        }
    }

    /// Creates a projection centred on the mean vertex of `ring`, ignoring
    /// the closing vertex.
    #[must_use]
    pub fn for_ring(ring: &[LonLat]) -> Self {
        let vertices = match ring {
            [first, rest @ .., last] if first == last && !rest.is_empty() => &ring[..ring.len() - 1],
            _ => ring,
        };
        if vertices.is_empty() {
            return Self::new([0.0, 0.0]);
        }
        #[allow(clippy::cast_precision_loss)]
        let n = vertices.len() as f64;
        let (lon, lat) = vertices
            .iter()
            .fold((0.0, 0.0), |(lon, lat), p| (lon + p[0], lat + p[1]));
        Self::new([lon / n, lat / n])
    }

    /// Degrees to metres relative to the origin.
    #[must_use]
    pub fn project(&self, point: LonLat) -> Coord<f64> {
        Coord {
            x: (point[0] - self.origin[0]) * self.meters_per_degree_lon,
            y: (point[1] - self.origin[1]) * self.meters_per_degree_lat,
        }
    }

    /// Metres back to degrees.
    #[must_use]
    pub fn unproject(&self, coord: Coord<f64>) -> LonLat {
        [
            coord.x / self.meters_per_degree_lon + self.origin[0],
            coord.y / self.meters_per_degree_lat + self.origin[1],
        ]
    }
}
