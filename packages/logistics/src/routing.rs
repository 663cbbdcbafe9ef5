//! Distance between a zone and the disposal site.

use async_trait::async_trait;
use geo::{Distance as _, Haversine, Point};
use lusaka_waste_zone_models::LonLat;

use crate::LogisticsError;

/// A source of driving distances.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Returns a unique identifier for this provider.
    fn id(&self) -> &str;

    /// One-way driving distance in kilometres.
    async fn driving_distance_km(&self, from: LonLat, to: LonLat) -> Result<f64, LogisticsError>;
}

/// Great-circle distance in kilometres.
#[must_use]
pub fn great_circle_km(from: LonLat, to: LonLat) -> f64 {
    Haversine.distance(Point::new(from[0], from[1]), Point::new(to[0], to[1])) / 1_000.0
}

/// Routing provider that answers with the great-circle distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreatCircleRouting;

#[async_trait]
impl RoutingProvider for GreatCircleRouting {
    fn id(&self) -> &str {
        "great_circle"
    }

    async fn driving_distance_km(
        &self,
        from: LonLat,
        to: LonLat,
    ) -> Result<f64, LogisticsError> {
        Ok(great_circle_km(from, to))
    }
}
