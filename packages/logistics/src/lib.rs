#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Collection logistics.
//!
//! For each truck class the cost of one collection round is broken down
//! into operational cost per trip, fuel for the round trip to the
//! disposal site, and the disposal franchise fee. The fee is charged per
//! whole tonne carried by each truck.
//!
//! The smaller class is only a candidate while a collection needs at most
//! [`SMALL_FLEET_LIMIT`] trucks; above that the larger class is used.

pub mod routing;

use std::time::Duration;

use lusaka_waste_waste_models::CollectionRequirement;
use lusaka_waste_zone_models::LonLat;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::routing::{RoutingProvider, great_circle_km};

/// Largest small-truck fleet for which the cheaper class is chosen.
pub const SMALL_FLEET_LIMIT: u32 = 3;

/// Chunga landfill, Lusaka's main disposal site.
pub const CHUNGA_LANDFILL: LonLat = [28.2362, -15.3707];

/// Errors from logistics planning.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LogisticsError {
    /// A coordinate is not finite.
    #[error("Invalid coordinate ({lon}, {lat})")]
    InvalidCoordinate {
        /// Longitude.
        lon: f64,
        /// Latitude.
        lat: f64,
    },

    /// The routing provider could not answer.
    #[error("Routing failed: {message}")]
    Routing {
        /// Provider message.
        message: String,
    },
}

/// Truck size.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TruckClass {
    /// 10-tonne trucks.
    TenTonne,
    /// 20-tonne trucks.
    TwentyTonne,
}

/// Where the distance figure came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DistanceSource {
    /// A routing provider's driving distance.
    Routing,
    /// Great-circle distance.
    GreatCircle,
}

/// Cost constants for fleet planning. Money is in kwacha.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LogisticsConfig {
    /// Disposal site `[lon, lat]`.
    pub disposal_site: LonLat,
    /// Diesel price per litre.
    pub fuel_price_per_litre: f64,
    /// Fuel use of a 10-tonne truck.
    pub small_truck_litres_per_km: f64,
    /// Fuel use of a 20-tonne truck.
    pub large_truck_litres_per_km: f64,
    /// Crew, maintenance and depreciation per 10-tonne truck trip.
    pub small_truck_cost_per_trip: f64,
    /// Crew, maintenance and depreciation per 20-tonne truck trip.
    pub large_truck_cost_per_trip: f64,
    /// Disposal franchise fee per tonne.
    pub franchise_fee_per_tonne: f64,
    /// Upper bound on a routing request.
    #[serde(with = "duration_secs")]
    pub routing_timeout: Duration,
}

impl Default for LogisticsConfig {
    fn default() -> Self {
        Self {
            disposal_site: CHUNGA_LANDFILL,
            fuel_price_per_litre: 27.0,
            small_truck_litres_per_km: 0.35,
            large_truck_litres_per_km: 0.5,
            small_truck_cost_per_trip: 450.0,
            large_truck_cost_per_trip: 700.0,
            franchise_fee_per_tonne: 50.0,
            routing_timeout: Duration::from_secs(10),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Per-component cost of one collection round or one month.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    /// Operational cost.
    pub operational: f64,
    /// Fuel cost.
    pub fuel: f64,
    /// Disposal franchise fee.
    pub franchise_fee: f64,
    /// Sum of the three components.
    pub total: f64,
}

impl CostBreakdown {
    fn new(operational: f64, fuel: f64, franchise_fee: f64) -> Self {
        Self {
            operational,
            fuel,
            franchise_fee,
            total: operational + fuel + franchise_fee,
        }
    }

    fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.operational * factor,
            self.fuel * factor,
            self.franchise_fee * factor,
        )
    }
}

/// Costs for one truck class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckClassPlan {
    /// The class.
    pub truck_class: TruckClass,
    /// Trucks per collection round.
    pub trucks: u32,
    /// Whole tonnes billed per truck at the disposal site.
    pub billed_tonnes_per_truck: u32,
    /// Cost of one collection round.
    pub per_collection: CostBreakdown,
    /// Cost of an average month.
    pub monthly: CostBreakdown,
}

/// Logistics plan for a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogisticsReport {
    /// Disposal site used.
    pub disposal_site: LonLat,
    /// One-way distance to the disposal site.
    pub distance_km: f64,
    /// Where `distance_km` came from.
    pub distance_source: DistanceSource,
    /// 10-tonne fleet costs.
    pub small_fleet: TruckClassPlan,
    /// 20-tonne fleet costs.
    pub large_fleet: TruckClassPlan,
    /// Chosen class.
    pub recommended_truck_class: TruckClass,
    /// Monthly cost of the chosen class.
    pub monthly_cost: f64,
}

impl LogisticsReport {
    /// Plan for the recommended class.
    #[must_use]
    pub const fn recommended(&self) -> &TruckClassPlan {
        match self.recommended_truck_class {
            TruckClass::TenTonne => &self.small_fleet,
            TruckClass::TwentyTonne => &self.large_fleet,
        }
    }
}

/// Plans collection logistics for zones.
pub struct CollectionLogistics {
    config: LogisticsConfig,
    routing: Option<Box<dyn RoutingProvider>>,
}

impl CollectionLogistics {
    /// Planner using great-circle distances only.
    #[must_use]
    pub const fn new(config: LogisticsConfig) -> Self {
        Self {
            config,
            routing: None,
        }
    }

    /// Planner that asks `routing` for driving distances first.
    #[must_use]
    pub fn with_routing(config: LogisticsConfig, routing: Box<dyn RoutingProvider>) -> Self {
        Self {
            config,
            routing: Some(routing),
        }
    }

    /// The planner's cost constants.
    #[must_use]
    pub const fn config(&self) -> &LogisticsConfig {
        &self.config
    }

    /// One-way distance from `origin` to the disposal site.
    ///
    /// Falls back to great-circle distance if the routing provider fails,
    /// times out or returns a non-positive distance.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidCoordinate`] for non-finite input.
    pub async fn distance_km(
        &self,
        origin: LonLat,
    ) -> Result<(f64, DistanceSource), LogisticsError> {
        let site = self.config.disposal_site;
        for [lon, lat] in [origin, site] {
            if !lon.is_finite() || !lat.is_finite() {
                return Err(LogisticsError::InvalidCoordinate { lon, lat });
            }
        }

        if let Some(routing) = &self.routing {
            let request = routing.driving_distance_km(origin, site);
            match tokio::time::timeout(self.config.routing_timeout, request).await {
                Ok(Ok(km)) if km.is_finite() && km > 0.0 => {
                    return Ok((km, DistanceSource::Routing));
                }
                Ok(Ok(km)) => {
                    log::warn!(
                        "{} returned unusable distance {km}, using great-circle",
                        routing.id()
                    );
                }
                Ok(Err(e)) => {
                    log::warn!("{} failed, using great-circle: {e}", routing.id());
                }
                Err(_) => {
                    log::warn!(
                        "{} timed out after {:?}, using great-circle",
                        routing.id(),
                        self.config.routing_timeout
                    );
                }
            }
        }

        Ok((great_circle_km(origin, site), DistanceSource::GreatCircle))
    }

    /// Plans both truck classes for a zone centred at `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidCoordinate`] for non-finite input.
    pub async fn plan(
        &self,
        origin: LonLat,
        requirement: &CollectionRequirement,
    ) -> Result<LogisticsReport, LogisticsError> {
        let (distance_km, distance_source) = self.distance_km(origin).await?;
        Ok(self.plan_with_distance(distance_km, distance_source, requirement))
    }

    /// Plans both truck classes for a known one-way distance.
    #[must_use]
    pub fn plan_with_distance(
        &self,
        distance_km: f64,
        distance_source: DistanceSource,
        requirement: &CollectionRequirement,
    ) -> LogisticsReport {
        let collections_per_month = f64::from(requirement.frequency_per_week) * 52.0 / 12.0;
        let small_fleet = self.class_plan(
            TruckClass::TenTonne,
            requirement.trucks_10t,
            distance_km,
            requirement.waste_per_collection_kg,
            collections_per_month,
        );
        let large_fleet = self.class_plan(
            TruckClass::TwentyTonne,
            requirement.trucks_20t,
            distance_km,
            requirement.waste_per_collection_kg,
            collections_per_month,
        );

        let recommended_truck_class = if small_fleet.trucks <= SMALL_FLEET_LIMIT
            && small_fleet.monthly.total <= large_fleet.monthly.total
        {
            TruckClass::TenTonne
        } else {
            TruckClass::TwentyTonne
        };

        let mut report = LogisticsReport {
            disposal_site: self.config.disposal_site,
            distance_km,
            distance_source,
            small_fleet,
            large_fleet,
            recommended_truck_class,
            monthly_cost: 0.0,
        };
        report.monthly_cost = report.recommended().monthly.total;

        log::debug!(
            "{distance_km:.1} km to disposal ({distance_source}), recommending {recommended_truck_class} at K{:.2}/month",
            report.monthly_cost
        );
        report
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn class_plan(
        &self,
        truck_class: TruckClass,
        trucks: u32,
        distance_km: f64,
        waste_per_collection_kg: f64,
        collections_per_month: f64,
    ) -> TruckClassPlan {
        let (litres_per_km, cost_per_trip) = match truck_class {
            TruckClass::TenTonne => (
                self.config.small_truck_litres_per_km,
                self.config.small_truck_cost_per_trip,
            ),
            TruckClass::TwentyTonne => (
                self.config.large_truck_litres_per_km,
                self.config.large_truck_cost_per_trip,
            ),
        };

        let fleet = f64::from(trucks);
        let billed_tonnes_per_truck = if trucks == 0 {
            0
        } else {
            (waste_per_collection_kg / fleet / 1_000.0).ceil().max(0.0) as u32
        };

        let round_trip_km = 2.0 * distance_km;
        let per_collection = CostBreakdown::new(
            fleet * cost_per_trip,
            fleet * round_trip_km * litres_per_km * self.config.fuel_price_per_litre,
            f64::from(billed_tonnes_per_truck) * self.config.franchise_fee_per_tonne * fleet,
        );

        TruckClassPlan {
            truck_class,
            trucks,
            billed_tonnes_per_truck,
            per_collection,
            monthly: per_collection.scaled(collections_per_month),
        }
    }
}
