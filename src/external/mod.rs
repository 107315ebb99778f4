pub mod google_maps;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::entities::Coordinates;
use crate::error::Error;

pub use google_maps::GoogleMaps;

/// Route distances and geocoding from a mapping provider.
#[async_trait]
pub trait DistanceProvider: Send + Sync {
    /// Driving distance in km between the trip endpoints.
    async fn full_route_distance(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<Decimal, Error>;

    /// Fraction of the trip route covered between `pickup` and `dropoff`,
    /// clamped to `[0.1, 1]`.
    async fn partial_route_factor(
        &self,
        trip_origin: &Coordinates,
        trip_destination: &Coordinates,
        pickup: &Coordinates,
        dropoff: &Coordinates,
    ) -> Result<Decimal, Error>;

    async fn geocode(&self, address: &str) -> Result<Coordinates, Error>;

    async fn reverse_geocode(&self, coordinates: &Coordinates) -> Result<String, Error>;
}
