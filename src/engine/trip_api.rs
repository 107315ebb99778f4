use super::Engine;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    api::TripAPI,
    db::Store,
    entities::{Location, Trip, VehicleKind},
    error::{invalid_passenger_count_error, Error},
    external::DistanceProvider,
};

#[async_trait]
impl<S, P> TripAPI for Engine<S, P>
where
    S: Store,
    P: DistanceProvider,
{
    #[tracing::instrument(skip(self))]
    async fn create_trip(
        &self,
        driver_id: Uuid,
        origin: Location,
        destination: Location,
        vehicle: VehicleKind,
        max_seats: u8,
        fuel_rate_per_km: Option<Decimal>,
    ) -> Result<Trip, Error> {
        let pricing = &self.config.pricing;

        if max_seats > pricing.max_seats {
            return Err(invalid_passenger_count_error());
        }

        let distance_km = self
            .route(
                self.provider
                    .full_route_distance(&origin.coordinates, &destination.coordinates),
            )
            .await?;

        let trip = Trip::new(
            driver_id,
            origin,
            destination,
            distance_km,
            fuel_rate_per_km.unwrap_or(pricing.default_fuel_rate_per_km),
            vehicle,
            pricing.vehicle_factors.factor(vehicle),
            max_seats,
        )?;

        self.store.insert_trip(&trip).await?;

        tracing::info!(trip_id = %trip.id, %distance_km, "created trip");

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn find_trip(&self, id: Uuid) -> Result<Trip, Error> {
        self.store.find_trip(id).await
    }
}
