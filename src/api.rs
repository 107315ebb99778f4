use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{Booking, Coordinates, Location, Trip, VehicleKind};
use crate::error::Error;
use crate::pricing::Estimate;

#[async_trait]
pub trait LocationAPI {
    async fn geocode(&self, address: String) -> Result<Location, Error>;
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<Location, Error>;
}

#[async_trait]
pub trait TripAPI {
    async fn create_trip(
        &self,
        driver_id: Uuid,
        origin: Location,
        destination: Location,
        vehicle: VehicleKind,
        max_seats: u8,
        fuel_rate_per_km: Option<Decimal>,
    ) -> Result<Trip, Error>;

    async fn find_trip(&self, id: Uuid) -> Result<Trip, Error>;
}

#[async_trait]
pub trait BookingAPI {
    async fn quote_booking(
        &self,
        trip_id: Uuid,
        pickup: Location,
        dropoff: Location,
    ) -> Result<Estimate, Error>;

    async fn create_booking(
        &self,
        trip_id: Uuid,
        passenger_id: Uuid,
        pickup: Location,
        dropoff: Location,
    ) -> Result<Booking, Error>;

    async fn cancel_booking(&self, id: Uuid) -> Result<Booking, Error>;

    async fn find_booking(&self, id: Uuid) -> Result<Booking, Error>;
}

pub trait API: LocationAPI + TripAPI + BookingAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
