use axum::extract::{Extension, Json, Path};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::entities::{Location, Trip, VehicleKind};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    driver_id: Uuid,
    origin: Location,
    destination: Location,
    vehicle: VehicleKind,
    max_seats: u8,
    fuel_rate_per_km: Option<Decimal>,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<CreateParams>,
) -> Result<Json<Trip>, Error> {
    let trip = api
        .create_trip(
            params.driver_id,
            params.origin,
            params.destination,
            params.vehicle,
            params.max_seats,
            params.fuel_rate_per_km,
        )
        .await?;

    Ok(trip.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, Error> {
    let trip = api.find_trip(id).await?;

    Ok(trip.into())
}
