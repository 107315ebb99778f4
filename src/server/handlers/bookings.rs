use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::entities::{Booking, Location};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    passenger_id: Uuid,
    pickup: Location,
    dropoff: Location,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Path(trip_id): Path<Uuid>,
    Json(params): Json<CreateParams>,
) -> Result<Json<Booking>, Error> {
    let booking = api
        .create_booking(trip_id, params.passenger_id, params.pickup, params.dropoff)
        .await?;

    Ok(booking.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.find_booking(id).await?;

    Ok(booking.into())
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.cancel_booking(id).await?;

    Ok(booking.into())
}
