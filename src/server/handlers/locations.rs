use axum::extract::{Extension, Json, Query};
use serde::{Deserialize, Serialize};

use crate::api::DynAPI;
use crate::entities::{Coordinates, Location};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct GeocodeParams {
    address: String,
}

pub async fn geocode(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<GeocodeParams>,
) -> Result<Json<Location>, Error> {
    let location = api.geocode(params.address).await?;

    Ok(location.into())
}

pub async fn reverse_geocode(
    Extension(api): Extension<DynAPI>,
    Query(coordinates): Query<Coordinates>,
) -> Result<Json<Location>, Error> {
    let coordinates = Coordinates::new(coordinates.lat, coordinates.lng)?;
    let location = api.reverse_geocode(coordinates).await?;

    Ok(location.into())
}
