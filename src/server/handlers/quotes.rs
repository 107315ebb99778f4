use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::entities::Location;
use crate::error::Error;
use crate::pricing::Estimate;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    pickup: Location,
    dropoff: Location,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Path(trip_id): Path<Uuid>,
    Json(params): Json<CreateParams>,
) -> Result<Json<Estimate>, Error> {
    let estimate = api
        .quote_booking(trip_id, params.pickup, params.dropoff)
        .await?;

    Ok(estimate.into())
}
