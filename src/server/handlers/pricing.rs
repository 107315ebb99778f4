use axum::extract::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::pricing::{compute_pricing, PricingResult};

#[derive(Serialize, Deserialize)]
pub struct ComputeParams {
    distance_km: Decimal,
    fuel_rate_per_km: Decimal,
    vehicle_factor: Decimal,
    passenger_count: u8,
    #[serde(default = "full_route")]
    partial_distance_factor: Decimal,
}

fn full_route() -> Decimal {
    Decimal::ONE
}

pub async fn compute(Json(params): Json<ComputeParams>) -> Result<Json<PricingResult>, Error> {
    let result = compute_pricing(
        params.distance_km,
        params.fuel_rate_per_km,
        params.vehicle_factor,
        params.passenger_count,
        params.partial_distance_factor,
    )?;

    Ok(result.into())
}
