use crate::{
    db::UnitOfWork,
    entities::{Booking, BookingCost, Trip, TripCost},
    error::{invalid_passenger_count_error, Error},
    pricing::{compute_pricing, PricingResult},
};

pub fn passenger_count(active: usize) -> Result<u8, Error> {
    u8::try_from(active).map_err(|_| invalid_passenger_count_error())
}

/// Prices one passenger's share of `trip`. The passenger's own distance is
/// the full route scaled by their partial factor.
pub fn price_booking(
    trip: &Trip,
    partial_factor: rust_decimal::Decimal,
    passenger_count: u8,
) -> Result<PricingResult, Error> {
    compute_pricing(
        trip.distance_km * partial_factor,
        trip.fuel_rate_per_km,
        trip.vehicle_factor,
        passenger_count,
        partial_factor,
    )
}

/// Rewrites the cost snapshot of every booking in `bookings` for the new
/// passenger count.
#[tracing::instrument(skip(uow, trip, bookings), fields(trip_id = %trip.id))]
pub async fn reprice_bookings<U: UnitOfWork>(
    uow: &mut U,
    trip: &Trip,
    bookings: &[Booking],
    passenger_count: u8,
) -> Result<(), Error> {
    for booking in bookings {
        let pricing = price_booking(trip, booking.partial_factor, passenger_count)?;
        let cost = BookingCost::new(&pricing, passenger_count);

        if cost != booking.cost {
            tracing::info!(
                booking_id = %booking.id,
                from = %booking.cost.cost_per_passenger,
                to = %cost.cost_per_passenger,
                "repricing sibling booking"
            );
        }

        uow.save_booking_cost(booking.id, &cost).await?;
    }

    Ok(())
}

/// Writes the trip's new seat status and aggregate cost.
#[tracing::instrument(skip(uow, trip, cost), fields(trip_id = %trip.id))]
pub async fn update_trip_seats<U: UnitOfWork>(
    uow: &mut U,
    trip: &mut Trip,
    active: u8,
    cost: Option<TripCost>,
) -> Result<(), Error> {
    trip.seats_changed(active)?;
    trip.cost = cost;

    uow.update_trip_status(trip.id, &trip.status).await?;
    uow.save_trip_aggregate_cost(trip.id, trip.cost.as_ref())
        .await?;

    Ok(())
}

/// Commits `uow` if `result` is ok, otherwise rolls every staged write back
/// and returns the original error.
pub async fn finish<U: UnitOfWork, T>(uow: U, result: Result<T, Error>) -> Result<T, Error> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!("rolling back: {}", err);

            if let Err(rollback_err) = uow.rollback().await {
                tracing::error!("rollback failed: {}", rollback_err);
            }

            Err(err)
        }
    }
}
