use super::helpers::{finish, passenger_count, price_booking, reprice_bookings, update_trip_seats};
use super::Engine;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    api::BookingAPI,
    db::{Store, UnitOfWork},
    entities::{Booking, BookingCost, Location},
    error::{invalid_invocation_error, trip_full_error, Error},
    external::DistanceProvider,
    pricing::{estimate_passenger_cost, round_money, Estimate},
};

#[async_trait]
impl<S, P> BookingAPI for Engine<S, P>
where
    S: Store,
    P: DistanceProvider,
{
    #[tracing::instrument(skip(self))]
    async fn quote_booking(
        &self,
        trip_id: Uuid,
        pickup: Location,
        dropoff: Location,
    ) -> Result<Estimate, Error> {
        let trip = self.store.find_trip(trip_id).await?;

        if !trip.accepts_bookings() {
            return Err(invalid_invocation_error());
        }

        let factor = self
            .route(self.provider.partial_route_factor(
                &trip.origin.coordinates,
                &trip.destination.coordinates,
                &pickup.coordinates,
                &dropoff.coordinates,
            ))
            .await?;
        let partial_factor = self.clamp_partial_factor(factor);

        // unlocked read, the count may be stale by the time a booking is made
        let current = passenger_count(self.store.count_active_bookings(trip_id).await?)?;

        if current >= trip.max_seats {
            return Err(trip_full_error());
        }

        estimate_passenger_cost(
            round_money(trip.full_route_cost()),
            partial_factor,
            Some(current),
            None,
        )
    }

    #[tracing::instrument(skip(self))]
    async fn create_booking(
        &self,
        trip_id: Uuid,
        passenger_id: Uuid,
        pickup: Location,
        dropoff: Location,
    ) -> Result<Booking, Error> {
        let trip = self.store.find_trip(trip_id).await?;

        if !trip.accepts_bookings() {
            return Err(invalid_invocation_error());
        }

        // resolve the route before taking the trip lock
        let factor = self
            .route(self.provider.partial_route_factor(
                &trip.origin.coordinates,
                &trip.destination.coordinates,
                &pickup.coordinates,
                &dropoff.coordinates,
            ))
            .await?;
        let partial_factor = self.clamp_partial_factor(factor);

        let _guard = self
            .locks
            .acquire(trip_id, self.config.trip_lock_timeout)
            .await?;

        let mut uow = self.store.begin().await?;
        let result = book_seat(
            &mut uow,
            trip_id,
            passenger_id,
            pickup,
            dropoff,
            partial_factor,
        )
        .await;
        let booking = finish(uow, result).await?;

        tracing::info!(
            booking_id = %booking.id,
            passengers = booking.cost.passenger_count,
            cost = %booking.cost.cost_per_passenger,
            "created booking"
        );

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_booking(&self, id: Uuid) -> Result<Booking, Error> {
        let trip_id = self.store.find_booking(id).await?.trip_id;

        let _guard = self
            .locks
            .acquire(trip_id, self.config.trip_lock_timeout)
            .await?;

        let mut uow = self.store.begin().await?;
        let result = release_seat(&mut uow, trip_id, id).await;
        let booking = finish(uow, result).await?;

        tracing::info!(booking_id = %booking.id, "cancelled booking");

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn find_booking(&self, id: Uuid) -> Result<Booking, Error> {
        self.store.find_booking(id).await
    }
}

async fn book_seat<U: UnitOfWork>(
    uow: &mut U,
    trip_id: Uuid,
    passenger_id: Uuid,
    pickup: Location,
    dropoff: Location,
    partial_factor: Decimal,
) -> Result<Booking, Error> {
    let mut trip = uow.fetch_trip_for_update(trip_id).await?;

    if !trip.accepts_bookings() {
        return Err(invalid_invocation_error());
    }

    let active = uow.count_active_bookings(trip_id).await?;

    if active >= usize::from(trip.max_seats) {
        tracing::info!(active, "trip is full");
        return Err(trip_full_error());
    }

    let siblings = uow.list_active_bookings(trip_id).await?;
    let passengers = passenger_count(active + 1)?;

    let pricing = price_booking(&trip, partial_factor, passengers)?;
    let booking = Booking::new(
        trip_id,
        passenger_id,
        pickup,
        dropoff,
        partial_factor,
        BookingCost::new(&pricing, passengers),
    )?;

    uow.insert_booking(&booking).await?;

    // every passenger pays by the final count, not by booking order
    reprice_bookings(uow, &trip, &siblings, passengers).await?;

    let cost = trip.price_for(passengers)?;
    update_trip_seats(uow, &mut trip, passengers, cost).await?;

    Ok(booking)
}

async fn release_seat<U: UnitOfWork>(
    uow: &mut U,
    trip_id: Uuid,
    booking_id: Uuid,
) -> Result<Booking, Error> {
    // trip row first, same lock order as booking creation
    let mut trip = uow.fetch_trip_for_update(trip_id).await?;
    let mut booking = uow.fetch_booking_for_update(booking_id).await?;

    if !trip.accepts_bookings() {
        return Err(invalid_invocation_error());
    }

    let previous = passenger_count(uow.count_active_bookings(trip_id).await?)?;

    booking.cancel()?;
    uow.update_booking_status(&booking).await?;

    let remaining = uow.list_active_bookings(trip_id).await?;
    let passengers = passenger_count(remaining.len())?;

    let cost = trip.price_after_cancellation(previous, passengers)?;
    reprice_bookings(uow, &trip, &remaining, passengers).await?;
    update_trip_seats(uow, &mut trip, passengers, cost).await?;

    Ok(booking)
}
