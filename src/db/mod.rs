mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{Booking, BookingCost, Trip, TripCost, TripStatus};
use crate::error::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Trip and booking storage. Coordinator writes go through a
/// [`UnitOfWork`] so that a booking status change and every sibling cost
/// rewrite commit together.
#[async_trait]
pub trait Store: Send + Sync {
    type UnitOfWork: UnitOfWork;

    async fn begin(&self) -> Result<Self::UnitOfWork, Error>;

    async fn insert_trip(&self, trip: &Trip) -> Result<(), Error>;

    async fn find_trip(&self, id: Uuid) -> Result<Trip, Error>;

    async fn find_booking(&self, id: Uuid) -> Result<Booking, Error>;

    /// Non-locking read, only good for estimates.
    async fn count_active_bookings(&self, trip_id: Uuid) -> Result<usize, Error>;
}

/// One atomic transaction. Dropping it without [`UnitOfWork::commit`]
/// discards every write.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn fetch_trip_for_update(&mut self, id: Uuid) -> Result<Trip, Error>;

    async fn fetch_booking_for_update(&mut self, id: Uuid) -> Result<Booking, Error>;

    async fn count_active_bookings(&mut self, trip_id: Uuid) -> Result<usize, Error>;

    async fn list_active_bookings(&mut self, trip_id: Uuid) -> Result<Vec<Booking>, Error>;

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), Error>;

    async fn update_booking_status(&mut self, booking: &Booking) -> Result<(), Error>;

    async fn save_booking_cost(&mut self, booking_id: Uuid, cost: &BookingCost)
        -> Result<(), Error>;

    async fn update_trip_status(&mut self, trip_id: Uuid, status: &TripStatus)
        -> Result<(), Error>;

    async fn save_trip_aggregate_cost(
        &mut self,
        trip_id: Uuid,
        cost: Option<&TripCost>,
    ) -> Result<(), Error>;

    async fn commit(self) -> Result<(), Error>;

    async fn rollback(self) -> Result<(), Error>;
}
