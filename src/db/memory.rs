use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::{
    db::{Store, UnitOfWork},
    entities::{Booking, BookingCost, Trip, TripCost, TripStatus},
    error::{not_found_error, persistence_failure_error, unexpected_error, Error},
};

#[derive(Clone, Debug, Default)]
struct Tables {
    trips: HashMap<Uuid, Trip>,
    bookings: HashMap<Uuid, Booking>,
}

#[derive(Debug, Default)]
struct Faults {
    // booking cost writes left before the next one fails, offset by one so
    // that zero means disarmed
    cost_writes_before_failure: AtomicUsize,
}

/// In-process store used by tests and local runs. Writes are staged on the
/// unit of work and applied under one lock at commit.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the booking cost write after the next `successful` ones fail
    /// with a persistence error.
    pub fn fail_cost_write_after(&self, successful: usize) {
        self.faults
            .cost_writes_before_failure
            .store(successful + 1, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, Error> {
        self.tables.lock().map_err(|_| unexpected_error())
    }

    pub fn bookings_for_trip(&self, trip_id: Uuid) -> Result<Vec<Booking>, Error> {
        let tables = self.tables()?;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|booking| booking.trip_id == trip_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|booking| booking.created_at);

        Ok(bookings)
    }
}

#[async_trait]
impl Store for MemoryStore {
    type UnitOfWork = MemoryUnitOfWork;

    async fn begin(&self) -> Result<MemoryUnitOfWork, Error> {
        Ok(MemoryUnitOfWork {
            store: self.clone(),
            staged: Tables::default(),
        })
    }

    async fn insert_trip(&self, trip: &Trip) -> Result<(), Error> {
        self.tables()?.trips.insert(trip.id, trip.clone());

        Ok(())
    }

    async fn find_trip(&self, id: Uuid) -> Result<Trip, Error> {
        self.tables()?
            .trips
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found_error())
    }

    async fn find_booking(&self, id: Uuid) -> Result<Booking, Error> {
        self.tables()?
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found_error())
    }

    async fn count_active_bookings(&self, trip_id: Uuid) -> Result<usize, Error> {
        Ok(self
            .tables()?
            .bookings
            .values()
            .filter(|booking| booking.trip_id == trip_id && booking.is_active())
            .count())
    }
}

pub struct MemoryUnitOfWork {
    store: MemoryStore,
    staged: Tables,
}

impl MemoryUnitOfWork {
    fn trip(&self, id: Uuid) -> Result<Trip, Error> {
        if let Some(trip) = self.staged.trips.get(&id) {
            return Ok(trip.clone());
        }

        self.store
            .tables()?
            .trips
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found_error())
    }

    fn booking(&self, id: Uuid) -> Result<Booking, Error> {
        if let Some(booking) = self.staged.bookings.get(&id) {
            return Ok(booking.clone());
        }

        self.store
            .tables()?
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found_error())
    }

    fn active_bookings(&self, trip_id: Uuid) -> Result<Vec<Booking>, Error> {
        let tables = self.store.tables()?;

        let mut merged: HashMap<Uuid, Booking> = tables
            .bookings
            .iter()
            .filter(|(_, booking)| booking.trip_id == trip_id)
            .map(|(id, booking)| (*id, booking.clone()))
            .collect();

        for (id, booking) in self.staged.bookings.iter() {
            if booking.trip_id == trip_id {
                merged.insert(*id, booking.clone());
            }
        }

        let mut bookings: Vec<Booking> = merged
            .into_values()
            .filter(|booking| booking.is_active())
            .collect();
        bookings.sort_by_key(|booking| booking.id);

        Ok(bookings)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn fetch_trip_for_update(&mut self, id: Uuid) -> Result<Trip, Error> {
        self.trip(id)
    }

    async fn fetch_booking_for_update(&mut self, id: Uuid) -> Result<Booking, Error> {
        self.booking(id)
    }

    async fn count_active_bookings(&mut self, trip_id: Uuid) -> Result<usize, Error> {
        Ok(self.active_bookings(trip_id)?.len())
    }

    async fn list_active_bookings(&mut self, trip_id: Uuid) -> Result<Vec<Booking>, Error> {
        self.active_bookings(trip_id)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), Error> {
        self.staged.bookings.insert(booking.id, booking.clone());

        Ok(())
    }

    async fn update_booking_status(&mut self, booking: &Booking) -> Result<(), Error> {
        let mut stored = self.booking(booking.id)?;
        stored.status = booking.status.clone();
        self.staged.bookings.insert(stored.id, stored);

        Ok(())
    }

    async fn save_booking_cost(
        &mut self,
        booking_id: Uuid,
        cost: &BookingCost,
    ) -> Result<(), Error> {
        let remaining = &self.store.faults.cost_writes_before_failure;
        match remaining.load(Ordering::SeqCst) {
            0 => {}
            1 => {
                remaining.store(0, Ordering::SeqCst);
                tracing::warn!("injected booking cost write failure");
                return Err(persistence_failure_error());
            }
            n => remaining.store(n - 1, Ordering::SeqCst),
        }

        let mut stored = self.booking(booking_id)?;
        stored.cost = cost.clone();
        self.staged.bookings.insert(booking_id, stored);

        Ok(())
    }

    async fn update_trip_status(
        &mut self,
        trip_id: Uuid,
        status: &TripStatus,
    ) -> Result<(), Error> {
        let mut trip = self.trip(trip_id)?;
        trip.status = status.clone();
        self.staged.trips.insert(trip_id, trip);

        Ok(())
    }

    async fn save_trip_aggregate_cost(
        &mut self,
        trip_id: Uuid,
        cost: Option<&TripCost>,
    ) -> Result<(), Error> {
        let mut trip = self.trip(trip_id)?;
        trip.cost = cost.cloned();
        self.staged.trips.insert(trip_id, trip);

        Ok(())
    }

    async fn commit(self) -> Result<(), Error> {
        let mut tables = self.store.tables()?;

        tables.trips.extend(self.staged.trips);
        tables.bookings.extend(self.staged.bookings);

        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Coordinates, Location, VehicleKind};
    use crate::pricing::compute_pricing;
    use rust_decimal_macros::dec;

    fn location() -> Location {
        Location::new(Coordinates::new(33.68, 73.04).unwrap(), "".into())
    }

    async fn seeded() -> (MemoryStore, Trip, Booking) {
        let store = MemoryStore::new();
        let trip = Trip::new(
            Uuid::new_v4(),
            location(),
            location(),
            dec!(20),
            dec!(25),
            VehicleKind::Standard,
            dec!(1),
            3,
        )
        .unwrap();
        store.insert_trip(&trip).await.unwrap();

        let pricing = compute_pricing(dec!(20), dec!(25), dec!(1), 1, dec!(1)).unwrap();
        let booking = Booking::new(
            trip.id,
            Uuid::new_v4(),
            location(),
            location(),
            dec!(1),
            BookingCost::new(&pricing, 1),
        )
        .unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.insert_booking(&booking).await.unwrap();
        uow.commit().await.unwrap();

        (store, trip, booking)
    }

    #[tokio::test]
    async fn staged_writes_are_visible_inside_the_unit_of_work_only() {
        let (store, trip, booking) = seeded().await;

        let mut uow = store.begin().await.unwrap();
        let mut cancelled = uow.fetch_booking_for_update(booking.id).await.unwrap();
        cancelled.cancel().unwrap();
        uow.update_booking_status(&cancelled).await.unwrap();

        assert_eq!(uow.count_active_bookings(trip.id).await.unwrap(), 0);
        assert_eq!(store.count_active_bookings(trip.id).await.unwrap(), 1);

        uow.commit().await.unwrap();
        assert_eq!(store.count_active_bookings(trip.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rolled_back_unit_of_work_discards_writes() {
        let (store, trip, _) = seeded().await;

        let mut uow = store.begin().await.unwrap();
        uow.save_trip_aggregate_cost(trip.id, None).await.unwrap();
        uow.update_trip_status(trip.id, &TripStatus::Full)
            .await
            .unwrap();
        uow.rollback().await.unwrap();

        let stored = store.find_trip(trip.id).await.unwrap();
        assert_eq!(stored.status, TripStatus::Open);
    }

    #[tokio::test]
    async fn injected_cost_write_failure_fires_once() {
        let (store, _, booking) = seeded().await;
        store.fail_cost_write_after(1);

        let mut uow = store.begin().await.unwrap();
        uow.save_booking_cost(booking.id, &booking.cost).await.unwrap();
        assert!(uow.save_booking_cost(booking.id, &booking.cost).await.is_err());
        uow.save_booking_cost(booking.id, &booking.cost).await.unwrap();
    }
}
