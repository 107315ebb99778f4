use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{concurrency_conflict_error, unexpected_error, Error};

/// Per-trip mutual exclusion. The map lock is only held to look up or
/// insert an entry; waiting happens on the trip's own mutex, so operations
/// on different trips never contend.
#[derive(Debug, Default)]
pub struct TripLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl TripLocks {
    #[tracing::instrument(skip(self))]
    pub async fn acquire(&self, trip_id: Uuid, timeout: Duration) -> Result<TripGuard<'_>, Error> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| unexpected_error())?;
            locks.entry(trip_id).or_default().clone()
        };

        let guard = match tokio::time::timeout(timeout, lock.lock_owned()).await {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("timed out waiting for trip lock");
                return Err(concurrency_conflict_error());
            }
        };

        Ok(TripGuard {
            locks: self,
            trip_id,
            guard: Some(guard),
        })
    }

    pub fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holds a trip's lock; releasing the last holder drops the map entry.
pub struct TripGuard<'a> {
    locks: &'a TripLocks,
    trip_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TripGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        if let Ok(mut locks) = self.locks.locks.lock() {
            let unused = locks
                .get(&self.trip_id)
                .map(|lock| Arc::strong_count(lock) == 1)
                .unwrap_or(false);

            if unused {
                locks.remove(&self.trip_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn same_trip_is_exclusive() {
        let locks = TripLocks::default();
        let trip_id = Uuid::new_v4();

        let guard = locks
            .acquire(trip_id, Duration::from_millis(50))
            .await
            .unwrap();

        let err = locks
            .acquire(trip_id, Duration::from_millis(20))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::ConcurrencyConflict);

        drop(guard);
        assert!(locks
            .acquire(trip_id, Duration::from_millis(20))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn different_trips_do_not_contend() {
        let locks = TripLocks::default();

        let _first = locks
            .acquire(Uuid::new_v4(), Duration::from_millis(20))
            .await
            .unwrap();
        let _second = locks
            .acquire(Uuid::new_v4(), Duration::from_millis(20))
            .await
            .unwrap();

        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn released_entries_are_removed() {
        let locks = TripLocks::default();

        {
            let _guard = locks
                .acquire(Uuid::new_v4(), Duration::from_millis(20))
                .await
                .unwrap();
            assert_eq!(locks.len(), 1);
        }

        assert!(locks.is_empty());
    }
}
