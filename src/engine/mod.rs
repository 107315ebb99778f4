mod booking_api;
mod helpers;
mod location_api;
mod trip_api;
mod trip_locks;

pub use trip_locks::{TripGuard, TripLocks};

use rust_decimal::Decimal;
use std::future::Future;

use crate::{
    api::API,
    config::EngineConfig,
    db::Store,
    error::{route_unavailable_error, Error},
    external::DistanceProvider,
};

pub struct Engine<S, P> {
    store: S,
    provider: P,
    config: EngineConfig,
    locks: TripLocks,
}

impl<S, P> Engine<S, P>
where
    S: Store,
    P: DistanceProvider,
{
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(store: S, provider: P, config: EngineConfig) -> Result<Self, Error> {
        let pricing = config.pricing.clone().validate()?;

        Ok(Self {
            store,
            provider,
            config: EngineConfig { pricing, ..config },
            locks: TripLocks::default(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs a provider call under the route timeout. Any failure surfaces as
    /// `RouteUnavailable`; no default factor is substituted.
    async fn route<T, F>(&self, call: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        match tokio::time::timeout(self.config.route_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                tracing::warn!("route provider failed: {}", err);
                Err(route_unavailable_error())
            }
            Err(_) => {
                tracing::warn!("route provider timed out");
                Err(route_unavailable_error())
            }
        }
    }

    fn clamp_partial_factor(&self, factor: Decimal) -> Decimal {
        self.config.pricing.clamp_partial_factor(factor)
    }
}

impl<S, P> API for Engine<S, P>
where
    S: Store,
    P: DistanceProvider,
{
}

#[test]
fn new_engine() {
    use crate::api::TripAPI;
    use crate::db::MemoryStore;
    use crate::error::ErrorKind;
    use crate::external::GoogleMaps;
    use tokio_test::block_on;
    use uuid::Uuid;

    let provider = GoogleMaps::new("http://localhost:0".into(), "".into());
    let engine = Engine::new(MemoryStore::new(), provider, EngineConfig::default()).unwrap();

    let err = block_on(engine.find_trip(Uuid::new_v4())).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let mut config = EngineConfig::default();
    config.pricing.max_seats = 4;
    let provider = GoogleMaps::new("http://localhost:0".into(), "".into());
    assert!(Engine::new(MemoryStore::new(), provider, config).is_err());
}
