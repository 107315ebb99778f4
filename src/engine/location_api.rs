use super::Engine;

use async_trait::async_trait;

use crate::{
    api::LocationAPI,
    db::Store,
    entities::{Coordinates, Location},
    error::Error,
    external::DistanceProvider,
};

#[async_trait]
impl<S, P> LocationAPI for Engine<S, P>
where
    S: Store,
    P: DistanceProvider,
{
    #[tracing::instrument(skip(self))]
    async fn geocode(&self, address: String) -> Result<Location, Error> {
        let coordinates = self.route(self.provider.geocode(&address)).await?;

        Ok(Location::new(coordinates, address))
    }

    #[tracing::instrument(skip(self))]
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<Location, Error> {
        let description = self
            .route(self.provider.reverse_geocode(&coordinates))
            .await?;

        Ok(Location::new(coordinates, description))
    }
}
