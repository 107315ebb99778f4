use ridepool::config::Config;
use ridepool::db::PgStore;
use ridepool::engine::Engine;
use ridepool::error::Error;
use ridepool::external::GoogleMaps;
use ridepool::server::serve;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    let store = PgStore::connect(&config.database_url, config.database_max_connections).await?;
    let provider = GoogleMaps::new(
        config.google_maps_api_base.clone(),
        config.google_maps_api_key.clone(),
    );

    let engine = Engine::new(store, provider, config.engine.clone())?;

    serve(engine, config.listen_addr).await
}
