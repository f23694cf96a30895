//! mvv-agg - Municipal indicator aggregation service
//!
//! Aggregates French municipal open-data feeds (events, energy consumption,
//! placeholder civic indicators) behind a small HTTP API consumed by the map
//! and comparison screens.

use anyhow::Result;
use mvv_common::AppConfig;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mvv_agg::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting mvv-agg (indicator aggregation) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("Geocoding registry: {}", config.geo_api_base_url);
    info!("Event catalog: {}", config.opendata_base_url);
    info!("Energy catalog: {}", config.energy_base_url);

    let state = AppState::new(&config)?;
    let app = mvv_agg::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
