//! mvv-agg library interface
//!
//! Exposes the aggregation pipeline and HTTP router for integration testing.

pub mod api;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use mvv_common::{AppConfig, Result};
use std::sync::Arc;

use services::MetricsAggregator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The aggregation pipeline (resolver + source adapters)
    pub aggregator: Arc<MetricsAggregator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Build all clients from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            aggregator: Arc::new(MetricsAggregator::new(config)?),
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::metrics_routes())
        .merge(api::event_routes())
        .with_state(state)
}
