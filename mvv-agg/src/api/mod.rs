//! HTTP API for the aggregation service

pub mod events;
pub mod health;
pub mod metrics;

pub use events::event_routes;
pub use health::health_routes;
pub use metrics::metrics_routes;
