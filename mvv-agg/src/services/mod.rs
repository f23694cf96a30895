//! Service modules for the aggregation pipeline
//!
//! One module per upstream source, plus the resolver that anchors every
//! request and the aggregator that fans out across all of them.

pub mod aggregator;
pub mod commune_resolver;
pub mod energy_client;
pub mod opendata_client;
pub mod synthetic;

pub use aggregator::{CityMetrics, MetricsAggregator};
pub use commune_resolver::{Commune, CommuneResolver, GeoError};
pub use energy_client::{EnergyBreaker, EnergyClient, EnergyError, EnergyReading};
pub use opendata_client::{CatalogError, EventRecord, OpenDataClient};
pub use synthetic::SyntheticIndicators;
