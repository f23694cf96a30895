//! Metrics aggregation for the comparison surface
//!
//! Resolves a free-text city name, fans out to every source adapter
//! concurrently, and assembles one merged record. The fan-out is
//! wait-for-all: the record is built in a single atomic step after every
//! adapter has settled (with a value or degraded to null). The only
//! caller-visible failure is an unresolved commune, reported as `None` —
//! there is never a partially populated record.

use mvv_common::{AppConfig, Error, Result};
use serde::Serialize;

use super::commune_resolver::{Commune, CommuneResolver};
use super::energy_client::{EnergyClient, EnergyReading};
use super::opendata_client::{EventRecord, OpenDataClient};
use super::synthetic::{self, SyntheticIndicators};

/// Aggregated indicator record for one commune
///
/// Every indicator is independently nullable; a null means the source had no
/// data for this commune. Immutable once assembled; not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CityMetrics {
    /// The resolved commune
    pub commune: Commune,
    /// Nature/outdoor event count
    pub nature_events: Option<u64>,
    /// Public agenda event count
    pub public_events: Option<u64>,
    /// Eco-tagged agenda event count
    pub eco_events: Option<u64>,
    /// Electricity, kWh per inhabitant per year
    pub electricity_kwh_per_capita: Option<f64>,
    /// Gas, kWh per inhabitant per year
    pub gas_kwh_per_capita: Option<f64>,
    /// True when the energy figures are the fixed fallback averages
    pub energy_estimated: bool,
    /// Household water use, liters per inhabitant per year
    pub water_liters_per_capita: Option<f64>,
    /// Household waste, kg per inhabitant per year
    pub waste_kg_per_capita: Option<f64>,
    /// Vehicle fuel, liters per inhabitant per year
    pub fuel_liters_per_capita: Option<f64>,
    /// Greenhouse-gas emissions, tonnes CO2e per inhabitant per year
    pub ges_emissions_t_per_capita: Option<f64>,
    /// Municipal water consumption, m³ per inhabitant per year
    pub water_consumption_m3_per_capita: Option<f64>,
    /// Air-quality index (higher is worse)
    pub air_quality_index: Option<f64>,
    /// Share of renewable energy, percent
    pub renewable_share_pct: Option<f64>,
}

/// One atomic assembly step: commune + settled adapter results
///
/// Pure flat merge, so adapter isolation is testable without any client.
pub fn assemble(
    commune: Commune,
    nature_events: Option<u64>,
    public_events: Option<u64>,
    eco_events: Option<u64>,
    energy: EnergyReading,
    synthetic: SyntheticIndicators,
) -> CityMetrics {
    CityMetrics {
        commune,
        nature_events,
        public_events,
        eco_events,
        electricity_kwh_per_capita: energy.electricity_kwh_per_capita,
        gas_kwh_per_capita: energy.gas_kwh_per_capita,
        energy_estimated: energy.estimated,
        water_liters_per_capita: Some(synthetic.water_liters_per_capita),
        waste_kg_per_capita: Some(synthetic.waste_kg_per_capita),
        fuel_liters_per_capita: Some(synthetic.fuel_liters_per_capita),
        ges_emissions_t_per_capita: Some(synthetic.ges_emissions_t_per_capita),
        water_consumption_m3_per_capita: Some(synthetic.water_consumption_m3_per_capita),
        air_quality_index: Some(synthetic.air_quality_index),
        renewable_share_pct: Some(synthetic.renewable_share_pct),
    }
}

/// Fans out all source adapters for a resolved commune
pub struct MetricsAggregator {
    resolver: CommuneResolver,
    opendata: OpenDataClient,
    energy: EnergyClient,
}

impl MetricsAggregator {
    /// Build all clients from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let resolver = CommuneResolver::new(&config.geo_api_base_url)
            .map_err(|e| Error::Internal(format!("Geocoding client init failed: {}", e)))?;
        let opendata = OpenDataClient::new(
            &config.opendata_base_url,
            &config.nature_events_dataset,
            &config.agenda_dataset,
        )
        .map_err(|e| Error::Internal(format!("Catalog client init failed: {}", e)))?;
        let energy = EnergyClient::new(&config.energy_base_url, &config.energy_dataset)
            .map_err(|e| Error::Internal(format!("Energy client init failed: {}", e)))?;

        Ok(Self {
            resolver,
            opendata,
            energy,
        })
    }

    /// Resolve a city and aggregate all indicators into one record
    ///
    /// `None` when the commune cannot be resolved; adapters never fail the
    /// aggregation, they degrade to null fields.
    pub async fn build_metrics(&self, city_name: &str) -> Option<CityMetrics> {
        let commune = self.resolver.resolve(city_name).await?;

        tracing::debug!(
            commune = %commune.name,
            insee = %commune.insee_code,
            "Aggregating metrics"
        );

        // All adapters depend only on the resolved commune: fan out, wait for all
        let (nature_events, public_events, eco_events, energy) = tokio::join!(
            self.opendata.nature_event_count(&commune),
            self.opendata.public_event_count(&commune),
            self.opendata.eco_event_count(&commune),
            self.energy.per_capita_consumption(&commune),
        );

        let synthetic = synthetic::for_commune(&commune);

        Some(assemble(
            commune,
            nature_events,
            public_events,
            eco_events,
            energy,
            synthetic,
        ))
    }

    /// Geolocated events for the map surface
    pub async fn events(&self, city_name: &str) -> Option<Vec<EventRecord>> {
        let commune = self.resolver.resolve(city_name).await?;
        self.opendata.events_for_map(&commune).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::energy_client::{FALLBACK_ELECTRICITY_KWH, FALLBACK_GAS_KWH};

    fn commune() -> Commune {
        Commune {
            name: "Rennes".to_string(),
            department_name: "Ille-et-Vilaine".to_string(),
            population: Some(222_485),
            insee_code: "35238".to_string(),
        }
    }

    #[test]
    fn test_assemble_failed_adapter_does_not_null_siblings() {
        // Event counts all degraded to null; everything else still lands
        let energy = EnergyReading {
            electricity_kwh_per_capita: Some(2100.0),
            gas_kwh_per_capita: None,
            estimated: false,
        };
        let metrics = assemble(
            commune(),
            None,
            None,
            None,
            energy,
            synthetic::for_commune(&commune()),
        );

        assert!(metrics.nature_events.is_none());
        assert!(metrics.public_events.is_none());
        assert_eq!(metrics.electricity_kwh_per_capita, Some(2100.0));
        assert!(metrics.gas_kwh_per_capita.is_none());
        assert!(metrics.air_quality_index.is_some());
        assert!(metrics.water_liters_per_capita.is_some());
    }

    #[test]
    fn test_assemble_carries_estimate_flag() {
        let energy = EnergyReading {
            electricity_kwh_per_capita: Some(FALLBACK_ELECTRICITY_KWH),
            gas_kwh_per_capita: Some(FALLBACK_GAS_KWH),
            estimated: true,
        };
        let metrics = assemble(
            commune(),
            Some(3),
            Some(12),
            Some(2),
            energy,
            synthetic::for_commune(&commune()),
        );

        assert!(metrics.energy_estimated);
        assert_eq!(metrics.eco_events, Some(2));
    }

    #[tokio::test]
    async fn test_blank_city_short_circuits_without_io() {
        let aggregator = MetricsAggregator::new(&AppConfig::default()).unwrap();

        // Resolution rejects blank input before any network call
        assert!(aggregator.build_metrics("").await.is_none());
        assert!(aggregator.build_metrics("   ").await.is_none());
    }
}
