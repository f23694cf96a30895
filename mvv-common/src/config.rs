//! Configuration loading for Ma Ville Verte services
//!
//! Resolution priority, highest first:
//! 1. Environment variables (`MVV_*`)
//! 2. TOML config file (path from `MVV_CONFIG`, default `mvv.toml` if present)
//! 3. Compiled defaults

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Service configuration
///
/// Every upstream base URL is configurable so tests and deployments can
/// point the adapters at a local stand-in instead of the public catalogs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bind address for the HTTP API
    pub bind_address: String,
    /// Administrative geocoding registry (commune search)
    pub geo_api_base_url: String,
    /// Opendatasoft Explore v2.1 catalog hosting the event datasets
    pub opendata_base_url: String,
    /// Annual electricity/gas consumption catalog (Explore v2.1)
    pub energy_base_url: String,
    /// Dataset id for nature/outdoor events
    pub nature_events_dataset: String,
    /// Dataset id for the public agenda
    pub agenda_dataset: String,
    /// Dataset id for annual energy consumption by commune
    pub energy_dataset: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5810".to_string(),
            geo_api_base_url: "https://geo.api.gouv.fr".to_string(),
            opendata_base_url: "https://data.bretagne.bzh/api/explore/v2.1".to_string(),
            energy_base_url: "https://opendata.agenceore.fr/api/explore/v2.1".to_string(),
            nature_events_dataset: "sorties-nature-bretagne".to_string(),
            agenda_dataset: "agenda-participatif-bretagne".to_string(),
            energy_dataset: "conso-elec-gaz-annuelle-par-secteur-dactivite-agregee-commune"
                .to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then TOML file (if any), then environment
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("MVV_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let default_path = Path::new("mvv.toml");
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Override individual fields from `MVV_*` environment variables
    fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 7] = [
            ("MVV_BIND_ADDRESS", &mut self.bind_address),
            ("MVV_GEO_API_BASE_URL", &mut self.geo_api_base_url),
            ("MVV_OPENDATA_BASE_URL", &mut self.opendata_base_url),
            ("MVV_ENERGY_BASE_URL", &mut self.energy_base_url),
            ("MVV_NATURE_EVENTS_DATASET", &mut self.nature_events_dataset),
            ("MVV_AGENDA_DATASET", &mut self.agenda_dataset),
            ("MVV_ENERGY_DATASET", &mut self.energy_dataset),
        ];

        for (var, field) in overrides {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    *field = value;
                }
            }
        }
    }
}
