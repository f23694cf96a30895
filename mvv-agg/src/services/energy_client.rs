//! Annual electricity/gas consumption adapter
//!
//! The upstream catalog's column schema is not contractually fixed: the
//! carrier ("filière") column and the consumption column are discovered at
//! query time by matching field names against ordered candidates, and the
//! consumption unit (kWh vs MWh) is read off the column name. Discovery is a
//! pure function so schema drift can be unit-tested without network access.
//!
//! Fallback policy: successive years are attempted in descending order; the
//! first year yielding a non-null electricity or gas value wins. If every
//! year fails, or the breaker is already open, fixed population-agnostic
//! averages are returned with `estimated = true`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

use super::commune_resolver::Commune;

const USER_AGENT: &str = "MaVilleVerte/0.1.0 (https://github.com/mvv/mvv)";
const ROW_LIMIT: u32 = 100;

/// Years attempted, most recent first
pub const LOOKUP_YEARS: [u16; 4] = [2023, 2022, 2021, 2020];

/// National residential averages used when every lookup fails (kWh/hab/year)
pub const FALLBACK_ELECTRICITY_KWH: f64 = 2250.0;
/// Gas counterpart of [`FALLBACK_ELECTRICITY_KWH`]
pub const FALLBACK_GAS_KWH: f64 = 1800.0;

/// Per-capita values above this ceiling are implausible and discarded
pub const MAX_PLAUSIBLE_KWH_PER_CAPITA: f64 = 20_000.0;

/// Energy catalog client errors
#[derive(Debug, Error)]
pub enum EnergyError {
    /// Network communication error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Upstream refused access; trips the breaker
    #[error("Access denied by upstream")]
    AccessDenied,

    /// Catalog returned an error response
    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    /// Failed to parse catalog response JSON
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Consumption column unit, detected from the column name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumptionUnit {
    KilowattHours,
    MegawattHours,
}

impl ConsumptionUnit {
    /// Multiplier aligning a value in this unit to kWh
    pub fn to_kwh_factor(self) -> f64 {
        match self {
            Self::KilowattHours => 1.0,
            Self::MegawattHours => 1000.0,
        }
    }
}

/// Columns discovered in one upstream payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyFields {
    /// Energy-carrier column name
    pub carrier: String,
    /// Consumption-magnitude column name
    pub consumption: String,
    /// Unit of the consumption column
    pub unit: ConsumptionUnit,
}

/// Discover the carrier and consumption columns among available field names
///
/// Ordered candidates, first match wins; both columns must match or the
/// payload is unusable (never guess).
pub fn resolve_energy_fields(field_names: &[String]) -> Option<EnergyFields> {
    let carrier_matchers: [fn(&str) -> bool; 4] = [
        |n| n == "filiere",
        |n| n == "filière",
        |n| n.starts_with("filiere"),
        |n| n == "energie" || n.starts_with("type_energie"),
    ];

    let consumption_matchers: [(fn(&str) -> bool, ConsumptionUnit); 2] = [
        (
            |n| n.contains("conso") && n.contains("mwh"),
            ConsumptionUnit::MegawattHours,
        ),
        (
            |n| n.contains("conso") && n.contains("kwh"),
            ConsumptionUnit::KilowattHours,
        ),
    ];

    let lowered: Vec<String> = field_names.iter().map(|n| n.to_lowercase()).collect();

    let carrier = carrier_matchers.iter().find_map(|matches| {
        lowered
            .iter()
            .position(|n| matches(n))
            .map(|i| field_names[i].clone())
    })?;

    let (consumption, unit) = consumption_matchers.iter().find_map(|(matches, unit)| {
        lowered
            .iter()
            .position(|n| matches(n))
            .map(|i| (field_names[i].clone(), *unit))
    })?;

    Some(EnergyFields {
        carrier,
        consumption,
        unit,
    })
}

/// Breaker recording that the upstream has been observed unreachable
///
/// Owned by the energy client instance (injectable for tests, no cross-test
/// leakage). Once open it short-circuits every further lookup for the
/// instance's lifetime; it is never reset. Unsynchronized on purpose: two
/// requests both probing before either trips it is a benign race.
#[derive(Debug, Default)]
pub struct EnergyBreaker {
    open: AtomicBool,
}

impl EnergyBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    pub fn trip(&self) {
        self.open.store(true, Ordering::Relaxed);
    }
}

/// Per-capita consumption result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyReading {
    /// Electricity, kWh per inhabitant per year
    pub electricity_kwh_per_capita: Option<f64>,
    /// Gas, kWh per inhabitant per year
    pub gas_kwh_per_capita: Option<f64>,
    /// True when the values are the fixed fallback averages
    pub estimated: bool,
}

impl EnergyReading {
    fn fallback() -> Self {
        Self {
            electricity_kwh_per_capita: Some(FALLBACK_ELECTRICITY_KWH),
            gas_kwh_per_capita: Some(FALLBACK_GAS_KWH),
            estimated: true,
        }
    }
}

/// One year of raw consumption rows
#[async_trait]
pub trait ConsumptionSource: Send + Sync {
    /// Fetch the consumption rows for one commune and year
    async fn fetch_year(
        &self,
        insee_code: &str,
        year: u16,
    ) -> Result<Vec<serde_json::Map<String, Value>>, EnergyError>;
}

/// Sum consumption per carrier across rows, normalized to kWh
///
/// Returns `None` when the columns cannot be discovered; otherwise each
/// carrier's total is `None` when no row carried that carrier.
pub fn totals_from_rows(
    rows: &[serde_json::Map<String, Value>],
) -> Option<(Option<f64>, Option<f64>)> {
    // Union of field names across rows, in stable order
    let names: BTreeSet<&str> = rows.iter().flat_map(|r| r.keys().map(String::as_str)).collect();
    let names: Vec<String> = names.into_iter().map(str::to_string).collect();

    let fields = resolve_energy_fields(&names)?;
    let factor = fields.unit.to_kwh_factor();

    let mut electricity: Option<f64> = None;
    let mut gas: Option<f64> = None;

    for row in rows {
        let Some(carrier) = row.get(&fields.carrier).and_then(Value::as_str) else {
            continue;
        };
        let Some(amount) = numeric_value(row.get(&fields.consumption)) else {
            continue;
        };

        let kwh = amount * factor;
        let carrier = carrier.to_lowercase();
        if carrier.contains("lectricit") {
            electricity = Some(electricity.unwrap_or(0.0) + kwh);
        } else if carrier.contains("gaz") {
            gas = Some(gas.unwrap_or(0.0) + kwh);
        }
    }

    Some((electricity, gas))
}

/// Numbers sometimes arrive as JSON strings in these catalogs
fn numeric_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// Divide a commune total by population, discarding implausible results
pub fn per_capita(total_kwh: f64, population: Option<u64>) -> Option<f64> {
    let population = population.filter(|p| *p > 0)?;
    let value = total_kwh / population as f64;
    if value > MAX_PLAUSIBLE_KWH_PER_CAPITA {
        tracing::debug!(value, "Discarding implausible per-capita consumption");
        return None;
    }
    Some(value)
}

/// Multi-year lookup with breaker short-circuit and fixed-average fallback
pub async fn consumption_with_fallback<S: ConsumptionSource + ?Sized>(
    source: &S,
    breaker: &EnergyBreaker,
    commune: &Commune,
    years: &[u16],
) -> EnergyReading {
    if breaker.is_open() {
        tracing::debug!(
            commune = %commune.name,
            "Energy breaker open, using fallback averages"
        );
        return EnergyReading::fallback();
    }

    for &year in years {
        match source.fetch_year(&commune.insee_code, year).await {
            Ok(rows) => {
                let Some((elec_total, gas_total)) = totals_from_rows(&rows) else {
                    tracing::warn!(
                        commune = %commune.name,
                        year,
                        "Energy columns not found in payload"
                    );
                    continue;
                };

                let electricity =
                    elec_total.and_then(|t| per_capita(t, commune.population));
                let gas = gas_total.and_then(|t| per_capita(t, commune.population));

                if electricity.is_some() || gas.is_some() {
                    tracing::debug!(
                        commune = %commune.name,
                        year,
                        ?electricity,
                        ?gas,
                        "Energy consumption resolved"
                    );
                    return EnergyReading {
                        electricity_kwh_per_capita: electricity,
                        gas_kwh_per_capita: gas,
                        estimated: false,
                    };
                }
            }
            Err(EnergyError::AccessDenied) => {
                tracing::warn!(
                    commune = %commune.name,
                    year,
                    "Energy upstream denied access, tripping breaker"
                );
                breaker.trip();
                break;
            }
            Err(e) => {
                tracing::warn!(commune = %commune.name, year, error = %e, "Energy lookup failed");
            }
        }
    }

    EnergyReading::fallback()
}

/// Record-listing response
#[derive(Debug, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// Energy catalog client (Explore v2.1, per INSEE code and year)
pub struct EnergyClient {
    http_client: reqwest::Client,
    base_url: String,
    dataset: String,
    breaker: EnergyBreaker,
}

impl EnergyClient {
    /// Create a client for one consumption dataset
    pub fn new(base_url: &str, dataset: &str) -> Result<Self, EnergyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EnergyError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            dataset: dataset.to_string(),
            breaker: EnergyBreaker::new(),
        })
    }

    /// Per-capita electricity/gas for the commune, with year fallback
    pub async fn per_capita_consumption(&self, commune: &Commune) -> EnergyReading {
        consumption_with_fallback(self, &self.breaker, commune, &LOOKUP_YEARS).await
    }
}

#[async_trait]
impl ConsumptionSource for EnergyClient {
    async fn fetch_year(
        &self,
        insee_code: &str,
        year: u16,
    ) -> Result<Vec<serde_json::Map<String, Value>>, EnergyError> {
        let url = format!("{}/catalog/datasets/{}/records", self.base_url, self.dataset);
        let filter = format!(
            "code_commune=\"{}\" AND annee=\"{}\"",
            insee_code, year
        );

        tracing::debug!(insee = %insee_code, year, url = %url, "Querying energy catalog");

        let limit = ROW_LIMIT.to_string();
        let response = self
            .http_client
            .get(&url)
            .query(&[("where", filter.as_str()), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| EnergyError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(EnergyError::AccessDenied);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EnergyError::ApiError(status.as_u16(), error_text));
        }

        let records: RecordsResponse = response
            .json()
            .await
            .map_err(|e| EnergyError::ParseError(e.to_string()))?;

        Ok(records
            .results
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }
}
