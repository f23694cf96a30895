//! Opendatasoft Explore v2.1 catalog client for the event datasets
//!
//! Three count adapters (nature events, public agenda, eco-tagged agenda)
//! plus the geolocated record listing the map screen consumes. Every fetch
//! failure degrades to `None`; faults never cross the adapter boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::commune_resolver::Commune;

const USER_AGENT: &str = "MaVilleVerte/0.1.0 (https://github.com/mvv/mvv)";
const EVENT_LIST_LIMIT: u32 = 100;

/// Ecological keyword terms for the eco-events disjunction filter
pub const ECO_KEYWORDS: [&str; 20] = [
    "climat",
    "recyclage",
    "biodiversité",
    "mobilité",
    "vélo",
    "énergie",
    "sobriété",
    "compost",
    "déchets",
    "zéro déchet",
    "nature",
    "jardin partagé",
    "permaculture",
    "solaire",
    "éolien",
    "eau",
    "pollution",
    "environnement",
    "transition écologique",
    "réemploi",
];

/// Open-data catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network communication error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Catalog returned an error response
    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    /// Failed to parse catalog response JSON
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Record-count response (`limit=0` queries)
#[derive(Debug, Deserialize)]
struct CountResponse {
    total_count: u64,
}

/// Record-listing response
#[derive(Debug, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// One geolocated event for the map surface
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    /// Upstream record identifier
    pub id: String,
    /// Event title
    pub title: String,
    /// Latitude (WGS84)
    pub latitude: f64,
    /// Longitude (WGS84)
    pub longitude: f64,
    /// Category tag, when the dataset carries one
    pub category: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Start date as published upstream (format varies by dataset)
    pub date: Option<String>,
}

/// Build the catalog `where` filter for eco-tagged events:
/// the commune name AND a disjunction of the ecological keywords.
pub fn eco_where_clause(commune_name: &str) -> String {
    let keywords = ECO_KEYWORDS
        .iter()
        .map(|k| format!("search(\"{}\")", k))
        .collect::<Vec<_>>()
        .join(" OR ");

    format!("search(\"{}\") AND ({})", escape_search(commune_name), keywords)
}

/// Escape double quotes inside a `search()` literal
fn escape_search(text: &str) -> String {
    text.replace('"', "\\\"")
}

/// Pull the first present string among candidate field names
fn first_string(record: &Value, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|key| record.get(*key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Extract a map-ready event from one raw catalog record
///
/// Field names are not contractually fixed across portals, so each attribute
/// is pulled from an ordered candidate list. Records without a usable
/// coordinate pair are dropped (the map cannot place them).
pub fn extract_event(record: &Value) -> Option<EventRecord> {
    let id = first_string(record, &["uid", "id", "recordid"])?;
    let title = first_string(record, &["title", "titre", "nom"])?;

    let (latitude, longitude) = extract_point(record)?;

    Some(EventRecord {
        id,
        title,
        latitude,
        longitude,
        category: first_string(record, &["category", "categorie", "theme"]),
        description: first_string(record, &["description", "descriptif"]),
        date: first_string(record, &["date_start", "date_debut", "date"]),
    })
}

/// Coordinates come either as a `geo_point_2d` object or as flat columns
fn extract_point(record: &Value) -> Option<(f64, f64)> {
    if let Some(point) = record.get("geo_point_2d") {
        let lat = point.get("lat").and_then(Value::as_f64)?;
        let lon = point.get("lon").and_then(Value::as_f64)?;
        return Some((lat, lon));
    }

    let lat = record.get("latitude").and_then(Value::as_f64)?;
    let lon = record.get("longitude").and_then(Value::as_f64)?;
    Some((lat, lon))
}

/// Explore v2.1 catalog client over the event datasets
pub struct OpenDataClient {
    http_client: reqwest::Client,
    base_url: String,
    nature_dataset: String,
    agenda_dataset: String,
}

impl OpenDataClient {
    /// Create a client for one catalog and its two event datasets
    pub fn new(
        base_url: &str,
        nature_dataset: &str,
        agenda_dataset: &str,
    ) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            nature_dataset: nature_dataset.to_string(),
            agenda_dataset: agenda_dataset.to_string(),
        })
    }

    /// Count nature events mentioning the commune
    pub async fn nature_event_count(&self, commune: &Commune) -> Option<u64> {
        self.degraded_count(&self.nature_dataset, commune).await
    }

    /// Count public agenda events mentioning the commune
    pub async fn public_event_count(&self, commune: &Commune) -> Option<u64> {
        self.degraded_count(&self.agenda_dataset, commune).await
    }

    /// Count agenda events matching both the commune and an eco keyword
    pub async fn eco_event_count(&self, commune: &Commune) -> Option<u64> {
        let filter = eco_where_clause(&commune.name);
        match self.record_count(&self.agenda_dataset, &filter).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(
                    commune = %commune.name,
                    error = %e,
                    "Eco event count unavailable"
                );
                None
            }
        }
    }

    /// Geolocated event listing for the map surface
    pub async fn events_for_map(&self, commune: &Commune) -> Option<Vec<EventRecord>> {
        let filter = format!("search(\"{}\")", escape_search(&commune.name));
        match self.fetch_records(&self.agenda_dataset, &filter).await {
            Ok(records) => {
                let events: Vec<EventRecord> =
                    records.iter().filter_map(extract_event).collect();
                tracing::debug!(
                    commune = %commune.name,
                    returned = records.len(),
                    geolocated = events.len(),
                    "Fetched events for map"
                );
                Some(events)
            }
            Err(e) => {
                tracing::warn!(commune = %commune.name, error = %e, "Event listing unavailable");
                None
            }
        }
    }

    async fn degraded_count(&self, dataset: &str, commune: &Commune) -> Option<u64> {
        let filter = format!("search(\"{}\")", escape_search(&commune.name));
        match self.record_count(dataset, &filter).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(
                    dataset = %dataset,
                    commune = %commune.name,
                    error = %e,
                    "Event count unavailable"
                );
                None
            }
        }
    }

    /// Record-count query: `limit=0` returns only `total_count`
    async fn record_count(&self, dataset: &str, filter: &str) -> Result<u64, CatalogError> {
        let url = format!("{}/catalog/datasets/{}/records", self.base_url, dataset);

        let response = self
            .http_client
            .get(&url)
            .query(&[("where", filter), ("limit", "0")])
            .send()
            .await
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError(status.as_u16(), error_text));
        }

        let count: CountResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;

        Ok(count.total_count)
    }

    async fn fetch_records(&self, dataset: &str, filter: &str) -> Result<Vec<Value>, CatalogError> {
        let url = format!("{}/catalog/datasets/{}/records", self.base_url, dataset);

        let limit = EVENT_LIST_LIMIT.to_string();
        let response = self
            .http_client
            .get(&url)
            .query(&[("where", filter), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError(status.as_u16(), error_text));
        }

        let records: RecordsResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;

        Ok(records.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_eco_where_clause_combines_name_and_keywords() {
        let clause = eco_where_clause("Rennes");
        assert!(clause.starts_with("search(\"Rennes\") AND ("));
        assert!(clause.contains("search(\"climat\")"));
        assert!(clause.contains(" OR search(\"recyclage\")"));
        assert_eq!(clause.matches(" OR ").count(), ECO_KEYWORDS.len() - 1);
    }

    #[test]
    fn test_search_literal_escaping() {
        let clause = eco_where_clause("Saint-\"Quoté\"");
        assert!(clause.starts_with("search(\"Saint-\\\"Quoté\\\"\")"));
    }

    #[test]
    fn test_extract_event_geo_point_object() {
        let record = json!({
            "uid": "evt-1",
            "title": "Sortie nature en forêt",
            "geo_point_2d": {"lat": 48.11, "lon": -1.68},
            "category": "nature",
            "date_start": "2025-06-01",
        });

        let event = extract_event(&record).unwrap();
        assert_eq!(event.id, "evt-1");
        assert_eq!(event.latitude, 48.11);
        assert_eq!(event.longitude, -1.68);
        assert_eq!(event.category.as_deref(), Some("nature"));
        assert_eq!(event.date.as_deref(), Some("2025-06-01"));
    }

    #[test]
    fn test_extract_event_flat_coordinates_and_alternate_names() {
        let record = json!({
            "id": "42",
            "titre": "Atelier compost",
            "latitude": 47.65,
            "longitude": -2.76,
            "descriptif": "Initiation au compostage",
        });

        let event = extract_event(&record).unwrap();
        assert_eq!(event.title, "Atelier compost");
        assert_eq!(event.description.as_deref(), Some("Initiation au compostage"));
        assert!(event.category.is_none());
    }

    #[test]
    fn test_extract_event_drops_records_without_coordinates() {
        let record = json!({
            "uid": "evt-2",
            "title": "Conférence climat",
        });

        assert!(extract_event(&record).is_none());
    }
}
