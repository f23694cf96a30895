//! Commune resolution against the national geocoding registry
//!
//! Maps free-text city input to a canonical administrative record, restricted
//! to the Breton departments. Resolution failure and "no such commune" are
//! both reported as `None`; the failure cause is logged at warn level so the
//! distinction stays visible operationally.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "MaVilleVerte/0.1.0 (https://github.com/mvv/mvv)";
const CANDIDATE_LIMIT: u32 = 20;

/// Department code → name table for the target region (Brittany)
const DEPARTMENTS: [(&str, &str); 4] = [
    ("22", "Côtes-d'Armor"),
    ("29", "Finistère"),
    ("35", "Ille-et-Vilaine"),
    ("56", "Morbihan"),
];

/// Look up the human-readable name for an in-region department code
pub fn department_name(code: &str) -> Option<&'static str> {
    DEPARTMENTS
        .iter()
        .find(|(dept, _)| *dept == code)
        .map(|(_, name)| *name)
}

/// Geocoding client errors
#[derive(Debug, Error)]
pub enum GeoError {
    /// Network communication error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Registry returned an error response
    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    /// Failed to parse registry response JSON
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Canonical administrative record for one commune
///
/// Constructed fresh per resolution call; immutable; not cached.
#[derive(Debug, Clone, Serialize)]
pub struct Commune {
    /// Commune name as recorded in the registry
    pub name: String,
    /// Department name, from the fixed in-region table
    pub department_name: String,
    /// Legal population, when the registry carries it
    pub population: Option<u64>,
    /// INSEE commune code (stable administrative identifier)
    pub insee_code: String,
}

/// One candidate from the geocoding registry search
#[derive(Debug, Clone, Deserialize)]
pub struct GeoCandidate {
    /// Commune name
    pub nom: String,
    /// INSEE commune code
    pub code: String,
    /// Department code
    #[serde(rename = "codeDepartement")]
    pub code_departement: String,
    /// Legal population
    pub population: Option<u64>,
}

/// Filter candidates to the in-region departments and keep the most populous
///
/// Sort is stable, so equally-populated candidates keep the registry's order.
pub fn select_in_region(candidates: Vec<GeoCandidate>) -> Option<Commune> {
    let mut in_region: Vec<GeoCandidate> = candidates
        .into_iter()
        .filter(|c| department_name(&c.code_departement).is_some())
        .collect();

    in_region.sort_by_key(|c| std::cmp::Reverse(c.population.unwrap_or(0)));

    in_region.into_iter().next().map(|c| Commune {
        department_name: department_name(&c.code_departement)
            .unwrap_or_default()
            .to_string(),
        name: c.nom,
        population: c.population,
        insee_code: c.code,
    })
}

/// Commune resolver backed by the geo.api.gouv.fr communes endpoint
pub struct CommuneResolver {
    http_client: reqwest::Client,
    base_url: String,
}

impl CommuneResolver {
    /// Create a resolver against the given registry base URL
    pub fn new(base_url: &str) -> Result<Self, GeoError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GeoError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve free-text input to a canonical in-region commune
    ///
    /// Returns `None` for blank input, out-of-region matches, no match at
    /// all, or a failed/malformed registry response.
    pub async fn resolve(&self, raw_name: &str) -> Option<Commune> {
        let name = raw_name.trim();
        if name.is_empty() {
            return None;
        }

        match self.search(name).await {
            Ok(candidates) => {
                let commune = select_in_region(candidates);
                if commune.is_none() {
                    tracing::debug!(query = %name, "No in-region commune matched");
                }
                commune
            }
            Err(e) => {
                tracing::warn!(query = %name, error = %e, "Commune lookup failed");
                None
            }
        }
    }

    /// Query the registry for up to 20 candidates, boosted by population
    async fn search(&self, name: &str) -> Result<Vec<GeoCandidate>, GeoError> {
        let url = format!("{}/communes", self.base_url);

        tracing::debug!(query = %name, url = %url, "Querying geocoding registry");

        let limit = CANDIDATE_LIMIT.to_string();
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("nom", name),
                ("fields", "nom,code,codeDepartement,population"),
                ("boost", "population"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GeoError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeoError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| GeoError::ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(nom: &str, code: &str, dept: &str, population: Option<u64>) -> GeoCandidate {
        GeoCandidate {
            nom: nom.to_string(),
            code: code.to_string(),
            code_departement: dept.to_string(),
            population,
        }
    }

    #[test]
    fn test_department_table() {
        assert_eq!(department_name("35"), Some("Ille-et-Vilaine"));
        assert_eq!(department_name("29"), Some("Finistère"));
        assert_eq!(department_name("69"), None);
    }

    #[test]
    fn test_out_of_region_candidates_rejected() {
        // Lyon: large population, but department 69 is not in the region
        let candidates = vec![candidate("Lyon", "69123", "69", Some(522_969))];
        assert!(select_in_region(candidates).is_none());
    }

    #[test]
    fn test_highest_population_wins() {
        let candidates = vec![
            candidate("Montfort-sur-Meu", "35188", "35", Some(6_911)),
            candidate("Rennes", "35238", "35", Some(222_485)),
            candidate("Lyon", "69123", "69", Some(522_969)),
        ];

        let commune = select_in_region(candidates).unwrap();
        assert_eq!(commune.name, "Rennes");
        assert_eq!(commune.insee_code, "35238");
        assert_eq!(commune.department_name, "Ille-et-Vilaine");
    }

    #[test]
    fn test_missing_population_sorts_last() {
        let candidates = vec![
            candidate("Plouzané", "29212", "29", None),
            candidate("Brest", "29019", "29", Some(139_926)),
        ];

        let commune = select_in_region(candidates).unwrap();
        assert_eq!(commune.name, "Brest");
    }

    #[test]
    fn test_stable_order_on_population_tie() {
        let candidates = vec![
            candidate("Le Faou", "29053", "29", Some(1_800)),
            candidate("Guipavas", "29075", "29", Some(1_800)),
        ];

        // Stable sort: the registry's first candidate is kept on a tie
        let commune = select_in_region(candidates).unwrap();
        assert_eq!(commune.name, "Le Faou");
    }

    #[test]
    fn test_empty_candidate_list() {
        assert!(select_in_region(Vec::new()).is_none());
    }
}
