//! Metrics and comparison endpoints
//!
//! The comparison endpoint runs both aggregations concurrently; each side is
//! independently nullable so one unknown city does not hide the other.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::CityMetrics;
use crate::AppState;

/// GET /api/metrics/{city}
///
/// Aggregated indicator record for one commune; 404 when the city does not
/// resolve to an in-region commune.
pub async fn get_metrics(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> ApiResult<Json<CityMetrics>> {
    state
        .aggregator
        .build_metrics(&city)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown commune: {}", city)))
}

/// Query parameters for the comparison endpoint
#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub city_a: String,
    pub city_b: String,
}

/// Side-by-side comparison of two communes
#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub city_a: Option<CityMetrics>,
    pub city_b: Option<CityMetrics>,
}

/// GET /api/compare?city_a=...&city_b=...
///
/// Both aggregations run concurrently. 404 only when neither city resolves.
pub async fn compare(
    State(state): State<AppState>,
    Query(params): Query<CompareParams>,
) -> ApiResult<Json<CompareResponse>> {
    let (city_a, city_b) = tokio::join!(
        state.aggregator.build_metrics(&params.city_a),
        state.aggregator.build_metrics(&params.city_b),
    );

    if city_a.is_none() && city_b.is_none() {
        return Err(ApiError::NotFound(format!(
            "Neither commune resolved: {}, {}",
            params.city_a, params.city_b
        )));
    }

    Ok(Json(CompareResponse { city_a, city_b }))
}

/// Build metrics routes
pub fn metrics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/metrics/:city", get(get_metrics))
        .route("/api/compare", get(compare))
}
