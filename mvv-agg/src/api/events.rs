//! Geolocated event listing for the map surface

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::services::EventRecord;
use crate::AppState;

/// GET /api/events/{city}
///
/// Geolocated events around one commune, ready for map markers. 404 when the
/// city does not resolve; an empty list when it resolves but the catalog has
/// nothing placeable.
pub async fn get_events(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> ApiResult<Json<Vec<EventRecord>>> {
    state
        .aggregator
        .events(&city)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown commune: {}", city)))
}

/// Build event routes
pub fn event_routes() -> Router<AppState> {
    Router::new().route("/api/events/:city", get(get_events))
}
