use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppResult;
use crate::services::geocode::Place;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// Place search for trip planning. Queries shorter than the autocomplete
/// threshold return an empty list without hitting the geocoder.
pub async fn search_places(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Place>>> {
    if params.q.trim().chars().count() < 3 {
        return Ok(Json(Vec::new()));
    }

    let places = state.geocoder.search(params.q.trim()).await?;
    Ok(Json(places))
}

#[derive(Debug, Deserialize)]
pub struct ReverseQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize)]
pub struct ReverseResponse {
    pub name: String,
}

/// Resolve device coordinates to a display address.
pub async fn reverse_geocode(
    State(state): State<AppState>,
    Query(params): Query<ReverseQuery>,
) -> Json<ReverseResponse> {
    let name = state.geocoder.reverse(params.lat, params.lng).await;
    Json(ReverseResponse { name })
}
