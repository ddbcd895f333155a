use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::AppState;
use crate::handlers::{group, place, trip};
use crate::middleware::rate_limit::{create_public_governor, log_request};

pub fn create_router(state: AppState) -> Router {
    // IP-based governor for the whole public surface
    let public_governor = create_public_governor();

    let api_routes = Router::new()
        // Trip planning
        .route("/places/search", get(place::search_places))
        .route("/places/reverse", get(place::reverse_geocode))
        // Fare engine
        .route("/trips/estimate", post(trip::estimate_trip))
        .route("/fare/share", post(trip::fare_share))
        // Group matching
        .route("/groups", post(group::create_group))
        .route("/groups/search", get(group::search_groups))
        .route("/groups/{id}", get(group::get_group))
        .route("/groups/{id}/join", post(group::join_group))
        .route("/groups/{id}/complete-search", post(group::complete_search))
        .layer(public_governor)
        .layer(middleware::from_fn(log_request));

    Router::new().nest("/api", api_routes).with_state(state)
}
