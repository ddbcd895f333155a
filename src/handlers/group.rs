use axum::{
    Json,
    extract::{Path, Query, State},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::fare::TripEndpoint;
use crate::services::ai;
use crate::store::{Group, MAX_GROUP_MEMBERS};

const DEFAULT_SEARCH_RADIUS_KM: f64 = 3.0;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub rider_id: Uuid,
    pub origin: TripEndpoint,
    pub destination: TripEndpoint,
}

/// Open a new pooling group for a trip. Naming and advice come from the AI
/// advisor when it is available, with fixed defaults otherwise.
pub async fn create_group(
    State(state): State<AppState>,
    Json(payload): Json<CreateGroupRequest>,
) -> AppResult<Json<Group>> {
    let suggestions = ai::suggest_group(
        state.advisor.as_ref(),
        &payload.origin.name,
        &payload.destination.name,
        1,
    )
    .await;

    let group = Group::new(
        payload.origin,
        payload.destination,
        payload.rider_id,
        suggestions.group_name,
        suggestions.match_quality,
        suggestions.travel_advice,
    );

    tracing::info!(group_id = %group.id, "Group created");
    state.groups.insert(group.clone()).await;

    Ok(Json(group))
}

#[derive(Debug, Deserialize)]
pub struct SearchGroupsQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: Option<f64>,
}

/// Find open groups heading to roughly the same destination.
pub async fn search_groups(
    State(state): State<AppState>,
    Query(params): Query<SearchGroupsQuery>,
) -> AppResult<Json<Vec<Group>>> {
    let radius = params.radius_km.unwrap_or(DEFAULT_SEARCH_RADIUS_KM);
    if radius <= 0.0 {
        return Err(AppError::BadRequest(
            "radius_km must be positive".to_string(),
        ));
    }

    let groups = state.groups.find_matching(params.lat, params.lng, radius).await;
    Ok(Json(groups))
}

/// Fetch one group.
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<Group>> {
    let group = state
        .groups
        .get(group_id)
        .await
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;
    Ok(Json(group))
}

#[derive(Debug, Deserialize)]
pub struct JoinGroupRequest {
    pub rider_id: Uuid,
}

/// Join an open group.
pub async fn join_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<JoinGroupRequest>,
) -> AppResult<Json<Group>> {
    let group = state.groups.join(group_id, payload.rider_id).await?;
    tracing::info!(group_id = %group.id, member_count = group.member_count, "Rider joined group");
    Ok(Json(group))
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub group: Group,
}

/// End the simulated matching phase. There is no real rider pool behind
/// the demo, so the final member count is drawn at random up to capacity.
pub async fn complete_search(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<MatchResponse>> {
    let member_count = rand::thread_rng().gen_range(2..=MAX_GROUP_MEMBERS);
    let group = state.groups.complete_search(group_id, member_count).await?;

    tracing::info!(
        group_id = %group.id,
        member_count = group.member_count,
        "Group matching complete"
    );

    Ok(Json(MatchResponse { group }))
}
