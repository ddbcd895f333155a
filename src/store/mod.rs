use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::fare::TripEndpoint;
use crate::utils::geo::is_within_radius;

pub const MAX_GROUP_MEMBERS: u32 = 4;

/// How many groups a search returns at most.
const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Searching,
    Full,
    Matched,
}

/// A pooling group for one trip. Lives only for the session; there is no
/// persistence behind this.
#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub id: Uuid,
    pub group_name: String,
    pub origin: TripEndpoint,
    pub destination: TripEndpoint,
    pub members: Vec<Uuid>,
    pub member_count: u32,
    pub max_members: u32,
    pub status: GroupStatus,
    pub match_quality: String,
    pub travel_advice: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn new(
        origin: TripEndpoint,
        destination: TripEndpoint,
        creator: Uuid,
        group_name: String,
        match_quality: String,
        travel_advice: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            group_name,
            origin,
            destination,
            members: vec![creator],
            member_count: 1,
            max_members: MAX_GROUP_MEMBERS,
            status: GroupStatus::Searching,
            match_quality,
            travel_advice,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Session-scoped group storage shared across handlers.
#[derive(Clone, Default)]
pub struct GroupStore {
    groups: Arc<RwLock<HashMap<Uuid, Group>>>,
}

impl GroupStore {
    pub async fn insert(&self, group: Group) {
        self.groups.write().await.insert(group.id, group);
    }

    pub async fn get(&self, id: Uuid) -> Option<Group> {
        self.groups.read().await.get(&id).cloned()
    }

    /// Add a member, enforcing the capacity and duplicate guards.
    pub async fn join(&self, id: Uuid, member: Uuid) -> AppResult<Group> {
        let mut groups = self.groups.write().await;
        let group = groups
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

        if group.member_count >= group.max_members {
            return Err(AppError::Conflict("Group is full".to_string()));
        }
        if group.members.contains(&member) {
            return Err(AppError::Conflict(
                "Already a member of this group".to_string(),
            ));
        }

        group.members.push(member);
        group.member_count += 1;
        if group.member_count >= group.max_members {
            group.status = GroupStatus::Full;
        }
        group.updated_at = Utc::now();

        Ok(group.clone())
    }

    /// Open groups whose destination lies within `radius_km` of the given
    /// point, newest first, capped.
    pub async fn find_matching(&self, dest_lat: f64, dest_lng: f64, radius_km: f64) -> Vec<Group> {
        let groups = self.groups.read().await;
        let mut matches: Vec<Group> = groups
            .values()
            .filter(|g| g.status == GroupStatus::Searching)
            .filter(|g| {
                is_within_radius(
                    g.destination.lat,
                    g.destination.lng,
                    dest_lat,
                    dest_lng,
                    radius_km,
                )
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(SEARCH_LIMIT);
        matches
    }

    /// End the matching phase: settle on a final member count and mark the
    /// group matched. The demo has no real rider pool, so the count is
    /// simulated by the caller.
    pub async fn complete_search(&self, id: Uuid, member_count: u32) -> AppResult<Group> {
        let mut groups = self.groups.write().await;
        let group = groups
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

        group.member_count = member_count.clamp(group.member_count, group.max_members);
        group.status = GroupStatus::Matched;
        group.updated_at = Utc::now();

        Ok(group.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(name: &str, lat: f64, lng: f64) -> TripEndpoint {
        TripEndpoint {
            name: name.to_string(),
            lat,
            lng,
        }
    }

    fn sample_group(dest_lat: f64, dest_lng: f64) -> Group {
        Group::new(
            endpoint("Origin", 28.6139, 77.2090),
            endpoint("Destination", dest_lat, dest_lng),
            Uuid::new_v4(),
            "Test Group".to_string(),
            "Good".to_string(),
            "Advice".to_string(),
        )
    }

    #[tokio::test]
    async fn test_join_adds_member_and_fills_group() {
        let store = GroupStore::default();
        let group = sample_group(28.5355, 77.3910);
        let id = group.id;
        store.insert(group).await;

        for i in 1..MAX_GROUP_MEMBERS {
            let joined = store.join(id, Uuid::new_v4()).await.unwrap();
            assert_eq!(joined.member_count, i + 1);
        }

        let full = store.get(id).await.unwrap();
        assert_eq!(full.status, GroupStatus::Full);

        let err = store.join(id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_join_rejects_duplicate_member() {
        let store = GroupStore::default();
        let group = sample_group(28.5355, 77.3910);
        let id = group.id;
        let creator = group.members[0];
        store.insert(group).await;

        let err = store.join(id, creator).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_join_missing_group() {
        let store = GroupStore::default();
        let err = store.join(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_matching_filters_by_radius_and_status() {
        let store = GroupStore::default();

        let near = sample_group(28.5355, 77.3910);
        let near_id = near.id;
        store.insert(near).await;

        // Same city, a few hundred meters off.
        let also_near = sample_group(28.5370, 77.3950);
        store.insert(also_near).await;

        // Another city entirely.
        store.insert(sample_group(19.0760, 72.8777)).await;

        // Near, but already matched.
        let matched = sample_group(28.5360, 77.3920);
        let matched_id = matched.id;
        store.insert(matched).await;
        store.complete_search(matched_id, 3).await.unwrap();

        let found = store.find_matching(28.5355, 77.3910, 3.0).await;
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|g| g.id == near_id));
        assert!(found.iter().all(|g| g.status == GroupStatus::Searching));
    }

    #[tokio::test]
    async fn test_complete_search_clamps_member_count() {
        let store = GroupStore::default();
        let group = sample_group(28.5355, 77.3910);
        let id = group.id;
        store.insert(group).await;

        let matched = store.complete_search(id, 99).await.unwrap();
        assert_eq!(matched.member_count, MAX_GROUP_MEMBERS);
        assert_eq!(matched.status, GroupStatus::Matched);
    }
}
