use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::fare::{
    self, DistanceMetrics, FareBreakdown, GroupShare, MetricsSource, TripEndpoint, TripPricing,
};
use crate::services::ai;

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub origin: Option<TripEndpoint>,
    pub destination: Option<TripEndpoint>,
    #[serde(default)]
    pub member_count: Option<i32>,
    /// Ask the AI advisor for an enriched fare. Falls back silently.
    #[serde(default)]
    pub enrich: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingSource {
    Routing,
    GreatCircle,
    FlatDefault,
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub metrics: Option<DistanceMetrics>,
    pub source: PricingSource,
    pub fare: FareBreakdown,
    pub note: Option<String>,
    pub share: Option<GroupShare>,
}

/// Price a trip: resolve distance through the fallback chain, apply the
/// tariff, optionally enrich through the AI advisor, and split across the
/// group when a member count is given. Always answers with a price.
pub async fn estimate_trip(
    State(state): State<AppState>,
    Json(payload): Json<EstimateRequest>,
) -> AppResult<Json<EstimateResponse>> {
    let pricing = fare::resolve_trip_pricing(
        &state.routing,
        payload.origin.as_ref(),
        payload.destination.as_ref(),
    )
    .await;

    let (metrics, source) = match pricing {
        TripPricing::Metered { metrics, source } => (
            Some(metrics),
            match source {
                MetricsSource::Routing => PricingSource::Routing,
                MetricsSource::GreatCircle => PricingSource::GreatCircle,
            },
        ),
        TripPricing::FlatDefault => (None, PricingSource::FlatDefault),
    };

    let mut breakdown = pricing.breakdown();
    let mut note = None;

    if payload.enrich {
        if let Some(metrics) = metrics {
            let origin_name = payload
                .origin
                .as_ref()
                .map_or("Unknown", |e| e.name.as_str());
            let destination_name = payload
                .destination
                .as_ref()
                .map_or("Unknown", |e| e.name.as_str());

            let enriched = ai::enrich_fare(
                state.advisor.as_ref(),
                metrics.kilometers,
                metrics.duration_minutes,
                origin_name,
                destination_name,
            )
            .await;
            breakdown = enriched.fare;
            note = enriched.note;
        }
    }

    let share = payload
        .member_count
        .map(|count| fare::group_share(breakdown.total_fare, count));

    Ok(Json(EstimateResponse {
        metrics,
        source,
        fare: breakdown,
        note,
        share,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub total_fare: f64,
    pub member_count: i32,
}

/// Split a known total across a group.
pub async fn fare_share(Json(payload): Json<ShareRequest>) -> AppResult<Json<GroupShare>> {
    if !payload.total_fare.is_finite() || payload.total_fare < 0.0 {
        return Err(AppError::BadRequest(
            "total_fare must be a non-negative number".to_string(),
        ));
    }

    Ok(Json(fare::group_share(
        payload.total_fare,
        payload.member_count,
    )))
}
