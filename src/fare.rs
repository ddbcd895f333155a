use serde::{Deserialize, Serialize};

use crate::services::routing::RouteSource;
use crate::utils::geo::haversine_distance;

/// Flat pickup charge, in galleons.
pub const BASE_FARE: f64 = 2.0;
pub const PER_KM_RATE: f64 = 1.5;
pub const PER_MIN_RATE: f64 = 0.5;

/// Assumed average speed when no routed duration is available: 30 km/h,
/// i.e. two minutes per kilometre.
pub const FALLBACK_MIN_PER_KM: f64 = 2.0;

/// Round to two decimal places, the currency resolution used everywhere.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A resolved end of a trip. Immutable once produced by place search or
/// device geolocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripEndpoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// Trip distance and duration, from either a live routed query or the
/// great-circle fallback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceMetrics {
    pub meters: f64,
    pub kilometers: f64,
    pub duration_seconds: f64,
    pub duration_minutes: f64,
}

impl DistanceMetrics {
    /// Metrics from a routed result. Meters and seconds are taken verbatim.
    pub fn from_route(meters: f64, duration_seconds: f64) -> Self {
        Self {
            meters,
            kilometers: meters / 1000.0,
            duration_seconds,
            duration_minutes: (duration_seconds / 60.0).round(),
        }
    }

    /// Metrics from a great-circle distance, with a synthetic duration at
    /// the 30 km/h fallback speed.
    pub fn from_great_circle(kilometers: f64) -> Self {
        Self {
            meters: kilometers * 1000.0,
            kilometers,
            duration_seconds: kilometers * FALLBACK_MIN_PER_KM * 60.0,
            duration_minutes: (kilometers * FALLBACK_MIN_PER_KM).round(),
        }
    }
}

/// Which source produced a set of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsSource {
    Routing,
    GreatCircle,
}

/// Itemized fare for one trip. All fields are rounded to two decimals;
/// `total_fare` is rounded from the unrounded component sum, so it can
/// differ from the sum of the rounded components by up to one cent.
/// Display layers must show the stored `total_fare`, never re-add the parts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub base_fare: f64,
    pub distance_charge: f64,
    pub time_charge: f64,
    pub total_fare: f64,
}

/// One member's portion of a group's total fare.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupShare {
    pub total_fare: f64,
    pub member_count: i32,
    pub share_per_person: f64,
}

/// Price a trip from its distance and duration.
///
/// Inputs are expected to be non-negative; callers clamp negative or NaN
/// values before getting here. Pure and total, no error path.
pub fn estimate_fare(distance_km: f64, duration_min: f64) -> FareBreakdown {
    let distance_charge = distance_km * PER_KM_RATE;
    let time_charge = duration_min * PER_MIN_RATE;
    // Sum the unrounded components, then round once.
    let total_fare = BASE_FARE + distance_charge + time_charge;

    FareBreakdown {
        base_fare: round2(BASE_FARE),
        distance_charge: round2(distance_charge),
        time_charge: round2(time_charge),
        total_fare: round2(total_fare),
    }
}

/// The fixed breakdown used when a trip has no usable coordinates.
pub fn default_breakdown() -> FareBreakdown {
    FareBreakdown {
        base_fare: 2.0,
        distance_charge: 15.0,
        time_charge: 3.0,
        total_fare: 20.0,
    }
}

/// Split a total fare evenly across a group.
///
/// Degenerate guard: a zero or negative member count returns the undivided
/// total rather than an error, matching the product's "always show a price"
/// promise.
pub fn calculate_share(total_fare: f64, member_count: i32) -> f64 {
    if member_count <= 0 {
        return total_fare;
    }
    round2(total_fare / member_count as f64)
}

/// Build the `GroupShare` record handed to the payment step.
pub fn group_share(total_fare: f64, member_count: i32) -> GroupShare {
    GroupShare {
        total_fare,
        member_count,
        share_per_person: calculate_share(total_fare, member_count),
    }
}

/// Outcome of the distance-resolution chain. Exactly one tier produces the
/// result; routing failures never escape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TripPricing {
    /// Tier 1 or 2: we have real or estimated metrics to price from.
    Metered {
        metrics: DistanceMetrics,
        source: MetricsSource,
    },
    /// Tier 3: no coordinates; the caller prices with `default_breakdown`.
    FlatDefault,
}

impl TripPricing {
    /// Price this resolution, dispatching between the metered tariff and
    /// the flat default.
    pub fn breakdown(&self) -> FareBreakdown {
        match self {
            TripPricing::Metered { metrics, .. } => {
                estimate_fare(metrics.kilometers, metrics.duration_minutes)
            }
            TripPricing::FlatDefault => default_breakdown(),
        }
    }
}

/// Resolve trip metrics through the three-tier chain:
/// live routing, then great-circle estimate, then the flat default when
/// either endpoint is missing. Always returns; never surfaces an upstream
/// failure.
pub async fn resolve_trip_pricing<R: RouteSource>(
    router: &R,
    origin: Option<&TripEndpoint>,
    destination: Option<&TripEndpoint>,
) -> TripPricing {
    let (Some(origin), Some(destination)) = (origin, destination) else {
        tracing::warn!("Trip has unresolved endpoints, pricing with the flat default");
        return TripPricing::FlatDefault;
    };

    match router
        .route((origin.lat, origin.lng), (destination.lat, destination.lng))
        .await
    {
        Ok(route) => TripPricing::Metered {
            metrics: DistanceMetrics::from_route(route.distance_meters, route.duration_seconds),
            source: MetricsSource::Routing,
        },
        Err(err) => {
            tracing::warn!(error = %err, "Routing unavailable, falling back to great-circle estimate");
            let km = haversine_distance(origin.lat, origin.lng, destination.lat, destination.lng);
            TripPricing::Metered {
                metrics: DistanceMetrics::from_great_circle(km),
                source: MetricsSource::GreatCircle,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::routing::{RouteError, RouteSummary};

    struct FailingRouter;

    impl RouteSource for FailingRouter {
        async fn route(
            &self,
            _origin: (f64, f64),
            _destination: (f64, f64),
        ) -> Result<RouteSummary, RouteError> {
            Err(RouteError::NoRoute)
        }
    }

    struct FixedRouter {
        meters: f64,
        seconds: f64,
    }

    impl RouteSource for FixedRouter {
        async fn route(
            &self,
            _origin: (f64, f64),
            _destination: (f64, f64),
        ) -> Result<RouteSummary, RouteError> {
            Ok(RouteSummary {
                distance_meters: self.meters,
                duration_seconds: self.seconds,
            })
        }
    }

    fn endpoint(name: &str, lat: f64, lng: f64) -> TripEndpoint {
        TripEndpoint {
            name: name.to_string(),
            lat,
            lng,
        }
    }

    #[test]
    fn test_estimate_fare_basic() {
        let fare = estimate_fare(10.0, 20.0);
        assert_eq!(fare.base_fare, 2.0);
        assert_eq!(fare.distance_charge, 15.0);
        assert_eq!(fare.time_charge, 10.0);
        assert_eq!(fare.total_fare, 27.0);
    }

    #[test]
    fn test_estimate_fare_zero_trip() {
        let fare = estimate_fare(0.0, 0.0);
        assert_eq!(fare.distance_charge, 0.0);
        assert_eq!(fare.time_charge, 0.0);
        assert_eq!(fare.total_fare, 2.0);
    }

    #[test]
    fn test_total_rounds_unrounded_sum_not_rounded_parts() {
        // 1.336 km -> charge 2.004, 4.008 min -> charge 2.004. Each part
        // rounds down to 2.00, but the unrounded sum 6.008 rounds up.
        let fare = estimate_fare(1.336, 4.008);
        assert_eq!(fare.distance_charge, 2.0);
        assert_eq!(fare.time_charge, 2.0);
        assert_eq!(fare.total_fare, 6.01);

        let sum_of_rounded =
            round2(fare.base_fare + fare.distance_charge + fare.time_charge);
        assert_eq!(sum_of_rounded, 6.0);
        assert!((fare.total_fare - sum_of_rounded).abs() > 0.009);
    }

    #[test]
    fn test_calculate_share_exact() {
        assert_eq!(calculate_share(20.0, 4), 5.0);
    }

    #[test]
    fn test_share_times_members_stays_within_a_cent() {
        for &(total, members) in &[(33.25, 3), (20.0, 4), (99.99, 7), (0.05, 2), (10.0, 3)] {
            let share = calculate_share(total, members);
            let reassembled = share * members as f64;
            assert!(
                (reassembled - total).abs() <= 0.01 * members as f64,
                "total={} members={} share={}",
                total,
                members,
                share
            );
        }
    }

    #[test]
    fn test_calculate_share_degenerate_member_counts() {
        assert_eq!(calculate_share(33.25, 0), 33.25);
        assert_eq!(calculate_share(33.25, -3), 33.25);
    }

    #[test]
    fn test_group_share_record() {
        let share = group_share(20.0, 4);
        assert_eq!(share.total_fare, 20.0);
        assert_eq!(share.member_count, 4);
        assert_eq!(share.share_per_person, 5.0);
    }

    #[test]
    fn test_default_breakdown_literal() {
        let fare = default_breakdown();
        assert_eq!(fare.base_fare, 2.0);
        assert_eq!(fare.distance_charge, 15.0);
        assert_eq!(fare.time_charge, 3.0);
        assert_eq!(fare.total_fare, 20.0);
    }

    #[test]
    fn test_metrics_from_route_invariants() {
        let metrics = DistanceMetrics::from_route(12500.0, 1510.0);
        assert_eq!(metrics.kilometers, 12.5);
        assert_eq!(metrics.duration_minutes, 25.0);
    }

    #[tokio::test]
    async fn test_tier_one_uses_routed_metrics() {
        let router = FixedRouter {
            meters: 12500.0,
            seconds: 1500.0,
        };
        let origin = endpoint("A", 28.6139, 77.2090);
        let dest = endpoint("B", 28.5355, 77.3910);

        let pricing = resolve_trip_pricing(&router, Some(&origin), Some(&dest)).await;
        match pricing {
            TripPricing::Metered { metrics, source } => {
                assert_eq!(source, MetricsSource::Routing);
                assert_eq!(metrics.kilometers, 12.5);
                assert_eq!(metrics.duration_minutes, 25.0);
            }
            TripPricing::FlatDefault => panic!("expected metered pricing"),
        }
    }

    #[tokio::test]
    async fn test_tier_two_matches_haversine() {
        let origin = endpoint("A", 28.6139, 77.2090);
        let dest = endpoint("B", 28.5355, 77.3910);

        let pricing = resolve_trip_pricing(&FailingRouter, Some(&origin), Some(&dest)).await;
        let TripPricing::Metered { metrics, source } = pricing else {
            panic!("expected metered pricing");
        };
        assert_eq!(source, MetricsSource::GreatCircle);

        let km = haversine_distance(origin.lat, origin.lng, dest.lat, dest.lng);
        assert!((metrics.kilometers - km).abs() < km * 0.001);
        assert_eq!(metrics.duration_minutes, (km * 2.0).round());
        assert_eq!(metrics.meters, metrics.kilometers * 1000.0);

        // These two points are ~19.8 km apart on the great circle.
        assert!((metrics.kilometers - 19.8).abs() < 0.3);

        // Pricing the fallback metrics stays consistent with the tariff.
        let fare = pricing.breakdown();
        let expected =
            round2(BASE_FARE + km * PER_KM_RATE + (km * 2.0).round() * PER_MIN_RATE);
        assert!((fare.total_fare - expected).abs() < 0.011);
    }

    #[tokio::test]
    async fn test_tier_three_without_coordinates() {
        let dest = endpoint("B", 28.5355, 77.3910);

        let pricing = resolve_trip_pricing(&FailingRouter, None, Some(&dest)).await;
        assert_eq!(pricing, TripPricing::FlatDefault);
        assert_eq!(pricing.breakdown(), default_breakdown());

        let pricing = resolve_trip_pricing(&FailingRouter, None, None).await;
        assert_eq!(pricing, TripPricing::FlatDefault);
    }
}
