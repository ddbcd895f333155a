use serde::Deserialize;
use thiserror::Error;

/// Distance and duration of one routed leg, as reported by the router.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("routing request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no route found between the given points")]
    NoRoute,
}

/// A source of routed trip metrics. The fare engine only ever sees this
/// trait, so tests substitute stubs for the live OSRM client.
pub trait RouteSource {
    /// Route between two `(lat, lng)` pairs.
    fn route(
        &self,
        origin: (f64, f64),
        destination: (f64, f64),
    ) -> impl Future<Output = Result<RouteSummary, RouteError>> + Send;
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
}

/// Client for an OSRM-compatible routing service.
#[derive(Clone)]
pub struct OsrmClient {
    http: reqwest::Client,
    base_url: String,
}

impl OsrmClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl RouteSource for OsrmClient {
    async fn route(
        &self,
        origin: (f64, f64),
        destination: (f64, f64),
    ) -> Result<RouteSummary, RouteError> {
        // OSRM expects lng,lat order.
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=false",
            self.base_url, origin.1, origin.0, destination.1, destination.0
        );

        let response: OsrmResponse = self.http.get(&url).send().await?.json().await?;

        if response.code != "Ok" {
            return Err(RouteError::NoRoute);
        }

        let route = response.routes.first().ok_or(RouteError::NoRoute)?;

        Ok(RouteSummary {
            distance_meters: route.distance,
            duration_seconds: route.duration,
        })
    }
}
