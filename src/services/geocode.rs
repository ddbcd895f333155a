use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// One geocoding hit, trimmed to what trip planning needs.
#[derive(Debug, Clone, Serialize)]
pub struct Place {
    pub name: String,
    pub short_name: String,
    pub lat: f64,
    pub lng: f64,
    pub place_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

// Nominatim serializes coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    place_id: i64,
    display_name: String,
    #[serde(default)]
    name: Option<String>,
    lat: String,
    lon: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    #[serde(default)]
    display_name: Option<String>,
}

/// Client for a Nominatim-compatible geocoding service.
#[derive(Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Free-text place search. Entries whose coordinates fail to parse are
    /// dropped rather than failing the whole search.
    pub async fn search(&self, query: &str) -> AppResult<Vec<Place>> {
        let url = format!("{}/search", self.base_url);
        let hits: Vec<NominatimPlace> = self
            .http
            .get(&url)
            .query(&[
                ("format", "json"),
                ("q", query),
                ("limit", "5"),
                ("addressdetails", "1"),
            ])
            .send()
            .await?
            .json()
            .await?;

        let places = hits
            .into_iter()
            .filter_map(|hit| {
                let lat = hit.lat.parse().ok()?;
                let lng = hit.lon.parse().ok()?;
                let short_name = hit.name.filter(|n| !n.is_empty()).unwrap_or_else(|| {
                    hit.display_name
                        .split(',')
                        .next()
                        .unwrap_or(&hit.display_name)
                        .to_string()
                });

                Some(Place {
                    name: hit.display_name,
                    short_name,
                    lat,
                    lng,
                    place_id: hit.place_id,
                    kind: hit.kind.unwrap_or_default(),
                })
            })
            .collect();

        Ok(places)
    }

    /// Reverse geocode to a display address. Falls back to a plain
    /// coordinate string when the service is unreachable or has no answer.
    pub async fn reverse(&self, lat: f64, lng: f64) -> String {
        match self.reverse_lookup(lat, lng).await {
            Ok(NominatimReverse {
                display_name: Some(name),
            }) => name,
            Ok(_) => format!("{:.4}, {:.4}", lat, lng),
            Err(err) => {
                tracing::warn!(error = %err, "Reverse geocoding failed");
                format!("{:.4}, {:.4}", lat, lng)
            }
        }
    }

    async fn reverse_lookup(&self, lat: f64, lng: f64) -> Result<NominatimReverse, reqwest::Error> {
        let url = format!("{}/reverse", self.base_url);
        self.http
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
            ])
            .send()
            .await?
            .json()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominatim_place_parses_string_coordinates() {
        let body = r#"[{
            "place_id": 12345,
            "display_name": "Connaught Place, New Delhi, Delhi, India",
            "name": "Connaught Place",
            "lat": "28.6139",
            "lon": "77.2090",
            "type": "neighbourhood"
        }]"#;
        let hits: Vec<NominatimPlace> = serde_json::from_str(body).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].lat.parse::<f64>().unwrap(), 28.6139);
    }

    #[test]
    fn test_nominatim_place_tolerates_missing_optionals() {
        let body = r#"[{
            "place_id": 9,
            "display_name": "Somewhere, Earth",
            "lat": "1.0",
            "lon": "2.0"
        }]"#;
        let hits: Vec<NominatimPlace> = serde_json::from_str(body).unwrap();
        assert!(hits[0].name.is_none());
        assert!(hits[0].kind.is_none());
    }
}
