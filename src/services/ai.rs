use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::fare::{FareBreakdown, estimate_fare, round2};

/// A text-generation capability. Implementations return the raw model
/// reply; prompt building and reply parsing live here so the model stays
/// substitutable in tests.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> impl Future<Output = AppResult<String>> + Send;
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Build the client from configuration. Returns `None` when no API key
    /// is configured; callers treat that as "advisor not ready" and use the
    /// deterministic defaults.
    pub fn from_config(http: reqwest::Client, config: &Config) -> Option<Self> {
        let api_key = config.gemini_api_key.clone()?;
        Some(Self {
            http,
            api_key,
            model: config.gemini_model.clone(),
        })
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response: GenerateResponse = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Upstream("Model returned no candidates".to_string()))?;

        Ok(candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect())
    }
}

// ============ Fare Enrichment ============

/// A model-suggested fare plus its flavor note. Only ever constructed from
/// replies that pass the same breakdown invariants as the estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedFare {
    pub fare: FareBreakdown,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FareReply {
    base_fare: f64,
    distance_charge: f64,
    time_charge: f64,
    total_fare: f64,
    #[serde(default)]
    note: Option<String>,
}

fn fare_prompt(distance_km: f64, duration_min: f64, origin: &str, destination: &str) -> String {
    format!(
        "You are the fare desk of a magical ride-pooling service whose currency is galleons.\n\
         Suggest a fare for this trip:\n\
         - Distance: {distance_km} km\n\
         - Duration: {duration_min} minutes\n\
         - From: {origin}\n\
         - To: {destination}\n\n\
         Respond ONLY with a JSON object (no markdown, no explanation):\n\
         {{\"base_fare\": <number>, \"distance_charge\": <number>, \"time_charge\": <number>, \
         \"total_fare\": <number>, \"note\": \"<one short whimsical sentence about the journey>\"}}\n\
         Every number must have at most two decimal places and total_fare must equal \
         base_fare + distance_charge + time_charge."
    )
}

/// Extract the first balanced `{...}` substring, skipping braces inside
/// JSON string literals. Returns `None` when no balanced object exists.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

fn two_decimal(value: f64) -> bool {
    value.is_finite() && (round2(value) - value).abs() < 1e-9
}

/// Parse and validate a model reply. The reply must carry the breakdown
/// shape, every amount already at currency resolution, and a total within
/// one cent of the component sum.
fn parse_fare_reply(text: &str) -> Option<EnrichedFare> {
    let object = extract_json_object(text)?;
    let reply: FareReply = serde_json::from_str(object).ok()?;

    let amounts = [
        reply.base_fare,
        reply.distance_charge,
        reply.time_charge,
        reply.total_fare,
    ];
    if amounts.iter().any(|&a| !two_decimal(a) || a < 0.0) {
        return None;
    }

    let component_sum = round2(reply.base_fare + reply.distance_charge + reply.time_charge);
    if (reply.total_fare - component_sum).abs() > 0.01 {
        return None;
    }

    Some(EnrichedFare {
        fare: FareBreakdown {
            base_fare: reply.base_fare,
            distance_charge: reply.distance_charge,
            time_charge: reply.time_charge,
            total_fare: reply.total_fare,
        },
        note: reply.note,
    })
}

/// Ask the model for an enriched fare, falling back to the deterministic
/// estimator when the model is absent, fails, or replies with anything
/// that does not parse into a valid breakdown. Never errors outward.
pub async fn enrich_fare<M: TextGenerator>(
    model: Option<&M>,
    distance_km: f64,
    duration_min: f64,
    origin: &str,
    destination: &str,
) -> EnrichedFare {
    let fallback = || EnrichedFare {
        fare: estimate_fare(distance_km, duration_min),
        note: None,
    };

    let Some(model) = model else {
        return fallback();
    };

    match model
        .generate(&fare_prompt(distance_km, duration_min, origin, destination))
        .await
    {
        Ok(reply) => parse_fare_reply(&reply).unwrap_or_else(|| {
            tracing::warn!("AI fare reply failed validation, using the estimator");
            fallback()
        }),
        Err(err) => {
            tracing::warn!(error = %err, "AI fare enrichment failed, using the estimator");
            fallback()
        }
    }
}

// ============ Group Suggestions ============

/// Naming and advice for a freshly created group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSuggestions {
    pub group_name: String,
    pub match_quality: String,
    pub travel_advice: String,
}

impl Default for GroupSuggestions {
    fn default() -> Self {
        Self {
            group_name: "The Fellowship of Travellers".to_string(),
            match_quality: "Good".to_string(),
            travel_advice: "Together we journey, together we save!".to_string(),
        }
    }
}

fn group_prompt(origin: &str, destination: &str, group_size: u32) -> String {
    format!(
        "You are a matching advisor for a magical ride-pooling service.\n\
         A traveller is looking for companions:\n\
         - From: {origin}\n\
         - To: {destination}\n\
         - Current group size: {group_size}\n\n\
         Respond ONLY with a JSON object (no markdown):\n\
         {{\"group_name\": \"<creative group name>\", \"match_quality\": \"<Excellent/Good/Fair>\", \
         \"travel_advice\": \"<short advice for the group>\"}}"
    )
}

/// Ask the model to name and advise a group, with deterministic defaults
/// on any failure.
pub async fn suggest_group<M: TextGenerator>(
    model: Option<&M>,
    origin: &str,
    destination: &str,
    group_size: u32,
) -> GroupSuggestions {
    let Some(model) = model else {
        return GroupSuggestions::default();
    };

    match model
        .generate(&group_prompt(origin, destination, group_size))
        .await
    {
        Ok(reply) => extract_json_object(&reply)
            .and_then(|object| serde_json::from_str(object).ok())
            .unwrap_or_else(|| {
                tracing::warn!("AI group suggestion failed to parse, using defaults");
                GroupSuggestions::default()
            }),
        Err(err) => {
            tracing::warn!(error = %err, "AI group suggestion failed, using defaults");
            GroupSuggestions::default()
        }
    }
}
