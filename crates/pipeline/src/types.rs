use serde::{Deserialize, Serialize};

/// Gate stage output: `{foodSignal, language, confidence, stop?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateOutput {
    pub food_signal: FoodSignal,
    pub language: String,
    pub confidence: f64,
    #[serde(default)]
    pub stop: Option<StopPayload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FoodSignal {
    No,
    Uncertain,
    Yes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StopPayload {
    pub reason: String,
}

impl GateOutput {
    /// LLM-failure fallback: STOP with foodSignal=NO at confidence 0.1.
    pub fn fallback(language: &str) -> Self {
        Self {
            food_signal: FoodSignal::No,
            language: language.to_string(),
            confidence: 0.1,
            stop: Some(StopPayload { reason: "gate_unavailable".to_string() }),
        }
    }
}

/// Intent-Lite stage output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntentLite {
    pub food: FoodIntent,
    pub location: LocationIntent,
    #[serde(default)]
    pub radius_meters: Option<u32>,
    pub target_type: TargetType,
    pub confidence: f64,
    #[serde(default)]
    pub virtual_filters: VirtualFilters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FoodIntent {
    pub canonical: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationIntent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_relative: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Exact,
    Coords,
    Free,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VirtualFilters {
    #[serde(default)]
    pub kosher: Option<bool>,
    #[serde(default)]
    pub vegan: Option<bool>,
    #[serde(default)]
    pub gluten_free: Option<bool>,
    #[serde(default)]
    pub open_now: Option<bool>,
}

impl IntentLite {
    /// LLM-failure fallback: minimal safe intent (`restaurant`, not relative,
    /// FREE, confidence 0.1).
    pub fn fallback() -> Self {
        Self {
            food: FoodIntent { canonical: "restaurant".to_string() },
            location: LocationIntent { text: None, is_relative: false },
            radius_meters: None,
            target_type: TargetType::Free,
            confidence: 0.1,
            virtual_filters: VirtualFilters::default(),
        }
    }
}

/// Route-Map stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub mode: RouteMode,
    pub radius: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMode {
    Nearbysearch,
    Textsearch,
}

pub const DEFAULT_RADIUS_METERS: u32 = 2000;

/// A candidate place as returned by the places provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub city_text: Option<String>,
    #[serde(default)]
    pub cuisine_terms: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
    #[serde(default)]
    pub open_now: Option<bool>,
    #[serde(default)]
    pub price_level: Option<u8>,
    #[serde(default)]
    pub dietary: Vec<String>,
    #[serde(default)]
    pub accessible: Option<bool>,
}

/// Post-Filter stage output.
#[derive(Debug, Clone)]
pub struct PostFilterOutput {
    pub kept: Vec<Candidate>,
    pub dropped_count: usize,
}

/// Final ranked result, after cuisine scoring and the ranker's weighting of
/// score/rating/distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub place_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_text: Option<String>,
    pub cuisine_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

/// Narrator stage contexts (one of GATE_FAIL, CLARIFY, SUMMARY).
#[derive(Debug, Clone)]
pub enum NarratorContext {
    GateFail { reason: String, language: String },
    Clarify { reason: ClarifyReason, language: String },
    Summary { result_count: usize, language: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClarifyReason {
    MissingLocation,
    AmbiguousIntent,
}

impl ClarifyReason {
    pub fn suggested_action(&self) -> &'static str {
        match self {
            ClarifyReason::MissingLocation => "ASK_LOCATION",
            ClarifyReason::AmbiguousIntent => "ASK_CLARIFICATION",
        }
    }
}
