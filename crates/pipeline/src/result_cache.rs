use plate_types::{Filters, UserLocation};
use serde::{Deserialize, Serialize};

use crate::types::RankedResult;

/// Cache key for a completed pipeline run: normalized query + location
/// bucket + filters, deliberately session-agnostic (two different users
/// asking the same question near the same place should share a hit).
pub fn cache_key(query: &str, location: Option<UserLocation>, filters: &Filters) -> String {
    let normalized = query.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    let location_bucket = match location {
        None => "no-location".to_string(),
        Some(loc) => format!("{:.4},{:.4}", loc.lat, loc.lng),
    };
    let mut dietary = filters.dietary.clone();
    dietary.sort();
    let mut must_have = filters.must_have.clone();
    must_have.sort();
    format!(
        "pipeline-result:{normalized}|{location_bucket}|open_now={};price_level={};dietary={};must_have={}",
        filters.open_now.map(|b| b.to_string()).unwrap_or_default(),
        filters.price_level.map(|p| p.to_string()).unwrap_or_default(),
        dietary.join(","),
        must_have.join(","),
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResult {
    pub ranked: Vec<RankedResult>,
    pub dropped_count: usize,
}
