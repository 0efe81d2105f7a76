use chrono::{DateTime, Utc};
use plate_types::ProviderStatus;
use serde::{Deserialize, Serialize};

/// Provider-enrichment cache entry, keyed by `(provider,
/// placeId)` by the caller. Invariant: a NOT_FOUND entry never carries a
/// url; enforced at construction, not just by convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub status: ProviderStatus,
    pub url: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl CacheEntry {
    pub fn found(url: String, updated_at: DateTime<Utc>, meta: Option<serde_json::Value>) -> Self {
        Self { status: ProviderStatus::Found, url: Some(url), updated_at, meta }
    }

    pub fn not_found(updated_at: DateTime<Utc>) -> Self {
        Self { status: ProviderStatus::NotFound, url: None, updated_at, meta: None }
    }

    pub fn cache_key(provider: &str, place_id: &str) -> String {
        format!("enrichment:{provider}:{place_id}")
    }
}
