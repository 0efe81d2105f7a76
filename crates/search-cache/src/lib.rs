//! Cache (C3): an opaque, read-many/write-last-writer-wins TTL key-value
//! store. Used by the Pipeline for request-fingerprint results and, with a
//! distinct instance, by the Provider Enrichment Queue for resolved deep
//! links. A Redis-backed implementation is the out-of-scope seam this trait
//! exists for.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

#[async_trait]
pub trait Cache: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Option<serde_json::Value>;
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration);
}

struct Entry {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let now = Utc::now();
        let hit = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => None,
            None => return None,
        };
        if hit.is_none() {
            self.entries.remove(key);
        }
        hit
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        self.entries.insert(key.to_string(), Entry { value, expires_at: Utc::now() + ttl });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryCache::new();
        cache.set("k", serde_json::json!({"v": 1}), Duration::seconds(60)).await;
        assert_eq!(cache.get("k").await, Some(serde_json::json!({"v": 1})));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_none() {
        let cache = InMemoryCache::new();
        cache.set("k", serde_json::json!(1), Duration::milliseconds(1)).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn last_writer_wins() {
        let cache = InMemoryCache::new();
        cache.set("k", serde_json::json!(1), Duration::seconds(60)).await;
        cache.set("k", serde_json::json!(2), Duration::seconds(60)).await;
        assert_eq!(cache.get("k").await, Some(serde_json::json!(2)));
    }
}
