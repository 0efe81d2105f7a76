//! Provider Enrichment Queue (C9): per-place background deep-link resolver
//! with cache, anti-thrash locking, bounded concurrency, and a safety
//! guard that always publishes a patch (worst case NOT_FOUND).

mod cache_entry;
mod lock;
mod queue;
mod resolver;

pub use cache_entry::CacheEntry;
pub use lock::EnrichmentLocks;
pub use queue::{EnrichmentConfig, EnrichmentJob, EnrichmentQueue};
pub use resolver::{DeepLinkResolver, ResolverError};

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use plate_cache::{Cache, InMemoryCache};
    use plate_job_store::JobStore;
    use plate_pubsub::{Identity, OutboundMessage, Publisher, SubscriberHandle, SubscriptionManager};
    use plate_types::{Channel, ProviderStatus};
    use tokio::sync::mpsc;

    use super::*;

    struct AlwaysTimesOut;
    #[async_trait]
    impl DeepLinkResolver for AlwaysTimesOut {
        async fn resolve(&self, _provider: &str, _place_id: &str, _name: &str, _city_text: Option<&str>) -> Result<String, ResolverError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    struct Succeeds;
    #[async_trait]
    impl DeepLinkResolver for Succeeds {
        async fn resolve(&self, provider: &str, place_id: &str, _name: &str, _city_text: Option<&str>) -> Result<String, ResolverError> {
            Ok(format!("https://{provider}.example/{place_id}"))
        }
    }

    struct CountedTransientThenSucceeds {
        attempts: AtomicUsize,
    }
    #[async_trait]
    impl DeepLinkResolver for CountedTransientThenSucceeds {
        async fn resolve(&self, _provider: &str, _place_id: &str, _name: &str, _city_text: Option<&str>) -> Result<String, ResolverError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ResolverError::Transient("try again".to_string()))
            } else {
                Ok("https://found.example/x".to_string())
            }
        }
    }

    async fn test_publisher() -> (Publisher, mpsc::Receiver<OutboundMessage>) {
        let job_store = Arc::new(plate_job_store::InMemoryJobStore::new());
        job_store
            .create(plate_types::NewJob {
                request_id: "req-1".to_string(),
                query: "pizza".to_string(),
                owner_user_id: None,
                owner_session_id: "s1".to_string(),
                trace_id: None,
                detected_language: None,
            })
            .await
            .unwrap();
        let manager = Arc::new(SubscriptionManager::new(job_store));
        let publisher = Publisher::new(manager.clone());
        let (tx, mut rx) = mpsc::channel(32);
        let handle = SubscriberHandle { id: "sub-1".to_string(), tx };
        let identity = Identity { user_id: None, session_id: "s1".to_string() };
        manager.subscribe(Channel::Provider, "req-1", handle, identity).await;
        let _ack = rx.recv().await.unwrap();
        (publisher, rx)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cache_hit_publishes_without_calling_resolver() {
        let cache = Arc::new(InMemoryCache::new());
        cache
            .set(
                &CacheEntry::cache_key("google", "p1"),
                serde_json::to_value(CacheEntry::found("https://cached.example".to_string(), chrono::Utc::now(), None)).unwrap(),
                chrono::Duration::days(1),
            )
            .await;
        let (publisher, mut rx) = test_publisher().await;
        let queue = Arc::new(EnrichmentQueue::new(cache, Arc::new(AlwaysTimesOut), publisher, EnrichmentConfig::default()));
        queue.enqueue(EnrichmentJob { request_id: "req-1".to_string(), provider: "google".to_string(), place_id: "p1".to_string(), name: "Joe's".to_string(), city_text: None });

        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        match msg {
            OutboundMessage::Event(plate_types::AppEvent::ResultPatch { status, url, .. }) => {
                assert_eq!(status, ProviderStatus::Found);
                assert_eq!(url.as_deref(), Some("https://cached.example"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn timeout_yields_not_found_with_no_url_and_releases_lock() {
        let cache = Arc::new(InMemoryCache::new());
        let (publisher, mut rx) = test_publisher().await;
        let mut config = EnrichmentConfig::default();
        config.job_timeout = Duration::from_millis(50);
        config.search_timeout = Duration::from_millis(20);
        let queue = Arc::new(EnrichmentQueue::new(cache, Arc::new(AlwaysTimesOut), publisher, config));
        queue.enqueue(EnrichmentJob { request_id: "req-1".to_string(), provider: "google".to_string(), place_id: "p1".to_string(), name: "Joe's".to_string(), city_text: None });

        let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        match msg {
            OutboundMessage::Event(plate_types::AppEvent::ResultPatch { status, url, .. }) => {
                assert_eq!(status, ProviderStatus::NotFound);
                assert_eq!(url, None);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(queue.locks.try_acquire("google", "p1", chrono::Duration::seconds(1)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_enqueue_for_same_provider_and_place_is_ignored() {
        let cache = Arc::new(InMemoryCache::new());
        let (publisher, _rx) = test_publisher().await;
        let queue = Arc::new(EnrichmentQueue::new(cache, Arc::new(Succeeds), publisher, EnrichmentConfig::default()));
        let job = EnrichmentJob { request_id: "req-1".to_string(), provider: "google".to_string(), place_id: "p1".to_string(), name: "Joe's".to_string(), city_text: None };
        assert!(queue.enqueue(job.clone()));
        assert!(!queue.enqueue(job));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transient_failures_are_retried_until_success() {
        let cache = Arc::new(InMemoryCache::new());
        let (publisher, mut rx) = test_publisher().await;
        let resolver = Arc::new(CountedTransientThenSucceeds { attempts: AtomicUsize::new(0) });
        let mut config = EnrichmentConfig::default();
        config.search_timeout = Duration::from_millis(200);
        let queue = Arc::new(EnrichmentQueue::new(cache, resolver.clone(), publisher, config));
        queue.enqueue(EnrichmentJob { request_id: "req-1".to_string(), provider: "google".to_string(), place_id: "p1".to_string(), name: "Joe's".to_string(), city_text: None });

        let msg = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap();
        match msg {
            OutboundMessage::Event(plate_types::AppEvent::ResultPatch { status, url, .. }) => {
                assert_eq!(status, ProviderStatus::Found);
                assert!(url.is_some());
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert_eq!(resolver.attempts.load(Ordering::SeqCst), 3);
    }
}
