use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tracing::{instrument, warn};

use plate_cache::Cache;
use plate_pubsub::Publisher;

use crate::cache_entry::CacheEntry;
use crate::lock::EnrichmentLocks;
use crate::resolver::{DeepLinkResolver, ResolverError};

/// `(requestId, placeId, name, cityText?)`, enqueued once per kept result
/// per configured provider.
#[derive(Debug, Clone)]
pub struct EnrichmentJob {
    pub request_id: String,
    pub provider: String,
    pub place_id: String,
    pub name: String,
    pub city_text: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct EnrichmentConfig {
    pub search_timeout: StdDuration,
    pub job_timeout: StdDuration,
    pub found_ttl: ChronoDuration,
    pub not_found_ttl: ChronoDuration,
    pub lock_ttl: ChronoDuration,
    pub max_concurrency_per_provider: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            search_timeout: StdDuration::from_secs(20),
            job_timeout: StdDuration::from_secs(30),
            found_ttl: ChronoDuration::days(7),
            not_found_ttl: ChronoDuration::hours(24),
            lock_ttl: ChronoDuration::seconds(60),
            max_concurrency_per_provider: 4,
        }
    }
}

/// Exponential retry backoff. The backoff sequence itself (1s, 2s,
/// 4s) is taken as authoritative over the prose's "up to two retries",
/// giving three retries after the first attempt.
const RETRY_BACKOFFS: [StdDuration; 3] = [StdDuration::from_secs(1), StdDuration::from_secs(2), StdDuration::from_secs(4)];

/// Worker pool over per-place enrichment jobs: a task-spawn-per-unit-of-work
/// style with a job-queue/lock/retry shape. Bounded concurrency is per
/// provider via a `Semaphore`.
pub struct EnrichmentQueue {
    cache: Arc<dyn Cache>,
    pub(crate) locks: Arc<EnrichmentLocks>,
    resolver: Arc<dyn DeepLinkResolver>,
    publisher: Publisher,
    config: EnrichmentConfig,
    queued: DashMap<(String, String), ()>,
    semaphores: DashMap<String, Arc<Semaphore>>,
}

impl EnrichmentQueue {
    pub fn new(cache: Arc<dyn Cache>, resolver: Arc<dyn DeepLinkResolver>, publisher: Publisher, config: EnrichmentConfig) -> Self {
        Self { cache, locks: Arc::new(EnrichmentLocks::new()), resolver, publisher, config, queued: DashMap::new(), semaphores: DashMap::new() }
    }

    fn semaphore_for(&self, provider: &str) -> Arc<Semaphore> {
        self.semaphores
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.max_concurrency_per_provider)))
            .clone()
    }

    /// In-process dedup: refuses to enqueue a second job for a placeId
    /// already queued for that provider.
    #[instrument(skip(self))]
    pub fn enqueue(self: &Arc<Self>, job: EnrichmentJob) -> bool {
        let key = (job.provider.clone(), job.place_id.clone());
        if self.queued.insert(key.clone(), ()).is_some() {
            return false;
        }

        let this = self.clone();
        let semaphore = self.semaphore_for(&job.provider);
        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;

            // `run_job` is itself spawned so a panic inside it (e.g. a
            // resolver bug) is caught here as a `JoinError` instead of
            // silently skipping the lock release and patch publish that
            // follow it in the non-panicking path.
            let guard_this = this.clone();
            let guard_job = job.clone();
            if tokio::spawn(async move { guard_this.run_job(&guard_job).await }).await.is_err() {
                warn!(provider = %job.provider, place_id = %job.place_id, "enrichment job panicked; publishing NOT_FOUND so subscribers do not stay pending");
                this.locks.release(&job.provider, &job.place_id);
                this.publish(&job, &CacheEntry::not_found(Utc::now()));
            }
            this.queued.remove(&key);
        });
        true
    }

    async fn run_job(&self, job: &EnrichmentJob) {
        let cache_key = CacheEntry::cache_key(&job.provider, &job.place_id);

        if let Some(cached) = self.cache.get(&cache_key).await {
            if let Ok(entry) = serde_json::from_value::<CacheEntry>(cached) {
                self.publish(job, &entry);
                return;
            }
        }

        if !self.locks.try_acquire(&job.provider, &job.place_id, self.config.lock_ttl) {
            return;
        }

        let entry = match tokio::time::timeout(self.config.job_timeout, self.resolve_with_retry(job)).await {
            Ok(Ok(url)) => CacheEntry::found(url, Utc::now(), None),
            Ok(Err(e)) => {
                warn!(provider = %job.provider, place_id = %job.place_id, error = %e, "enrichment resolution failed permanently");
                CacheEntry::not_found(Utc::now())
            }
            Err(_) => {
                warn!(provider = %job.provider, place_id = %job.place_id, "enrichment job exceeded its overall deadline");
                CacheEntry::not_found(Utc::now())
            }
        };

        let ttl = if entry.status == plate_types::ProviderStatus::Found { self.config.found_ttl } else { self.config.not_found_ttl };
        self.cache.set(&cache_key, serde_json::to_value(&entry).expect("CacheEntry is always serializable"), ttl).await;
        self.publish(job, &entry);
        self.locks.release(&job.provider, &job.place_id);
    }

    async fn resolve_with_retry(&self, job: &EnrichmentJob) -> Result<String, ResolverError> {
        let mut last_err = None;
        for (attempt, backoff) in std::iter::once(None).chain(RETRY_BACKOFFS.into_iter().map(Some)).enumerate() {
            if let Some(delay) = backoff {
                tokio::time::sleep(delay).await;
            }
            match tokio::time::timeout(self.config.search_timeout, self.resolver.resolve(&job.provider, &job.place_id, &job.name, job.city_text.as_deref())).await {
                Ok(Ok(url)) => return Ok(url),
                Ok(Err(ResolverError::Permanent(msg))) => return Err(ResolverError::Permanent(msg)),
                Ok(Err(e @ ResolverError::Transient(_))) => {
                    last_err = Some(e);
                }
                Err(_) => {
                    last_err = Some(ResolverError::Transient(format!("search timed out on attempt {attempt}")));
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ResolverError::Transient("exhausted retries".to_string())))
    }

    fn publish(&self, job: &EnrichmentJob, entry: &CacheEntry) {
        self.publisher.publish_provider_patch(
            job.provider.clone(),
            job.place_id.clone(),
            job.request_id.clone(),
            entry.status,
            entry.url.clone(),
            entry.updated_at,
            entry.meta.clone(),
        );
    }
}
