use std::time::Duration;

use chrono::Duration as ChronoDuration;
use plate_enrichment::EnrichmentConfig;
use plate_pipeline::PipelineTimeouts;

/// The closed configuration set for the runtime. `Config`'s *shape* is in
/// scope; loading it from a file or remote service is not — callers build
/// one by hand or from `clap` flags in the `server` binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// Reject subscribes without an authenticated identity and require a
    /// durable session store (out of scope here: the in-memory store is
    /// always used, so `auth_required` only governs whether a missing
    /// session is rejected rather than silently created).
    pub auth_required: bool,
    pub allowed_origins: Vec<String>,
    pub heartbeat_interval: Duration,
    pub idle_timeout: Duration,
    pub session_ttl: ChronoDuration,
    pub pipeline_timeouts: PipelineTimeouts,
    pub result_cache_ttl: ChronoDuration,
    pub enrichment: EnrichmentConfig,
    /// Third-party providers to fan out enrichment jobs to for every kept
    /// result.
    pub enrichment_providers: Vec<String>,
    pub narrator_enabled: bool,
    pub enrichment_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_required: false,
            allowed_origins: vec!["*".to_string()],
            heartbeat_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(15 * 60),
            session_ttl: ChronoDuration::days(7),
            pipeline_timeouts: PipelineTimeouts::default(),
            result_cache_ttl: ChronoDuration::seconds(120),
            enrichment: EnrichmentConfig::default(),
            enrichment_providers: Vec::new(),
            narrator_enabled: true,
            enrichment_enabled: true,
        }
    }
}
