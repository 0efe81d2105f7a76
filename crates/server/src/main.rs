//! `plate-server`: the runnable composition root over every other crate in
//! the workspace. Concrete LLM, places-provider, and deep-link-resolver
//! backends are deliberately out of scope — the stubs below
//! are the seam a deployer replaces with real API clients; they make the
//! binary runnable end-to-end without fabricating a vendor integration.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use plate_cache::InMemoryCache;
use plate_enrichment::{DeepLinkResolver, EnrichmentConfig, EnrichmentQueue, ResolverError};
use plate_idempotency::IdempotencyRegistry;
use plate_job_store::InMemoryJobStore;
use plate_llm::{CompletionBackend, LlmError, LlmGateway};
use plate_orchestrator::{Config, Orchestrator};
use plate_pipeline::{Candidate, Pipeline, PipelineTimeouts, PlacesProvider, ProviderError, RoutePlan};
use plate_pubsub::{Publisher, SubscriptionManager};
use plate_server::{build_router, AppState, TransportConfig};
use plate_session_store::InMemorySessionStore;
use plate_types::UserLocation;

#[derive(Parser, Debug)]
#[command(name = "plate-server")]
#[command(about = "Conversational search job runtime: HTTP + WebSocket server")]
struct Args {
    /// Address to bind the HTTP/WebSocket listener on.
    #[arg(long, env = "PLATE_BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: SocketAddr,

    /// Comma-separated origin allow-list. `*` permits any origin.
    #[arg(long, env = "PLATE_ALLOWED_ORIGINS", default_value = "*")]
    allowed_origins: String,

    /// Require an authenticated session for subscribe.
    #[arg(long, env = "PLATE_AUTH_REQUIRED")]
    auth_required: bool,

    /// Disable the narrator stage (feature flag).
    #[arg(long, env = "PLATE_NARRATOR_DISABLED")]
    narrator_disabled: bool,

    /// Disable provider enrichment fan-out (feature flag).
    #[arg(long, env = "PLATE_ENRICHMENT_DISABLED")]
    enrichment_disabled: bool,

    #[arg(long, env = "PLATE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

struct NotConfiguredLlm;

#[async_trait]
impl CompletionBackend for NotConfiguredLlm {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Permanent("no LLM backend configured".to_string()))
    }

    async fn complete_stream(&self, _system_prompt: &str, _user_prompt: &str, _tx: mpsc::Sender<String>) -> Result<(), LlmError> {
        Err(LlmError::Permanent("no LLM backend configured".to_string()))
    }
}

struct NotConfiguredProvider;

#[async_trait]
impl PlacesProvider for NotConfiguredProvider {
    async fn search(&self, _query: &str, _plan: RoutePlan, _user_location: Option<UserLocation>) -> Result<Vec<Candidate>, ProviderError> {
        Err(ProviderError::Permanent("no places provider configured".to_string()))
    }
}

struct NotConfiguredResolver;

#[async_trait]
impl DeepLinkResolver for NotConfiguredResolver {
    async fn resolve(&self, _provider: &str, _place_id: &str, _name: &str, _city_text: Option<&str>) -> Result<String, ResolverError> {
        Err(ResolverError::Permanent("no deep-link resolver configured".to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(&args.log_level)).init();

    let config = Config {
        auth_required: args.auth_required,
        allowed_origins: args.allowed_origins.split(',').map(str::trim).map(String::from).collect(),
        narrator_enabled: !args.narrator_disabled,
        enrichment_enabled: !args.enrichment_disabled,
        ..Config::default()
    };

    let job_store: Arc<dyn plate_job_store::JobStore> = Arc::new(InMemoryJobStore::new());
    let session_store: Arc<dyn plate_session_store::SessionStore> = Arc::new(InMemorySessionStore::new(config.session_ttl));
    let idempotency = Arc::new(IdempotencyRegistry::new());
    let subscription_manager = Arc::new(SubscriptionManager::new(job_store.clone()));
    let publisher = Publisher::new(subscription_manager.clone());

    let llm = LlmGateway::new(Arc::new(NotConfiguredLlm), config.pipeline_timeouts.narrator);
    let pipeline_cache: Arc<dyn plate_cache::Cache> = Arc::new(InMemoryCache::new());
    let pipeline = Arc::new(
        Pipeline::new(llm, Arc::new(NotConfiguredProvider), pipeline_cache, config.pipeline_timeouts).with_result_cache_ttl(config.result_cache_ttl),
    );

    let enrichment_cache: Arc<dyn plate_cache::Cache> = Arc::new(InMemoryCache::new());
    let enrichment_queue = Arc::new(EnrichmentQueue::new(
        enrichment_cache,
        Arc::new(NotConfiguredResolver),
        publisher.clone(),
        EnrichmentConfig { job_timeout: config.enrichment.job_timeout, search_timeout: config.enrichment.search_timeout, ..EnrichmentConfig::default() },
    ));

    let orchestrator = Orchestrator::new(job_store, session_store, idempotency, subscription_manager, publisher, pipeline, enrichment_queue, config.clone());

    let state = AppState {
        orchestrator,
        transport: TransportConfig {
            allowed_origins: config.allowed_origins.clone(),
            heartbeat_interval: config.heartbeat_interval,
            idle_timeout: config.idle_timeout,
        },
    };

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(args.bind_addr).await?;
    info!(addr = %args.bind_addr, "plate-server listening");

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown_signal.cancel();
    });

    axum::serve(listener, router).with_graceful_shutdown(async move { shutdown.cancelled().await }).await?;

    Ok(())
}
