use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use plate_cache::Cache;
use plate_llm::LlmGateway;
use plate_types::{AssistantPayload, ErrorKind, ErrorObject, Filters, UserLocation};

use crate::config::PipelineTimeouts;
use crate::near_me::matches_near_me;
use crate::provider::PlacesProvider;
use crate::ranker;
use crate::result_cache::{self, CachedResult};
use crate::stages::{execute, gate, intent, narrator, post_filter, route, score};
use crate::types::{ClarifyReason, GateOutput, NarratorContext, RankedResult};

/// Default TTL for a cached pipeline result. Short-lived: long
/// enough to absorb a burst of near-duplicate queries, short enough that
/// place open/closed state and ratings don't go stale.
const DEFAULT_RESULT_CACHE_TTL_SECONDS: i64 = 120;

/// Pipeline state machine outcome: `NEW -> GATE -> (STOP|CLARIFY|
/// CONTINUE) -> INTENT -> ROUTE -> EXECUTE -> SCORE -> POSTFILTER ->
/// SUMMARIZE -> DONE`.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Stopped { assistant: AssistantPayload },
    Clarify { assistant: AssistantPayload },
    Done { results: Vec<RankedResult>, assistant: AssistantPayload, dropped_count: usize },
    Failed { error: ErrorObject },
}

/// Progress boundaries published to the job/subscribers at each stage
/// transition. Not part of the public contract; values are monotone.
pub mod progress {
    pub const GATE: u8 = 10;
    pub const INTENT: u8 = 25;
    pub const ROUTE: u8 = 35;
    pub const EXECUTE: u8 = 55;
    pub const SCORE: u8 = 70;
    pub const POSTFILTER: u8 = 80;
    pub const DONE: u8 = 100;
}

pub struct Pipeline {
    llm: LlmGateway,
    provider: Arc<dyn PlacesProvider>,
    cache: Arc<dyn Cache>,
    timeouts: PipelineTimeouts,
    result_cache_ttl: ChronoDuration,
}

impl Pipeline {
    pub fn new(llm: LlmGateway, provider: Arc<dyn PlacesProvider>, cache: Arc<dyn Cache>, timeouts: PipelineTimeouts) -> Self {
        Self { llm, provider, cache, timeouts, result_cache_ttl: ChronoDuration::seconds(DEFAULT_RESULT_CACHE_TTL_SECONDS) }
    }

    pub fn with_result_cache_ttl(mut self, ttl: ChronoDuration) -> Self {
        self.result_cache_ttl = ttl;
        self
    }

    /// Drives one request through every stage, invoking `on_progress` at
    /// each boundary. `on_progress` failing to keep up is the caller's
    /// concern (publishing is non-blocking); this method never awaits on it.
    #[instrument(skip(self, on_progress, cancel))]
    pub async fn run(
        &self,
        query: &str,
        user_location: Option<UserLocation>,
        filters: Filters,
        cancel: &CancellationToken,
        on_progress: impl Fn(u8),
    ) -> PipelineOutcome {
        let cache_key = result_cache::cache_key(query, user_location, &filters);
        if let Some(cached) = self.cache.get(&cache_key).await {
            if let Ok(cached) = serde_json::from_value::<CachedResult>(cached) {
                let assistant = narrator::run(
                    &self.llm,
                    &NarratorContext::Summary { result_count: cached.ranked.len(), language: "en".to_string() },
                    self.timeouts.narrator,
                    cancel,
                )
                .await;
                on_progress(progress::DONE);
                return PipelineOutcome::Done { results: cached.ranked, assistant, dropped_count: cached.dropped_count };
            }
        }

        let gate_output = gate::run(&self.llm, query, self.timeouts.gate, cancel).await;
        on_progress(progress::GATE);

        if let Some(outcome) = self.check_gate(&gate_output, cancel).await {
            return outcome;
        }

        if matches_near_me(query) && user_location.is_none() {
            let assistant = narrator::run(
                &self.llm,
                &NarratorContext::Clarify { reason: ClarifyReason::MissingLocation, language: gate_output.language.clone() },
                self.timeouts.narrator,
                cancel,
            )
            .await;
            return PipelineOutcome::Clarify { assistant };
        }

        let intent_lite = intent::run(&self.llm, query, &gate_output, self.timeouts.intent_lite, cancel).await;
        on_progress(progress::INTENT);

        let plan = route::run(&intent_lite, user_location);
        on_progress(progress::ROUTE);

        let candidates = match execute::run(&self.provider, query, plan, user_location, self.timeouts.execute, cancel).await {
            Ok(candidates) => candidates,
            Err(e) => {
                return PipelineOutcome::Failed {
                    error: ErrorObject::new("EXECUTE_FAILED", e.to_string(), ErrorKind::Transient),
                };
            }
        };
        on_progress(progress::EXECUTE);

        let terms = vec![intent_lite.food.canonical.clone()];
        let scores = score::run(&self.llm, &terms, &candidates, self.timeouts.cuisine, cancel).await;
        on_progress(progress::SCORE);

        let post_filtered = post_filter::run(candidates, &filters);
        on_progress(progress::POSTFILTER);

        let ranked = ranker::rank(post_filtered.kept, &scores);

        let assistant = narrator::run(
            &self.llm,
            &NarratorContext::Summary { result_count: ranked.len(), language: gate_output.language.clone() },
            self.timeouts.narrator,
            cancel,
        )
        .await;
        on_progress(progress::DONE);

        let cached = CachedResult { ranked: ranked.clone(), dropped_count: post_filtered.dropped_count };
        if let Ok(value) = serde_json::to_value(&cached) {
            self.cache.set(&cache_key, value, self.result_cache_ttl).await;
        }

        PipelineOutcome::Done { results: ranked, assistant, dropped_count: post_filtered.dropped_count }
    }

    async fn check_gate(&self, gate_output: &GateOutput, cancel: &CancellationToken) -> Option<PipelineOutcome> {
        use crate::types::FoodSignal;

        if gate_output.stop.is_some() || gate_output.food_signal == FoodSignal::No {
            let assistant = narrator::run(
                &self.llm,
                &NarratorContext::GateFail {
                    reason: gate_output.stop.as_ref().map(|s| s.reason.clone()).unwrap_or_else(|| "not_food".to_string()),
                    language: gate_output.language.clone(),
                },
                self.timeouts.narrator,
                cancel,
            )
            .await;
            return Some(PipelineOutcome::Stopped { assistant });
        }
        None
    }
}
