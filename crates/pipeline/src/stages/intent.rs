use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use plate_llm::LlmGateway;

use crate::types::{GateOutput, IntentLite};

const PROMPT_VERSION: &str = "intent-lite.v1";

/// Intent-Lite stage: extracts canonical food term, location text, and
/// virtual filters. Falls back to a minimal safe intent on LLM failure.
#[instrument(skip(llm, cancel))]
pub async fn run(
    llm: &LlmGateway,
    query: &str,
    gate: &GateOutput,
    deadline: Duration,
    cancel: &CancellationToken,
) -> IntentLite {
    let system = format!("intent-lite extractor ({PROMPT_VERSION})");
    let user = json!({ "query": query, "language": gate.language }).to_string();

    let call = llm.complete_json::<IntentLite, _>(&system, &user, cancel, |out: &IntentLite| {
        if !(0.0..=1.0).contains(&out.confidence) {
            return Err("confidence out of range".to_string());
        }
        if out.food.canonical.trim().is_empty() {
            return Err("food.canonical must not be empty".to_string());
        }
        Ok(())
    });

    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(error = %e, "intent-lite stage falling back after llm failure");
            IntentLite::fallback()
        }
        Err(_) => {
            warn!("intent-lite stage exceeded its deadline");
            IntentLite::fallback()
        }
    }
}
