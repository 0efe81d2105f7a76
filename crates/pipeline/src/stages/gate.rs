use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use plate_llm::LlmGateway;

use crate::types::GateOutput;

const PROMPT_VERSION: &str = "gate.v1";

/// Gate stage: classifies whether the raw query is food-related at all.
/// On LLM failure, falls back to a synthetic STOP result; the
/// orchestrator is responsible for surfacing the resulting error.
#[instrument(skip(llm, cancel))]
pub async fn run(
    llm: &LlmGateway,
    query: &str,
    deadline: Duration,
    cancel: &CancellationToken,
) -> GateOutput {
    let system = format!("gate classifier ({PROMPT_VERSION})");
    let user = json!({ "query": query }).to_string();

    let call = llm.complete_json::<GateOutput, _>(&system, &user, cancel, |out: &GateOutput| {
        if !(0.0..=1.0).contains(&out.confidence) {
            return Err("confidence out of range".to_string());
        }
        Ok(())
    });

    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(error = %e, "gate stage falling back after llm failure");
            GateOutput::fallback("unknown")
        }
        Err(_) => {
            warn!("gate stage exceeded its deadline");
            GateOutput::fallback("unknown")
        }
    }
}
