use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use plate_llm::LlmGateway;

use crate::types::Candidate;

const PROMPT_VERSION: &str = "cuisine-score.v1";
const FAST_PATH_MAX_CANDIDATES: usize = 3;
const NEUTRAL_SCORE: f64 = 0.5;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScoreOutput {
    scores: HashMap<String, f64>,
}

/// Cuisine-Scoring stage: BOOST-only, never filters. Small candidate pools
/// skip the LLM call entirely; LLM failure degrades to an empty score map
/// rather than blocking the pipeline.
#[instrument(skip(llm, candidates, cancel))]
pub async fn run(
    llm: &LlmGateway,
    required_or_preferred_terms: &[String],
    candidates: &[Candidate],
    deadline: Duration,
    cancel: &CancellationToken,
) -> HashMap<String, f64> {
    if candidates.len() <= FAST_PATH_MAX_CANDIDATES {
        return candidates.iter().map(|c| (c.place_id.clone(), NEUTRAL_SCORE)).collect();
    }

    let system = format!("cuisine scorer ({PROMPT_VERSION})");
    let user = json!({
        "terms": required_or_preferred_terms,
        "candidates": candidates.iter().map(|c| json!({ "placeId": c.place_id, "cuisineTerms": c.cuisine_terms })).collect::<Vec<_>>(),
    })
    .to_string();

    let call = llm.complete_json::<ScoreOutput, _>(&system, &user, cancel, |out: &ScoreOutput| {
        if out.scores.values().any(|s| !(0.0..=1.0).contains(s)) {
            return Err("score out of range".to_string());
        }
        Ok(())
    });

    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(output)) => output.scores,
        Ok(Err(e)) => {
            warn!(error = %e, "cuisine-scoring stage returning empty scores after llm failure");
            HashMap::new()
        }
        Err(_) => {
            warn!("cuisine-scoring stage exceeded its deadline");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plate_llm::{CompletionBackend, LlmError};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct Unreachable;
    #[async_trait::async_trait]
    impl CompletionBackend for Unreachable {
        async fn complete(&self, _s: &str, _u: &str) -> Result<String, LlmError> {
            panic!("fast path must not call the llm")
        }
        async fn complete_stream(&self, _s: &str, _u: &str, _tx: mpsc::Sender<String>) -> Result<(), LlmError> {
            panic!("fast path must not call the llm")
        }
    }

    fn candidate(id: &str) -> Candidate {
        Candidate {
            place_id: id.to_string(),
            name: id.to_string(),
            city_text: None,
            cuisine_terms: vec![],
            rating: None,
            distance_meters: None,
            open_now: None,
            price_level: None,
            dietary: vec![],
            accessible: None,
        }
    }

    #[tokio::test]
    async fn fast_path_skips_llm_for_small_pools() {
        let llm = LlmGateway::new(Arc::new(Unreachable), Duration::from_secs(1));
        let candidates = vec![candidate("a"), candidate("b")];
        let scores = run(&llm, &[], &candidates, Duration::from_secs(1), &CancellationToken::new()).await;
        assert_eq!(scores.get("a"), Some(&NEUTRAL_SCORE));
        assert_eq!(scores.get("b"), Some(&NEUTRAL_SCORE));
    }
}
