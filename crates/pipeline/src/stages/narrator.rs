use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use plate_llm::LlmGateway;
use plate_types::{AssistantPayload, NarratorType};

use crate::types::{ClarifyReason, NarratorContext};

const PROMPT_VERSION: &str = "narrator.v1";
const MAX_MESSAGE_CHARS: usize = 240;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NarratorOutput {
    message: String,
    #[serde(default)]
    question: Option<String>,
}

/// Narrator stage: produces the short assistant message shown alongside a
/// terminal result. Runs the LLM when available, but a deterministic
/// fallback table guarantees a message (and, for CLARIFY, a non-empty
/// question) even when the LLM is unavailable. Invariants are re-enforced
/// after either path, never trusted from the LLM alone.
#[instrument(skip(llm, cancel))]
pub async fn run(llm: &LlmGateway, context: &NarratorContext, deadline: Duration, cancel: &CancellationToken) -> AssistantPayload {
    let system = format!("narrator ({PROMPT_VERSION})");
    let user = json!({ "context": describe(context) }).to_string();

    let call = llm.complete_json::<NarratorOutput, _>(&system, &user, cancel, |_: &NarratorOutput| Ok(()));

    let output = match tokio::time::timeout(deadline, call).await {
        Ok(Ok(output)) => Some(output),
        Ok(Err(e)) => {
            warn!(error = %e, "narrator stage falling back after llm failure");
            None
        }
        Err(_) => {
            warn!("narrator stage exceeded its deadline");
            None
        }
    };

    enforce_invariants(context, output)
}

fn describe(context: &NarratorContext) -> serde_json::Value {
    match context {
        NarratorContext::GateFail { reason, language } => json!({ "type": "GATE_FAIL", "reason": reason, "language": language }),
        NarratorContext::Clarify { reason, language } => json!({ "type": "CLARIFY", "reason": format!("{reason:?}"), "language": language }),
        NarratorContext::Summary { result_count, language } => json!({ "type": "SUMMARY", "resultCount": result_count, "language": language }),
    }
}

fn enforce_invariants(context: &NarratorContext, llm_output: Option<NarratorOutput>) -> AssistantPayload {
    let (kind, fallback_message, suggested_action, blocks_search) = match context {
        NarratorContext::GateFail { .. } => {
            (NarratorType::GateFail, fallback_table(FallbackKey::GateFail), None, true)
        }
        NarratorContext::Clarify { reason, .. } => {
            let key = match reason {
                ClarifyReason::MissingLocation => FallbackKey::ClarifyMissingLocation,
                ClarifyReason::AmbiguousIntent => FallbackKey::ClarifyAmbiguousIntent,
            };
            (NarratorType::Clarify, fallback_table(key), Some(reason.suggested_action()), true)
        }
        NarratorContext::Summary { result_count, .. } => {
            let message = if *result_count == 0 { fallback_table(FallbackKey::SummaryEmpty) } else { fallback_table(FallbackKey::SummaryNonEmpty) };
            (NarratorType::Summary, message, None, false)
        }
    };

    let mut message = llm_output.as_ref().map(|o| o.message.clone()).filter(|m| !m.trim().is_empty()).unwrap_or_else(|| fallback_message.to_string());
    if message.chars().count() > MAX_MESSAGE_CHARS {
        message = message.chars().take(MAX_MESSAGE_CHARS).collect();
    }

    let question = if kind == NarratorType::Clarify {
        Some(
            llm_output
                .and_then(|o| o.question)
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(default_clarify_question),
        )
    } else {
        None
    };

    AssistantPayload {
        kind,
        message,
        question,
        blocks_search,
        suggested_action: suggested_action.map(str::to_string),
    }
}

fn default_clarify_question() -> String {
    "Which area should I search near?".to_string()
}

enum FallbackKey {
    GateFail,
    ClarifyMissingLocation,
    ClarifyAmbiguousIntent,
    SummaryEmpty,
    SummaryNonEmpty,
}

/// Deterministic fallback table keyed by (type, reason); language-specific
/// variants are an extension point left for the caller's translation layer,
/// since exact phrasing is deliberately not standardized here.
fn fallback_table(key: FallbackKey) -> &'static str {
    match key {
        FallbackKey::GateFail => "I couldn't tell if that's a food search. Try rephrasing with a dish or cuisine.",
        FallbackKey::ClarifyMissingLocation => "Which area should I search near?",
        FallbackKey::ClarifyAmbiguousIntent => "Could you say a bit more about what you're looking for?",
        FallbackKey::SummaryEmpty => "I didn't find anything matching that search.",
        FallbackKey::SummaryNonEmpty => "Here's what I found.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plate_llm::{CompletionBackend, LlmError};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct AlwaysFails;
    #[async_trait::async_trait]
    impl CompletionBackend for AlwaysFails {
        async fn complete(&self, _s: &str, _u: &str) -> Result<String, LlmError> {
            Err(LlmError::Permanent("down".into()))
        }
        async fn complete_stream(&self, _s: &str, _u: &str, _tx: mpsc::Sender<String>) -> Result<(), LlmError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn clarify_always_blocks_search_and_has_a_question() {
        let llm = LlmGateway::new(Arc::new(AlwaysFails), Duration::from_secs(1));
        let context = NarratorContext::Clarify { reason: ClarifyReason::MissingLocation, language: "en".to_string() };
        let payload = run(&llm, &context, Duration::from_secs(1), &CancellationToken::new()).await;
        assert!(payload.blocks_search);
        assert!(payload.question.is_some());
        assert_eq!(payload.suggested_action.as_deref(), Some("ASK_LOCATION"));
    }

    #[tokio::test]
    async fn non_clarify_never_carries_a_question() {
        let llm = LlmGateway::new(Arc::new(AlwaysFails), Duration::from_secs(1));
        let context = NarratorContext::Summary { result_count: 3, language: "en".to_string() };
        let payload = run(&llm, &context, Duration::from_secs(1), &CancellationToken::new()).await;
        assert!(payload.question.is_none());
        assert!(!payload.blocks_search);
    }

    #[tokio::test]
    async fn message_is_truncated_to_240_chars() {
        struct LongMessage;
        #[async_trait::async_trait]
        impl CompletionBackend for LongMessage {
            async fn complete(&self, _s: &str, _u: &str) -> Result<String, LlmError> {
                Ok(json!({ "message": "x".repeat(500), "question": null }).to_string())
            }
            async fn complete_stream(&self, _s: &str, _u: &str, _tx: mpsc::Sender<String>) -> Result<(), LlmError> {
                Ok(())
            }
        }
        let llm = LlmGateway::new(Arc::new(LongMessage), Duration::from_secs(1));
        let context = NarratorContext::Summary { result_count: 1, language: "en".to_string() };
        let payload = run(&llm, &context, Duration::from_secs(1), &CancellationToken::new()).await;
        assert!(payload.message.chars().count() <= MAX_MESSAGE_CHARS);
    }
}
