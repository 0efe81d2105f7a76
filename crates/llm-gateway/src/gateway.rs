use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::backend::CompletionBackend;
use crate::error::LlmError;

/// Retry backoff window: a single retry after a jittered 50-150ms
/// delay, applied only to failures classified as retryable.
const RETRY_BACKOFF_MIN_MS: u64 = 50;
const RETRY_BACKOFF_MAX_MS: u64 = 150;

/// Bounded-timeout JSON/text completion gateway: a thin wrapper around an
/// outbound client with `#[instrument(skip_all)]` calls and typed error
/// mapping, built around an injectable [`CompletionBackend`] so the
/// concrete LLM API is swappable.
#[derive(Clone)]
pub struct LlmGateway {
    backend: Arc<dyn CompletionBackend>,
    deadline: Duration,
}

impl LlmGateway {
    pub fn new(backend: Arc<dyn CompletionBackend>, deadline: Duration) -> Self {
        Self { backend, deadline }
    }

    /// Free-form text completion, subject to the gateway's deadline,
    /// cancellation, and retry policy.
    #[instrument(skip_all)]
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        self.call_with_retry(system_prompt, user_prompt, cancel).await
    }

    /// Schema-validated JSON completion. Parse and semantic-validation
    /// failures are classified as `LlmError::Schema` and are never retried,
    /// even though the underlying text call may itself have been retried.
    #[instrument(skip_all)]
    pub async fn complete_json<T, F>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        cancel: &CancellationToken,
        validate: F,
    ) -> Result<T, LlmError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Result<(), String>,
    {
        let raw = self.call_with_retry(system_prompt, user_prompt, cancel).await?;
        let parsed: T = serde_json::from_str(&raw).map_err(|e| {
            warn!(%e, "llm completion failed schema parse");
            LlmError::Schema(e.to_string())
        })?;
        validate(&parsed).map_err(LlmError::Schema)?;
        Ok(parsed)
    }

    /// Incremental completion. Spawns the backend call in the background
    /// and returns immediately with the receiving half; the caller drains
    /// chunks as they arrive. Not retried: a partially-streamed response
    /// cannot be safely replayed to a subscriber that has already seen
    /// some of it.
    #[instrument(skip_all)]
    pub fn complete_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(32);
        let backend = self.backend.clone();
        let system_prompt = system_prompt.to_string();
        let user_prompt = user_prompt.to_string();
        let deadline = self.deadline;

        tokio::spawn(async move {
            let call = backend.complete_stream(&system_prompt, &user_prompt, tx);
            tokio::select! {
                result = tokio::time::timeout(deadline, call) => {
                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => warn!(error = %e, "llm stream backend failure"),
                        Err(_) => warn!("llm stream exceeded deadline"),
                    }
                }
                () = cancel.cancelled() => {}
            }
        });

        rx
    }

    async fn call_with_retry(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        match self.call_once(system_prompt, user_prompt, cancel).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind().is_retryable() => {
                let backoff = rand::thread_rng().gen_range(RETRY_BACKOFF_MIN_MS..=RETRY_BACKOFF_MAX_MS);
                warn!(error = %e, backoff_ms = backoff, "retrying llm completion");
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(backoff)) => {}
                    () = cancel.cancelled() => return Err(LlmError::Aborted),
                }
                self.call_once(system_prompt, user_prompt, cancel).await
            }
            Err(e) => Err(e),
        }
    }

    async fn call_once(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        tokio::select! {
            result = tokio::time::timeout(self.deadline, self.backend.complete(system_prompt, user_prompt)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(LlmError::Timeout),
                }
            }
            () = cancel.cancelled() => Err(LlmError::Aborted),
        }
    }
}
