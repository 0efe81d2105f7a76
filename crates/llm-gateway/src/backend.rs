use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::LlmError;

/// The swappable seam to a concrete LLM API. Out of scope for this crate:
/// implementors own auth, model selection, and wire format. The gateway
/// only ever sees `Result<String, LlmError>`.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// One-shot completion. Implementations should classify their own
    /// failures into `LlmError::{Transient,Permanent}`; the gateway adds
    /// timeout and cancellation on top.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;

    /// Incremental completion. Chunks are pushed to `tx` as they arrive;
    /// the backend should stop pushing (and may drop `tx`) once the
    /// receiver is gone.
    async fn complete_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tx: mpsc::Sender<String>,
    ) -> Result<(), LlmError>;
}
