//! LLM Gateway (C7): bounded-timeout, cancellation-aware completion calls
//! with a single jittered retry on transient failure.

mod backend;
mod error;
mod gateway;

pub use backend::CompletionBackend;
pub use error::{LlmError, LlmErrorKind};
pub use gateway::LlmGateway;
