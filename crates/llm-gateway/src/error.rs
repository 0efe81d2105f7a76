use plate_types::ErrorKind;
use thiserror::Error;

/// Finer-grained failure classification than the core `ErrorKind`:
/// distinguishes ABORTED and SCHEMA from plain TIMEOUT/TRANSIENT so the
/// pipeline can decide fallback vs. retry vs. surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    Timeout,
    Aborted,
    Schema,
    Transient,
    Permanent,
}

impl LlmErrorKind {
    /// Retry policy: transient failures (timeout/abort/5xx/
    /// connection reset) are retried once; schema-validation failures never
    /// are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmErrorKind::Timeout | LlmErrorKind::Aborted | LlmErrorKind::Transient)
    }

    pub fn to_core(self) -> ErrorKind {
        match self {
            LlmErrorKind::Timeout => ErrorKind::Timeout,
            LlmErrorKind::Aborted => ErrorKind::Internal,
            LlmErrorKind::Schema => ErrorKind::Internal,
            LlmErrorKind::Transient => ErrorKind::Transient,
            LlmErrorKind::Permanent => ErrorKind::Permanent,
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm call exceeded its deadline")]
    Timeout,
    #[error("llm call aborted by cancellation token")]
    Aborted,
    #[error("llm output failed schema validation: {0}")]
    Schema(String),
    #[error("transient llm backend failure: {0}")]
    Transient(String),
    #[error("permanent llm backend failure: {0}")]
    Permanent(String),
}

impl LlmError {
    pub fn kind(&self) -> LlmErrorKind {
        match self {
            LlmError::Timeout => LlmErrorKind::Timeout,
            LlmError::Aborted => LlmErrorKind::Aborted,
            LlmError::Schema(_) => LlmErrorKind::Schema,
            LlmError::Transient(_) => LlmErrorKind::Transient,
            LlmError::Permanent(_) => LlmErrorKind::Permanent,
        }
    }
}
