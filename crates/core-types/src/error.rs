use std::fmt;

/// The closed taxonomy of error kinds every component surfaces.
///
/// Every crate's error enum exposes a `kind()` accessor that maps into this
/// set, so callers at any layer (pipeline, orchestrator, transport) can
/// decide retry/fallback/surface behavior without matching on concrete
/// error types from crates they don't otherwise depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Input schema violation.
    Validation,
    /// Subscribe ownership check failed.
    AuthMismatch,
    /// Job or resource absent.
    NotFound,
    /// Stage or job exceeded its deadline.
    Timeout,
    /// Retry-eligible network/5xx/reset.
    Transient,
    /// 4xx non-retriable, or invalid upstream data.
    Permanent,
    /// A required external store is unavailable.
    DependencyDown,
    /// Unclassified.
    Internal,
}

impl ErrorKind {
    /// Whether a caller should retry an operation that failed with this kind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::AuthMismatch => "AUTH_MISMATCH",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Transient => "TRANSIENT",
            ErrorKind::Permanent => "PERMANENT",
            ErrorKind::DependencyDown => "DEPENDENCY_DOWN",
            ErrorKind::Internal => "INTERNAL",
        };
        f.write_str(s)
    }
}

/// The `{code, message, kind}` error object carried by a terminal job
/// payload or surfaced to a submission caller.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
    pub kind: ErrorKind,
}

impl ErrorObject {
    pub fn new(code: impl Into<String>, message: impl Into<String>, kind: ErrorKind) -> Self {
        Self { code: code.into(), message: message.into(), kind }
    }
}
