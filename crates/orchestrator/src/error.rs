use plate_job_store::JobStoreError;
use plate_session_store::SessionStoreError;
use plate_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("submission failed validation")]
    Validation,
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error(transparent)]
    JobStore(#[from] JobStoreError),
    #[error(transparent)]
    SessionStore(#[from] SessionStoreError),
}

impl OrchestratorError {
    /// Mirrors the submission error taxonomy: `INVALID_ARGUMENT`,
    /// `UNAUTHENTICATED`, `UNAVAILABLE`, mapped onto the shared `ErrorKind`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::Validation => ErrorKind::Validation,
            OrchestratorError::SessionNotFound(_) => ErrorKind::AuthMismatch,
            OrchestratorError::JobStore(e) => e.kind(),
            OrchestratorError::SessionStore(e) => e.kind(),
        }
    }
}
