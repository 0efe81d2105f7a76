//! Job Store (C1): persists job status, progress, result, error, and owner.
//!
//! A provider-trait-behind-an-abstraction style: the shipped implementation
//! is in-memory (`DashMap`), but the `JobStore` trait is the seam a
//! distributed implementation plugs into without touching any caller.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use plate_types::{ErrorKind, ErrorObject, Job, JobStatus, NewJob};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("job {0} not found")]
    NotFound(String),
    #[error("job {0} already exists")]
    AlreadyExists(String),
    #[error("illegal status transition for job {request_id}: {from:?} -> {to:?}")]
    IllegalTransition { request_id: String, from: JobStatus, to: JobStatus },
    #[error("job store backend unavailable: {0}")]
    DependencyDown(String),
}

impl JobStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobStoreError::NotFound(_) => ErrorKind::NotFound,
            JobStoreError::AlreadyExists(_) => ErrorKind::Internal,
            JobStoreError::IllegalTransition { .. } => ErrorKind::Internal,
            JobStoreError::DependencyDown(_) => ErrorKind::DependencyDown,
        }
    }
}

/// Single-writer-per-request semantics: a `setStatus` to a terminal state
/// is idempotent, progress is non-decreasing, and writes are visible to
/// subsequent reads from the same request.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    async fn create(&self, fields: NewJob) -> Result<Job, JobStoreError>;
    async fn set_status(&self, request_id: &str, status: JobStatus, progress: Option<u8>) -> Result<Job, JobStoreError>;
    async fn set_result(&self, request_id: &str, result: serde_json::Value) -> Result<Job, JobStoreError>;
    async fn set_error(&self, request_id: &str, code: &str, message: &str, kind: ErrorKind) -> Result<Job, JobStoreError>;
    async fn get(&self, request_id: &str) -> Result<Option<Job>, JobStoreError>;
    async fn delete(&self, request_id: &str) -> Result<(), JobStoreError>;
    /// Flags a job for cooperative cancellation without otherwise touching
    /// its status; stage boundaries read `cancellationRequested` on their
    /// next check-in. No-op on a job already in a terminal state.
    async fn request_cancellation(&self, request_id: &str) -> Result<(), JobStoreError>;
}

/// In-process job store backed by `DashMap`. Mutation goes through
/// `DashMap::entry` so a single shard lock covers read-modify-write,
/// giving single-writer-per-request semantics without a separate mutex.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<String, Job>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self { jobs: DashMap::new() }
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, fields: NewJob) -> Result<Job, JobStoreError> {
        let request_id = fields.request_id.clone();
        match self.jobs.entry(request_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(JobStoreError::AlreadyExists(request_id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let job = Job::new(fields, Utc::now());
                slot.insert(job.clone());
                Ok(job)
            }
        }
    }

    async fn set_status(&self, request_id: &str, status: JobStatus, progress: Option<u8>) -> Result<Job, JobStoreError> {
        let mut entry = self.jobs.get_mut(request_id).ok_or_else(|| JobStoreError::NotFound(request_id.to_string()))?;
        if entry.status.is_terminal() && entry.status == status {
            // Idempotent re-application of a terminal status: no-op.
            return Ok(entry.clone());
        }
        if !entry.status.can_transition_to(status) {
            return Err(JobStoreError::IllegalTransition { request_id: request_id.to_string(), from: entry.status, to: status });
        }
        entry.status = status;
        if let Some(p) = progress {
            entry.progress = entry.progress.max(p).min(100);
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn set_result(&self, request_id: &str, result: serde_json::Value) -> Result<Job, JobStoreError> {
        let mut entry = self.jobs.get_mut(request_id).ok_or_else(|| JobStoreError::NotFound(request_id.to_string()))?;
        if entry.status.is_terminal() {
            return Err(JobStoreError::IllegalTransition { request_id: request_id.to_string(), from: entry.status, to: JobStatus::DoneSuccess });
        }
        entry.status = JobStatus::DoneSuccess;
        entry.progress = 100;
        entry.result = Some(result);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn set_error(&self, request_id: &str, code: &str, message: &str, kind: ErrorKind) -> Result<Job, JobStoreError> {
        let mut entry = self.jobs.get_mut(request_id).ok_or_else(|| JobStoreError::NotFound(request_id.to_string()))?;
        if entry.status.is_terminal() {
            return Err(JobStoreError::IllegalTransition { request_id: request_id.to_string(), from: entry.status, to: JobStatus::DoneFailed });
        }
        entry.status = JobStatus::DoneFailed;
        entry.error = Some(ErrorObject::new(code, message, kind));
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn get(&self, request_id: &str) -> Result<Option<Job>, JobStoreError> {
        Ok(self.jobs.get(request_id).map(|r| r.clone()))
    }

    async fn delete(&self, request_id: &str) -> Result<(), JobStoreError> {
        self.jobs.remove(request_id);
        Ok(())
    }

    async fn request_cancellation(&self, request_id: &str) -> Result<(), JobStoreError> {
        let mut entry = self.jobs.get_mut(request_id).ok_or_else(|| JobStoreError::NotFound(request_id.to_string()))?;
        if !entry.status.is_terminal() {
            entry.cancellation_requested = true;
            entry.updated_at = Utc::now();
        }
        Ok(())
    }
}
