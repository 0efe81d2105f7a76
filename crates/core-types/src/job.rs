use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorObject;

/// Job lifecycle status. Transitions are monotone; `DONE_*` states are
/// absorbing (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    DoneSuccess,
    DoneClarify,
    DoneStopped,
    DoneFailed,
}

impl JobStatus {
    /// Terminal states are absorbing: no further transitions occur.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::DoneSuccess | JobStatus::DoneClarify | JobStatus::DoneStopped | JobStatus::DoneFailed
        )
    }

    /// The total order status transitions must respect. Two terminal states
    /// are never "less than" each other; a terminal state is never less than
    /// a non-terminal one.
    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::DoneSuccess
            | JobStatus::DoneClarify
            | JobStatus::DoneStopped
            | JobStatus::DoneFailed => 2,
        }
    }

    /// Whether `self -> next` is a legal transition: monotone, and never out
    /// of a terminal state (other than into itself, for idempotent retries).
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        next.rank() >= self.rank()
    }
}

/// A server-side record of a single search request with a lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub request_id: String,
    pub session_id: String,
    pub owner_user_id: Option<String>,
    pub query: String,
    pub trace_id: Option<String>,
    pub query_detected_language: Option<String>,
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<serde_json::Value>,
    pub error: Option<ErrorObject>,
    pub retry_count: u8,
    pub cancellation_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub request_id: String,
    pub query: String,
    pub owner_user_id: Option<String>,
    pub owner_session_id: String,
    pub trace_id: Option<String>,
    pub detected_language: Option<String>,
}

impl Job {
    pub fn new(fields: NewJob, now: DateTime<Utc>) -> Self {
        Self {
            request_id: fields.request_id,
            session_id: fields.owner_session_id,
            owner_user_id: fields.owner_user_id,
            query: fields.query,
            trace_id: fields.trace_id,
            query_detected_language: fields.detected_language,
            status: JobStatus::Pending,
            progress: 0,
            result: None,
            error: None,
            retry_count: 0,
            cancellation_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// `ownerUserId`/`ownerSessionId` match check used by the subscription
    /// manager's ownership contract.
    pub fn is_owned_by(&self, user_id: Option<&str>, session_id: &str) -> bool {
        self.owner_user_id.as_deref() == user_id && self.session_id == session_id
    }
}
