use serde::{Deserialize, Serialize};

use crate::error::ErrorObject;
use crate::job::JobStatus;

/// The closed set of logical streams a subscriber can observe for a
/// `requestId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Search,
    Assistant,
    Provider,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Search, Channel::Assistant, Channel::Provider];
}

/// `subscribe{v=1, channel, requestId, sessionId}` from the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub v: u8,
    pub channel: Channel,
    pub request_id: String,
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// `unsubscribe{channel, requestId}` from the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeRequest {
    pub channel: Channel,
    pub request_id: String,
}

/// Machine-readable reason a subscribe was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NackReason {
    SessionMismatch,
    NotFound,
}

impl NackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NackReason::SessionMismatch => "session mismatch",
            NackReason::NotFound => "job not found",
        }
    }
}

/// `sub_ack`/`sub_nack` sent in reply to a subscribe request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SubscribeAck {
    #[serde(rename = "sub_ack")]
    Ack { channel: Channel, request_id: String, #[serde(skip_serializing_if = "std::ops::Not::not")] pending: bool },
    #[serde(rename = "sub_nack")]
    Nack { channel: Channel, request_id: String, reason: String },
}

/// Structured close reasons for the bidirectional subscription transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseReason {
    IdleTimeout,
    HeartbeatTimeout,
    ServerClose,
}

/// Assistant narration payload types (Narrator stage output kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NarratorType {
    GateFail,
    Clarify,
    Summary,
}

/// `assistant` channel narration payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantPayload {
    #[serde(rename = "type")]
    pub kind: NarratorType,
    pub message: String,
    pub question: Option<String>,
    pub blocks_search: bool,
    pub suggested_action: Option<String>,
}

/// Terminal payload discriminant carried on the `search` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalType {
    Result,
    Clarify,
    Stopped,
    Failed,
}

/// Provider-enrichment resolution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderStatus {
    Pending,
    Found,
    NotFound,
}

/// The canonical application events published to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AppEvent {
    #[serde(rename = "status")]
    Progress { request_id: String, status: JobStatus, progress: u8 },
    #[serde(rename = "result")]
    Result { request_id: String, payload: serde_json::Value },
    #[serde(rename = "clarify")]
    Clarify { request_id: String, payload: serde_json::Value },
    #[serde(rename = "stopped")]
    Stopped { request_id: String, payload: serde_json::Value },
    #[serde(rename = "failed")]
    Failed { request_id: String, payload: ErrorObject },
    #[serde(rename = "assistant")]
    Assistant { request_id: String, payload: AssistantPayload },
    #[serde(rename = "result_patch")]
    ResultPatch {
        request_id: String,
        place_id: String,
        provider: String,
        status: ProviderStatus,
        url: Option<String>,
        updated_at: chrono::DateTime<chrono::Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        meta: Option<serde_json::Value>,
    },
}

impl AppEvent {
    /// Events carrying a terminal job state; consuming one of these drains
    /// and discards remaining backlog for the key.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppEvent::Result { .. } | AppEvent::Clarify { .. } | AppEvent::Stopped { .. } | AppEvent::Failed { .. })
    }

    pub fn request_id(&self) -> &str {
        match self {
            AppEvent::Progress { request_id, .. }
            | AppEvent::Result { request_id, .. }
            | AppEvent::Clarify { request_id, .. }
            | AppEvent::Stopped { request_id, .. }
            | AppEvent::Failed { request_id, .. }
            | AppEvent::Assistant { request_id, .. }
            | AppEvent::ResultPatch { request_id, .. } => request_id,
        }
    }

    /// The channel this event is published on.
    pub fn channel(&self) -> Channel {
        match self {
            AppEvent::Progress { .. } | AppEvent::Result { .. } | AppEvent::Clarify { .. } | AppEvent::Stopped { .. } | AppEvent::Failed { .. } => {
                Channel::Search
            }
            AppEvent::Assistant { .. } => Channel::Assistant,
            AppEvent::ResultPatch { .. } => Channel::Provider,
        }
    }
}
