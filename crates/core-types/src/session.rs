use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque, collision-resistant session identifier with sliding TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: String, user_id: Option<String>, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self { session_id, user_id, created_at: now, last_seen: now, expires_at: now + ttl }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Slide the TTL forward from `now`.
    pub fn touch(&mut self, now: DateTime<Utc>, ttl: chrono::Duration) {
        self.last_seen = now;
        self.expires_at = now + ttl;
    }
}
