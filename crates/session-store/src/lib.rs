//! Session Store (C2): opaque session ids with sliding TTL, refreshed on
//! every read and write.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use plate_types::{ErrorKind, Session};
use thiserror::Error;

const DEFAULT_TTL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session {0} not found or expired")]
    NotFound(String),
    #[error("session store backend unavailable: {0}")]
    DependencyDown(String),
}

impl SessionStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionStoreError::NotFound(_) => ErrorKind::NotFound,
            SessionStoreError::DependencyDown(_) => ErrorKind::DependencyDown,
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn create(&self, user_id: Option<String>) -> Result<Session, SessionStoreError>;
    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionStoreError>;
    async fn touch(&self, session_id: &str) -> Result<(), SessionStoreError>;
    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError>;
}

pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_TTL_DAYS))
    }
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { sessions: DashMap::new(), ttl }
    }

    fn prune_if_expired(&self, session_id: &str) {
        let expired = self.sessions.get(session_id).map(|s| s.is_expired(Utc::now())).unwrap_or(false);
        if expired {
            self.sessions.remove(session_id);
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, user_id: Option<String>) -> Result<Session, SessionStoreError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(session_id.clone(), user_id, Utc::now(), self.ttl);
        self.sessions.insert(session_id, session.clone());
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionStoreError> {
        self.prune_if_expired(session_id);
        let Some(mut entry) = self.sessions.get_mut(session_id) else { return Ok(None) };
        entry.touch(Utc::now(), self.ttl);
        Ok(Some(entry.clone()))
    }

    async fn touch(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.prune_if_expired(session_id);
        let mut entry = self.sessions.get_mut(session_id).ok_or_else(|| SessionStoreError::NotFound(session_id.to_string()))?;
        entry.touch(Utc::now(), self.ttl);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.sessions.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_slides_ttl_forward() {
        let store = InMemorySessionStore::new(Duration::seconds(10));
        let session = store.create(None).await.unwrap();
        let first_expiry = session.expires_at;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let touched = store.get(&session.session_id).await.unwrap().unwrap();
        assert!(touched.expires_at >= first_expiry);
    }

    #[tokio::test]
    async fn expired_session_reads_as_absent() {
        let store = InMemorySessionStore::new(Duration::milliseconds(1));
        let session = store.create(None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(store.get(&session.session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let store = InMemorySessionStore::default();
        let session = store.create(Some("u1".into())).await.unwrap();
        store.delete(&session.session_id).await.unwrap();
        assert!(store.get(&session.session_id).await.unwrap().is_none());
    }
}
