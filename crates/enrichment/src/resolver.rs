use async_trait::async_trait;
use thiserror::Error;

/// The external layered deep-link resolution strategy: concrete places
/// wire protocols are an external collaborator, not this crate's concern.
#[async_trait]
pub trait DeepLinkResolver: Send + Sync {
    async fn resolve(&self, provider: &str, place_id: &str, name: &str, city_text: Option<&str>) -> Result<String, ResolverError>;
}

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("resolver transient failure: {0}")]
    Transient(String),
    #[error("resolver permanent failure: {0}")]
    Permanent(String),
}
