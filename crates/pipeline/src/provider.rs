use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Candidate, RoutePlan};
use plate_types::UserLocation;

/// The external places provider: out of scope as a concrete integration,
/// specified only as an interface consumed by Execute.
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        plan: RoutePlan,
        user_location: Option<UserLocation>,
    ) -> Result<Vec<Candidate>, ProviderError>;
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("places provider transient failure: {0}")]
    Transient(String),
    #[error("places provider permanent failure: {0}")]
    Permanent(String),
}
