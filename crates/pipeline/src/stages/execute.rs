use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use plate_types::UserLocation;

use crate::provider::{PlacesProvider, ProviderError};
use crate::types::{Candidate, RoutePlan};

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("places provider call exceeded its deadline")]
    Timeout,
    #[error("places provider call aborted")]
    Aborted,
    #[error("places provider failure: {0}")]
    Provider(#[from] ProviderError),
}

/// Execute stage: dispatches to the external places provider. A transient
/// provider failure is retried once before being surfaced.
#[instrument(skip(provider, cancel))]
pub async fn run(
    provider: &Arc<dyn PlacesProvider>,
    query: &str,
    plan: RoutePlan,
    user_location: Option<UserLocation>,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<Candidate>, ExecuteError> {
    match call_once(provider, query, plan, user_location, deadline, cancel).await {
        Ok(candidates) => Ok(candidates),
        Err(ExecuteError::Provider(ProviderError::Transient(msg))) => {
            warn!(%msg, "execute stage retrying after transient provider failure");
            call_once(provider, query, plan, user_location, deadline, cancel).await
        }
        Err(e) => Err(e),
    }
}

async fn call_once(
    provider: &Arc<dyn PlacesProvider>,
    query: &str,
    plan: RoutePlan,
    user_location: Option<UserLocation>,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<Candidate>, ExecuteError> {
    tokio::select! {
        result = tokio::time::timeout(deadline, provider.search(query, plan, user_location)) => {
            match result {
                Ok(inner) => inner.map_err(ExecuteError::from),
                Err(_) => Err(ExecuteError::Timeout),
            }
        }
        () = cancel.cancelled() => Err(ExecuteError::Aborted),
    }
}
