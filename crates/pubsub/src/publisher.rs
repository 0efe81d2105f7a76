use std::sync::Arc;

use chrono::{DateTime, Utc};
use plate_types::{AppEvent, ProviderStatus};

use crate::manager::SubscriptionManager;

/// Event Publisher (C5). Depends only on the Subscription Manager, resolving
/// the cyclic Orchestrator/Publisher/Manager relationship via injection.
#[derive(Clone)]
pub struct Publisher {
    manager: Arc<SubscriptionManager>,
}

impl Publisher {
    pub fn new(manager: Arc<SubscriptionManager>) -> Self {
        Self { manager }
    }

    /// `publish(channel, requestId, event)`.
    pub fn publish(&self, event: AppEvent) {
        self.manager.deliver_or_backlog(event);
    }

    /// Builds the canonical provider-patch event and publishes it on the
    /// provider channel.
    #[allow(clippy::too_many_arguments)]
    pub fn publish_provider_patch(
        &self,
        provider: impl Into<String>,
        place_id: impl Into<String>,
        request_id: impl Into<String>,
        status: ProviderStatus,
        url: Option<String>,
        updated_at: DateTime<Utc>,
        meta: Option<serde_json::Value>,
    ) {
        debug_assert!(!(status == ProviderStatus::NotFound && url.is_some()), "NOT_FOUND must never carry a url");
        self.publish(AppEvent::ResultPatch {
            request_id: request_id.into(),
            place_id: place_id.into(),
            provider: provider.into(),
            status,
            url,
            updated_at,
            meta,
        });
    }
}
