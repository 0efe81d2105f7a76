use std::time::Duration;

use plate_orchestrator::Orchestrator;

/// Transport-relevant slice of `Config` the axum layer reads directly; the
/// rest of `Config` is consumed building the `Orchestrator`'s collaborators
/// and never crosses into this crate.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub allowed_origins: Vec<String>,
    pub heartbeat_interval: Duration,
    pub idle_timeout: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub transport: TransportConfig,
}
