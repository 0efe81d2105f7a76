use std::time::Duration;

/// Per-stage timeouts").
/// Deadlines are per-stage and not additive.
#[derive(Debug, Clone, Copy)]
pub struct PipelineTimeouts {
    pub gate: Duration,
    pub intent_lite: Duration,
    pub route: Duration,
    pub execute: Duration,
    pub cuisine: Duration,
    pub narrator: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            gate: Duration::from_secs(5),
            intent_lite: Duration::from_secs(5),
            route: Duration::from_millis(50),
            execute: Duration::from_secs(10),
            cuisine: Duration::from_secs(5),
            narrator: Duration::from_secs(5),
        }
    }
}
