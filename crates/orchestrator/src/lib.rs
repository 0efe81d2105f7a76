//! Job Orchestrator (C10): composition root over every other component —
//! submission handling, pipeline execution under a per-job cancellation
//! token, terminal-state bookkeeping, and enrichment fan-out.

mod config;
mod error;
mod orchestrator;

pub use config::Config;
pub use error::OrchestratorError;
pub use orchestrator::{Orchestrator, SubmitOutcome};
