//! Transport composition root: `axum` HTTP submission endpoint and
//! WebSocket subscription endpoint over the Job Orchestrator (C10).
//!
//! Wire framing beyond the canonical event/ack shapes in `plate-types` is
//! this crate's own choice; exact transport framing is out of scope.

mod error;
mod router;
mod state;
mod submit;
mod ws;

pub use router::build_router;
pub use state::{AppState, TransportConfig};
