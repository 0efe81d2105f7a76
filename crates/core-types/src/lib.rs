//! Shared data model and error taxonomy for the conversational search job
//! runtime. Every other crate in the workspace depends on this one; it holds
//! no I/O and no async runtime dependency.

pub mod error;
pub mod event;
pub mod filters;
pub mod job;
pub mod session;

pub use error::{ErrorKind, ErrorObject};
pub use event::{
    AppEvent, AssistantPayload, Channel, CloseReason, NackReason, NarratorType, ProviderStatus,
    SubscribeAck, SubscribeRequest, TerminalType, UnsubscribeRequest,
};
pub use filters::{Filters, Submission, UserLocation};
pub use job::{Job, JobStatus, NewJob};
pub use session::Session;
