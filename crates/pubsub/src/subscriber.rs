use plate_types::{AppEvent, SubscribeAck};

/// A message pushed down a subscriber's send queue: either an ack/nack for a
/// subscribe request, or an application event.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Ack(SubscribeAck),
    Event(AppEvent),
}

/// One physical connection's outbound queue. The queue is bounded; overflow
/// disconnects the subscriber without affecting any other subscriber
///.
#[derive(Clone)]
pub struct SubscriberHandle {
    pub id: String,
    pub tx: tokio::sync::mpsc::Sender<OutboundMessage>,
}

impl SubscriberHandle {
    pub fn new(id: impl Into<String>, tx: tokio::sync::mpsc::Sender<OutboundMessage>) -> Self {
        Self { id: id.into(), tx }
    }

    /// Best-effort, non-blocking send. Returns `false` if the queue is full
    /// or closed — the caller is responsible for treating that as a
    /// disconnect.
    pub fn try_send(&self, msg: OutboundMessage) -> bool {
        self.tx.try_send(msg).is_ok()
    }
}

/// The (userId?, sessionId) pair a subscribe request carries, checked
/// against a job's owner fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
    pub session_id: String,
}
