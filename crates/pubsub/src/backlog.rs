use std::collections::VecDeque;

use plate_types::AppEvent;

/// Bounded, ordered, in-memory backlog per (channel, requestId). Events are
/// delivered FIFO once the first subscriber activates. Overflow drops the
/// oldest non-terminal event and increments a counter.
pub struct Backlog {
    events: VecDeque<AppEvent>,
    capacity: usize,
    dropped: u64,
}

impl Backlog {
    pub fn new(capacity: usize) -> Self {
        Self { events: VecDeque::with_capacity(capacity.min(16)), capacity, dropped: 0 }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Push a non-terminal event, dropping the oldest non-terminal entry on
    /// overflow. A terminal event clears everything queued before it and
    /// becomes the sole retained entry.
    pub fn push(&mut self, event: AppEvent) {
        if event.is_terminal() {
            self.events.clear();
            self.events.push_back(event);
            return;
        }
        if self.events.len() >= self.capacity {
            if let Some(pos) = self.events.iter().position(|e| !e.is_terminal()) {
                self.events.remove(pos);
                self.dropped += 1;
            } else {
                // Backlog is all terminal events (shouldn't happen, at most
                // one terminal event is ever retained) — drop the oldest.
                self.events.pop_front();
                self.dropped += 1;
            }
        }
        self.events.push_back(event);
    }

    /// Drain all queued events in FIFO publish order.
    pub fn drain(&mut self) -> Vec<AppEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plate_types::JobStatus;

    fn progress(n: u8) -> AppEvent {
        AppEvent::Progress { request_id: "r1".into(), status: JobStatus::Running, progress: n }
    }

    fn terminal() -> AppEvent {
        AppEvent::Result { request_id: "r1".into(), payload: serde_json::json!({}) }
    }

    #[test]
    fn drains_fifo() {
        let mut b = Backlog::new(10);
        b.push(progress(10));
        b.push(progress(20));
        let drained = b.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(&drained[0], AppEvent::Progress { progress: 10, .. }));
        assert!(matches!(&drained[1], AppEvent::Progress { progress: 20, .. }));
    }

    #[test]
    fn overflow_drops_oldest_non_terminal() {
        let mut b = Backlog::new(2);
        b.push(progress(1));
        b.push(progress(2));
        b.push(progress(3));
        assert_eq!(b.dropped_count(), 1);
        let drained = b.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(&drained[0], AppEvent::Progress { progress: 2, .. }));
    }

    #[test]
    fn terminal_event_clears_prior_backlog_and_is_retained_alone() {
        let mut b = Backlog::new(10);
        b.push(progress(1));
        b.push(progress(2));
        b.push(terminal());
        assert_eq!(b.len(), 1);
        let drained = b.drain();
        assert!(drained[0].is_terminal());
    }
}
