use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use plate_job_store::JobStore;
use plate_types::{AppEvent, Channel, NackReason, SubscribeAck};
use tracing::{debug, trace, warn};

use crate::backlog::Backlog;
use crate::subscriber::{Identity, OutboundMessage, SubscriberHandle};

const DEFAULT_BACKLOG_CAPACITY: usize = 256;

type Key = (Channel, String);

struct KeyState {
    subscribers: Vec<SubscriberHandle>,
    backlog: Backlog,
}

impl KeyState {
    fn new(capacity: usize) -> Self {
        Self { subscribers: Vec::new(), backlog: Backlog::new(capacity) }
    }
}

struct PendingEntry {
    subscriber: SubscriberHandle,
    channel: Channel,
    identity: Identity,
}

/// Subscription Manager (C4) + the backlog storage it owns for Event
/// Publisher (C5) to drain through. A `DashMap` registry keyed for
/// fine-grained per-key synchronisation, with a background reaper
/// sweeping stale entries.
pub struct SubscriptionManager {
    job_store: Arc<dyn JobStore>,
    keys: DashMap<Key, KeyState>,
    pending: DashMap<String, Vec<PendingEntry>>,
    subscriber_keys: DashMap<String, HashSet<Key>>,
    subscriber_pending: DashMap<String, HashSet<String>>,
    backlog_capacity: usize,
}

impl SubscriptionManager {
    pub fn new(job_store: Arc<dyn JobStore>) -> Self {
        Self::with_backlog_capacity(job_store, DEFAULT_BACKLOG_CAPACITY)
    }

    pub fn with_backlog_capacity(job_store: Arc<dyn JobStore>, backlog_capacity: usize) -> Self {
        Self {
            job_store,
            keys: DashMap::new(),
            pending: DashMap::new(),
            subscriber_keys: DashMap::new(),
            subscriber_pending: DashMap::new(),
            backlog_capacity,
        }
    }

    fn record_subscriber_key(&self, subscriber_id: &str, key: Key) {
        self.subscriber_keys.entry(subscriber_id.to_string()).or_default().insert(key);
    }

    /// `subscribe(channel, requestId, subscriber, subscriberIdentity)`.
    ///
    /// Sends an ack/nack directly to the subscriber's queue and, on a
    /// successful activation, drains any backlog in FIFO order before
    /// returning — so the caller never needs to interleave further sends
    /// itself to preserve "ACK precedes any application event".
    pub async fn subscribe(&self, channel: Channel, request_id: &str, subscriber: SubscriberHandle, identity: Identity) {
        match self.job_store.get(request_id).await {
            Ok(Some(job)) => {
                if job.is_owned_by(identity.user_id.as_deref(), &identity.session_id) {
                    self.activate_one(channel, request_id, subscriber, pending_flag(false));
                } else {
                    warn!(%request_id, ?channel, "subscribe rejected: ownership mismatch");
                    let _ = subscriber.try_send(OutboundMessage::Ack(SubscribeAck::Nack {
                        channel,
                        request_id: request_id.to_string(),
                        reason: NackReason::SessionMismatch.as_str().to_string(),
                    }));
                }
            }
            Ok(None) => {
                self.pending.entry(request_id.to_string()).or_default().push(PendingEntry {
                    subscriber: subscriber.clone(),
                    channel,
                    identity,
                });
                self.subscriber_pending.entry(subscriber.id.clone()).or_default().insert(request_id.to_string());
                debug!(%request_id, ?channel, "subscribe recorded as pending");
                let _ = subscriber.try_send(OutboundMessage::Ack(SubscribeAck::Ack { channel, request_id: request_id.to_string(), pending: true }));
            }
            Err(e) => {
                // Ambiguity when ownership cannot be proven results in
                // rejection, never silent acceptance.
                warn!(%request_id, error = %e, "subscribe rejected: could not resolve job ownership");
                let _ = subscriber.try_send(OutboundMessage::Ack(SubscribeAck::Nack {
                    channel,
                    request_id: request_id.to_string(),
                    reason: NackReason::NotFound.as_str().to_string(),
                }));
            }
        }
    }

    fn activate_one(&self, channel: Channel, request_id: &str, subscriber: SubscriberHandle, pending: bool) {
        let key: Key = (channel, request_id.to_string());
        let subscriber_id = subscriber.id.clone();
        let mut state = self.keys.entry(key.clone()).or_insert_with(|| KeyState::new(self.backlog_capacity));
        if !state.subscribers.iter().any(|s| s.id == subscriber.id) {
            state.subscribers.push(subscriber.clone());
        }
        let _ = subscriber.try_send(OutboundMessage::Ack(SubscribeAck::Ack { channel, request_id: request_id.to_string(), pending }));
        for event in state.backlog.drain() {
            if !subscriber.try_send(OutboundMessage::Event(event)) {
                warn!(subscriber = %subscriber.id, "dropping subscriber: send queue overflow during backlog drain");
                state.subscribers.retain(|s| s.id != subscriber.id);
                drop(state);
                self.forget_subscriber_key(&subscriber_id, &key);
                return;
            }
        }
        drop(state);
        self.record_subscriber_key(&subscriber_id, key);
    }

    /// `activatePending(requestId)`: promotes all pending entries for
    /// `requestId`, in the order they subscribed.
    pub async fn activate_pending(&self, request_id: &str) {
        let Some((_, entries)) = self.pending.remove(request_id) else { return };
        // Ownership was unknown at subscribe time; validate now against the
        // identity captured when each pending entry was recorded.
        let job = self.job_store.get(request_id).await;
        for entry in entries {
            self.subscriber_pending.entry(entry.subscriber.id.clone()).and_modify(|s| {
                s.remove(request_id);
            });
            match &job {
                Ok(Some(job)) if job.is_owned_by(entry.identity.user_id.as_deref(), &entry.identity.session_id) => {
                    self.activate_one(entry.channel, request_id, entry.subscriber, false);
                }
                _ => {
                    let _ = entry.subscriber.try_send(OutboundMessage::Ack(SubscribeAck::Nack {
                        channel: entry.channel,
                        request_id: request_id.to_string(),
                        reason: NackReason::SessionMismatch.as_str().to_string(),
                    }));
                }
            }
        }
    }

    /// `unsubscribe(channel, requestId, subscriber)`. Idempotent.
    pub fn unsubscribe(&self, channel: Channel, request_id: &str, subscriber_id: &str) {
        let key: Key = (channel, request_id.to_string());
        if let Some(mut state) = self.keys.get_mut(&key) {
            state.subscribers.retain(|s| s.id != subscriber_id);
        }
        self.forget_subscriber_key(subscriber_id, &key);
    }

    fn forget_subscriber_key(&self, subscriber_id: &str, key: &Key) {
        if let Some(mut keys) = self.subscriber_keys.get_mut(subscriber_id) {
            keys.remove(key);
        }
    }

    /// `cleanup(subscriber)`: removes all of a subscriber's subscriptions
    /// and pending entries, without further notification (connection loss).
    pub fn cleanup(&self, subscriber_id: &str) {
        if let Some((_, keys)) = self.subscriber_keys.remove(subscriber_id) {
            for key in keys {
                if let Some(mut state) = self.keys.get_mut(&key) {
                    state.subscribers.retain(|s| s.id != subscriber_id);
                }
            }
        }
        if let Some((_, request_ids)) = self.subscriber_pending.remove(subscriber_id) {
            for request_id in request_ids {
                if let Some(mut entries) = self.pending.get_mut(&request_id) {
                    entries.retain(|e| e.subscriber.id != subscriber_id);
                }
            }
        }
        trace!(%subscriber_id, "subscriber cleaned up");
    }

    /// `subscribersOf(channel, requestId)`.
    pub fn subscribers_of(&self, channel: Channel, request_id: &str) -> Vec<String> {
        self.keys.get(&(channel, request_id.to_string())).map(|s| s.subscribers.iter().map(|h| h.id.clone()).collect()).unwrap_or_default()
    }

    /// Used by the Publisher (C5): deliver to current subscribers, or append
    /// to backlog if there are none.
    pub(crate) fn deliver_or_backlog(&self, event: AppEvent) {
        let key: Key = (event.channel(), event.request_id().to_string());
        let mut state = self.keys.entry(key.clone()).or_insert_with(|| KeyState::new(self.backlog_capacity));
        if state.subscribers.is_empty() {
            state.backlog.push(event);
            return;
        }
        let mut dead = Vec::new();
        for subscriber in &state.subscribers {
            if !subscriber.try_send(OutboundMessage::Event(event.clone())) {
                dead.push(subscriber.id.clone());
            }
        }
        if !dead.is_empty() {
            state.subscribers.retain(|s| !dead.contains(&s.id));
        }
        drop(state);
        for id in dead {
            warn!(subscriber = %id, "dropping subscriber: send queue overflow");
            self.forget_subscriber_key(&id, &key);
        }
    }

    pub fn backlog_dropped_count(&self, channel: Channel, request_id: &str) -> u64 {
        self.keys.get(&(channel, request_id.to_string())).map(|s| s.backlog.dropped_count()).unwrap_or(0)
    }
}

fn pending_flag(v: bool) -> bool {
    v
}
