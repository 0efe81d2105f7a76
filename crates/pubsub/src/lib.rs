//! Subscription Manager (C4) and Event Publisher (C5).

mod backlog;
mod manager;
mod publisher;
mod subscriber;

pub use manager::SubscriptionManager;
pub use publisher::Publisher;
pub use subscriber::{Identity, OutboundMessage, SubscriberHandle};
