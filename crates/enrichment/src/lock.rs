use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Anti-thrash locks on `(provider, placeId)`: single-writer per key with
/// an upper-bound TTL so a crashed worker cannot wedge the key.
#[derive(Default)]
pub struct EnrichmentLocks {
    held: DashMap<(String, String), DateTime<Utc>>,
}

impl EnrichmentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to acquire the lock for `ttl`. Fails if another worker
    /// holds an unexpired lock on the same key.
    pub fn try_acquire(&self, provider: &str, place_id: &str, ttl: Duration) -> bool {
        let key = (provider.to_string(), place_id.to_string());
        let now = Utc::now();
        match self.held.entry(key) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(now + ttl);
                true
            }
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                if *slot.get() <= now {
                    slot.insert(now + ttl);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn release(&self, provider: &str, place_id: &str) {
        self.held.remove(&(provider.to_string(), place_id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_holds_lock() {
        let locks = EnrichmentLocks::new();
        assert!(locks.try_acquire("google", "p1", Duration::seconds(60)));
        assert!(!locks.try_acquire("google", "p1", Duration::seconds(60)));
    }

    #[test]
    fn release_allows_reacquire() {
        let locks = EnrichmentLocks::new();
        locks.try_acquire("google", "p1", Duration::seconds(60));
        locks.release("google", "p1");
        assert!(locks.try_acquire("google", "p1", Duration::seconds(60)));
    }

    #[test]
    fn expired_lock_can_be_reacquired_without_explicit_release() {
        let locks = EnrichmentLocks::new();
        locks.try_acquire("google", "p1", Duration::milliseconds(-1));
        assert!(locks.try_acquire("google", "p1", Duration::seconds(60)));
    }
}
