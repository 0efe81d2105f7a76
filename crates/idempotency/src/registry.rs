use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Idempotency Registry (C6): a short-lived mapping from fingerprint to
/// in-flight requestId, removed when the job terminates.
pub struct IdempotencyRegistry {
    claims: DashMap<String, Claim>,
}

struct Claim {
    request_id: String,
    #[allow(dead_code)]
    claimed_at: DateTime<Utc>,
}

impl Default for IdempotencyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdempotencyRegistry {
    pub fn new() -> Self {
        Self { claims: DashMap::new() }
    }

    /// Succeeds only if no in-flight claim exists for `fingerprint`.
    /// Returns the request id that now owns the claim: the caller's own
    /// `request_id` on success, or the existing in-flight one on conflict.
    pub fn claim(&self, fingerprint: &str, request_id: &str) -> ClaimOutcome {
        match self.claims.entry(fingerprint.to_string()) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Claim { request_id: request_id.to_string(), claimed_at: Utc::now() });
                ClaimOutcome::Claimed
            }
            dashmap::mapref::entry::Entry::Occupied(slot) => ClaimOutcome::Existing(slot.get().request_id.clone()),
        }
    }

    pub fn lookup(&self, fingerprint: &str) -> Option<String> {
        self.claims.get(fingerprint).map(|c| c.request_id.clone())
    }

    pub fn release(&self, fingerprint: &str) {
        self.claims.remove(fingerprint);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    Existing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_on_same_fingerprint_redirects_to_first() {
        let registry = IdempotencyRegistry::new();
        assert_eq!(registry.claim("fp1", "req-1"), ClaimOutcome::Claimed);
        assert_eq!(registry.claim("fp1", "req-2"), ClaimOutcome::Existing("req-1".to_string()));
    }

    #[test]
    fn release_allows_a_new_claim() {
        let registry = IdempotencyRegistry::new();
        registry.claim("fp1", "req-1");
        registry.release("fp1");
        assert_eq!(registry.claim("fp1", "req-2"), ClaimOutcome::Claimed);
    }

    #[test]
    fn lookup_reflects_current_owner() {
        let registry = IdempotencyRegistry::new();
        assert_eq!(registry.lookup("fp1"), None);
        registry.claim("fp1", "req-1");
        assert_eq!(registry.lookup("fp1"), Some("req-1".to_string()));
    }
}
