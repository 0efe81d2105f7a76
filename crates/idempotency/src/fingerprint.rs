use plate_types::{Filters, UserLocation};
use sha2::{Digest, Sha256};

/// Whether the submission starts a fresh conversational context or
/// continues the prior one. `mode` is a fingerprint input, but the
/// submission interface has no explicit mode field — `clearContext` is the
/// only submission-time signal that changes dedup semantics, so it is what
/// `mode` is derived from (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Continue,
    Clear,
}

impl Mode {
    pub fn from_clear_context(clear_context: bool) -> Self {
        if clear_context {
            Mode::Clear
        } else {
            Mode::Continue
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Mode::Continue => "continue",
            Mode::Clear => "clear",
        }
    }
}

/// Lowercases, trims, and collapses inner whitespace. Idempotent:
/// `normalize(normalize(x)) == normalize(x)`.
pub fn normalize_query(query: &str) -> String {
    query.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `"no-location"` or `"lat,lng"` rounded to 4 decimals. Any two coordinates
/// rounding to the same representation yield the same bucket.
pub fn location_bucket(location: Option<UserLocation>) -> String {
    match location {
        None => "no-location".to_string(),
        Some(loc) => format!("{:.4},{:.4}", loc.lat, loc.lng),
    }
}

/// Filter arrays sorted lexicographically; scalar filters in a fixed order.
pub fn serialize_filters(filters: &Filters) -> String {
    let mut dietary = filters.dietary.clone();
    dietary.sort();
    let mut must_have = filters.must_have.clone();
    must_have.sort();
    format!(
        "open_now={};price_level={};dietary={};must_have={}",
        filters.open_now.map(|b| b.to_string()).unwrap_or_default(),
        filters.price_level.map(|p| p.to_string()).unwrap_or_default(),
        dietary.join(","),
        must_have.join(","),
    )
}

/// SHA-256 of `sessionId | normalized(query) | mode | locationBucket |
/// serializedFilters`.
pub fn fingerprint(session_id: &str, query: &str, mode: Mode, location: Option<UserLocation>, filters: &Filters) -> String {
    let canonical = format!(
        "{session_id}|{}|{}|{}|{}",
        normalize_query(query),
        mode.as_str(),
        location_bucket(location),
        serialize_filters(filters)
    );
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let raw = "  Pizza   in   ASHKELON  ";
        let once = normalize_query(raw);
        let twice = normalize_query(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "pizza in ashkelon");
    }

    #[test]
    fn location_bucket_is_stable_under_rounding() {
        let a = UserLocation { lat: 31.66851, lng: 34.57185 };
        let b = UserLocation { lat: 31.668511, lng: 34.571849 };
        assert_eq!(location_bucket(Some(a)), location_bucket(Some(b)));
    }

    #[test]
    fn filter_array_order_does_not_affect_fingerprint() {
        let mut f1 = Filters::default();
        f1.dietary = vec!["vegan".into(), "kosher".into()];
        let mut f2 = Filters::default();
        f2.dietary = vec!["kosher".into(), "vegan".into()];
        assert_eq!(serialize_filters(&f1), serialize_filters(&f2));
    }

    #[test]
    fn same_inputs_yield_same_fingerprint() {
        let f = Filters::default();
        let a = fingerprint("s1", "pizza", Mode::Continue, None, &f);
        let b = fingerprint("s1", "  Pizza  ", Mode::Continue, None, &f);
        assert_eq!(a, b);
    }

    #[test]
    fn different_sessions_yield_different_fingerprints() {
        let f = Filters::default();
        let a = fingerprint("s1", "pizza", Mode::Continue, None, &f);
        let b = fingerprint("s2", "pizza", Mode::Continue, None, &f);
        assert_ne!(a, b);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalize_always_idempotent(s in ".*") {
            let once = normalize_query(&s);
            let twice = normalize_query(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
