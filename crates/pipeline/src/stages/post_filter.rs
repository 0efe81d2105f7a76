use plate_types::Filters;

use crate::types::{Candidate, PostFilterOutput};

/// Post-Filter stage: deterministic. Applies open-state, price, dietary,
/// and accessibility constraints. A candidate missing a field the
/// filter cares about is kept rather than speculatively dropped — only a
/// known mismatch excludes it.
pub fn run(candidates: Vec<Candidate>, filters: &Filters) -> PostFilterOutput {
    let total = candidates.len();
    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| {
            if filters.open_now == Some(true) && c.open_now == Some(false) {
                return false;
            }
            if let (Some(wanted), Some(actual)) = (filters.price_level, c.price_level) {
                if wanted != actual {
                    return false;
                }
            }
            if !filters.dietary.is_empty() && !filters.dietary.iter().all(|d| c.dietary.contains(d)) {
                return false;
            }
            if filters.must_have.iter().any(|m| m == "accessible") && c.accessible == Some(false) {
                return false;
            }
            true
        })
        .collect();
    let dropped_count = total - kept.len();
    PostFilterOutput { kept, dropped_count }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str) -> Candidate {
        Candidate {
            place_id: id.to_string(),
            name: id.to_string(),
            city_text: None,
            cuisine_terms: vec![],
            rating: None,
            distance_meters: None,
            open_now: None,
            price_level: None,
            dietary: vec![],
            accessible: None,
        }
    }

    #[test]
    fn open_now_filter_drops_known_closed_places() {
        let mut closed = candidate("a");
        closed.open_now = Some(false);
        let open = candidate("b");
        let filters = Filters { open_now: Some(true), ..Default::default() };
        let result = run(vec![closed, open], &filters);
        assert_eq!(result.kept.len(), 1);
        assert_eq!(result.kept[0].place_id, "b");
        assert_eq!(result.dropped_count, 1);
    }

    #[test]
    fn dietary_filter_requires_all_tags() {
        let mut vegan = candidate("a");
        vegan.dietary = vec!["vegan".to_string()];
        let filters = Filters { dietary: vec!["vegan".to_string(), "gluten_free".to_string()], ..Default::default() };
        let result = run(vec![vegan], &filters);
        assert_eq!(result.kept.len(), 0);
    }

    #[test]
    fn unknown_field_is_not_speculatively_dropped() {
        let unknown = candidate("a");
        let filters = Filters { open_now: Some(true), ..Default::default() };
        let result = run(vec![unknown], &filters);
        assert_eq!(result.kept.len(), 1);
    }
}
