use std::collections::HashMap;

use crate::types::{Candidate, RankedResult};

/// Ranker weights. Cuisine score dominates since it is
/// the one signal under the pipeline's direct control; rating and distance
/// act as tie-breakers.
const CUISINE_WEIGHT: f64 = 0.6;
const RATING_WEIGHT: f64 = 0.3;
const DISTANCE_WEIGHT: f64 = 0.1;

const MAX_CONSIDERED_DISTANCE_METERS: f64 = 20_000.0;

pub fn rank(candidates: Vec<Candidate>, scores: &HashMap<String, f64>) -> Vec<RankedResult> {
    let mut ranked: Vec<(f64, RankedResult)> = candidates
        .into_iter()
        .map(|c| {
            let cuisine_score = scores.get(&c.place_id).copied().unwrap_or(0.0);
            let rating_component = c.rating.map(|r| (r / 5.0).clamp(0.0, 1.0)).unwrap_or(0.0);
            let distance_component = c
                .distance_meters
                .map(|d| 1.0 - (d / MAX_CONSIDERED_DISTANCE_METERS).clamp(0.0, 1.0))
                .unwrap_or(0.0);
            let combined = CUISINE_WEIGHT * cuisine_score + RATING_WEIGHT * rating_component + DISTANCE_WEIGHT * distance_component;
            (
                combined,
                RankedResult {
                    place_id: c.place_id,
                    name: c.name,
                    city_text: c.city_text,
                    cuisine_score,
                    rating: c.rating,
                    distance_meters: c.distance_meters,
                },
            )
        })
        .collect();

    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().map(|(_, r)| r).collect()
}
