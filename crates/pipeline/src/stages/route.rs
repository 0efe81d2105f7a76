use plate_types::UserLocation;

use crate::types::{IntentLite, RouteMode, RoutePlan, DEFAULT_RADIUS_METERS};

/// Route-Map stage: deterministic, no LLM call. Uses `nearbysearch` if any
/// of: user coordinates provided, location.isRelative, or explicit radius;
/// otherwise `textsearch`. Default radius 2000m.
pub fn run(intent: &IntentLite, user_location: Option<UserLocation>) -> RoutePlan {
    let mode = if user_location.is_some() || intent.location.is_relative || intent.radius_meters.is_some() {
        RouteMode::Nearbysearch
    } else {
        RouteMode::Textsearch
    };
    let radius = intent.radius_meters.unwrap_or(DEFAULT_RADIUS_METERS);
    RoutePlan { mode, radius }
}
