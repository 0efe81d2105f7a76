//! Pipeline (C8): Gate -> Intent -> Route -> Execute -> Cuisine-Score ->
//! Post-Filter -> Narrator.

mod config;
mod near_me;
mod provider;
mod ranker;
mod result_cache;
mod stages;
mod types;

mod pipeline;

pub use config::PipelineTimeouts;
pub use pipeline::{progress, Pipeline, PipelineOutcome};
pub use provider::{PlacesProvider, ProviderError};
pub use types::{
    Candidate, ClarifyReason, FoodIntent, FoodSignal, GateOutput, IntentLite, LocationIntent, NarratorContext, PostFilterOutput,
    RankedResult, RouteMode, RoutePlan, StopPayload, TargetType, VirtualFilters, DEFAULT_RADIUS_METERS,
};
