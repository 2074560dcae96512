//! Nightrank - nightlife venue ranking service
//!
//! This library provides the transparent power score engine and the
//! selection pipeline behind the tonight, nearby, monthly and trending
//! venue views.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    distance::{calculate_bounding_box, haversine_distance},
    ScoreEngine, SelectionMode, Selector,
};
pub use error::{ApiError, CatalogError, ParamError, RankingError};
pub use models::{
    Coordinates, Ranking, RankingPeriod, ScoringInput, ScoringResult, ScoringWeights, Venue,
    VenueSelection,
};
