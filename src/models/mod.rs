// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, CandidateQuery, Coordinates, DaySet, Deal, DealKind, Event, ExpertDesignation,
    OpeningHours, Ranking, RankingPeriod, Rating, RatingSource, ScoreBreakdown, ScoreReason,
    ScoringInput, ScoringResult, ScoringWeights, Trend, TrendDirection, Venue, VenueId,
    VenueSelection,
};
pub use requests::{ModeDefaults, MonthlyQuery, VenueQuery};
pub use responses::{ErrorResponse, HealthResponse, MonthlyRankingsResponse, SelectionResponse};
