use serde::{Deserialize, Serialize};

use crate::core::selector::SelectionMode;
use crate::models::domain::{RankingPeriod, VenueSelection};

/// Response for the tonight / nearby / trending endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    pub mode: SelectionMode,
    pub venues: Vec<VenueSelection>,
    pub total_candidates: usize,
    pub generated_at: chrono::NaiveDateTime,
}

/// Response for the monthly rankings endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRankingsResponse {
    pub period: RankingPeriod,
    /// False when the catalog had a stored snapshot, true when ranked live
    pub computed: bool,
    pub venues: Vec<VenueSelection>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
