use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::ParamError;

/// Catalog identifier of a venue
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(pub String);

impl VenueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point on the globe in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
}

impl Coordinates {
    /// Build a coordinate pair, rejecting non-finite or out-of-range values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ParamError> {
        let coords = Self { latitude, longitude };
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ParamError::OutOfRange {
                name: "lat",
                value: latitude.to_string(),
                expected: "a latitude between -90 and 90",
            });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ParamError::OutOfRange {
                name: "lng",
                value: longitude.to_string(),
                expected: "a longitude between -180 and 180",
            });
        }
        Ok(coords)
    }

    pub fn is_valid(&self) -> bool {
        Self::new(self.latitude, self.longitude).is_ok()
    }
}

/// Review provider a rating comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingSource {
    /// Primary provider
    Google,
    /// Secondary provider
    Yelp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub source: RatingSource,
    pub value: f64,
    #[serde(default)]
    pub review_count: u32,
}

/// Days of the week a deal or opening window applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaySet {
    All,
    Days(Vec<Weekday>),
}

impl Default for DaySet {
    fn default() -> Self {
        DaySet::All
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealKind {
    #[default]
    Special,
    HappyHour,
}

/// A promotion published by the venue catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub title: String,
    #[serde(default)]
    pub days: DaySet,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub kind: DealKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub title: String,
    /// Venue-local start time
    pub starts_at: NaiveDateTime,
}

/// Weekly opening window, may close after midnight
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningHours {
    #[serde(default)]
    pub days: DaySet,
    pub opens: NaiveTime,
    pub closes: NaiveTime,
}

/// Curated designation applied as a score multiplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertDesignation {
    pub boost: f64,
    #[serde(default)]
    pub note: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Monthly ranking period, rendered as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RankingPeriod {
    year: i32,
    month: u32,
}

impl RankingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, ParamError> {
        if !(1..=12).contains(&month) {
            return Err(ParamError::InvalidPeriod(format!("{}-{}", year, month)));
        }
        Ok(Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month before this one
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }
}

impl fmt::Display for RankingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for RankingPeriod {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| ParamError::InvalidPeriod(s.to_string()))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| ParamError::InvalidPeriod(s.to_string()))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| ParamError::InvalidPeriod(s.to_string()))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for RankingPeriod {
    type Error = ParamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RankingPeriod> for String {
    fn from(period: RankingPeriod) -> Self {
        period.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
    New,
}

/// Rank movement between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub magnitude: u32,
}

/// One venue's place in a monthly snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub venue_id: VenueId,
    pub period: RankingPeriod,
    pub score: f64,
    pub rank: u32,
    #[serde(default)]
    pub previous_rank: Option<u32>,
    #[serde(flatten)]
    pub trend: Trend,
}

/// Read-only snapshot of a venue as served by the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub id: VenueId,
    pub name: String,
    pub category: String,
    pub location: Coordinates,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub recent_review_count: u32,
    #[serde(default)]
    pub total_review_count: u32,
    #[serde(default)]
    pub deals: Vec<Deal>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub opening_hours: Vec<OpeningHours>,
    #[serde(default)]
    pub expert: Option<ExpertDesignation>,
    #[serde(default)]
    pub social_buzz: Option<f64>,
    #[serde(default)]
    pub ranking: Option<Ranking>,
}

impl Venue {
    /// Rating value reported by the given provider, if any
    pub fn rating(&self, source: RatingSource) -> Option<f64> {
        self.ratings
            .iter()
            .find(|r| r.source == source)
            .map(|r| r.value)
    }

    pub fn in_category(&self, category: Option<&str>) -> bool {
        match category {
            Some(c) => self.category.eq_ignore_ascii_case(c),
            None => true,
        }
    }
}

/// Raw signals for one venue, the input of the score engine
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScoringInput {
    #[serde(default)]
    pub venue_id: VenueId,
    #[validate(range(min = 0.0, max = 5.0))]
    #[serde(rename = "googleRating", default)]
    pub primary_rating: Option<f64>,
    #[validate(range(min = 0.0, max = 5.0))]
    #[serde(rename = "yelpRating", default)]
    pub secondary_rating: Option<f64>,
    #[serde(default)]
    pub recent_review_count: u32,
    #[serde(default)]
    pub total_review_count: u32,
    #[serde(default)]
    pub active_deals_count: u32,
    #[serde(default)]
    pub has_happy_hour_now: bool,
    #[serde(default)]
    pub has_event_tonight: bool,
    #[serde(default)]
    pub is_open_now: bool,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub user_distance: Option<f64>,
    #[serde(default)]
    pub previous_rank: Option<u32>,
    #[serde(default)]
    pub current_rank: Option<u32>,
    #[validate(range(min = 1.0))]
    #[serde(default)]
    pub expert_boost_multiplier: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default)]
    pub social_buzz_score: Option<f64>,
}

/// Per-factor sub-scores (0-100, before weighting)
///
/// `None` marks a factor that had no input and contributed nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub primary_rating: Option<f64>,
    pub secondary_rating: Option<f64>,
    pub velocity: f64,
    pub deals: f64,
    pub events: f64,
    pub buzz: f64,
    pub proximity: Option<f64>,
    pub open_now: f64,
    pub trending: Option<f64>,
    /// Expert multiplier expressed as a percentage bonus
    pub expert_boost: f64,
    pub base_score: f64,
    pub total: f64,
}

/// Short tagged reason a venue scored the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreReason {
    ExcellentPrimaryRating,
    LovedOnSecondary,
    ReviewVelocity,
    GreatDeals,
    EventTonight,
    VeryClose,
    OpenNow,
    SocialBuzz,
    TrendingUp,
    CoolingOff,
    ExpertPick,
}

impl ScoreReason {
    pub fn label(&self) -> &'static str {
        match self {
            ScoreReason::ExcellentPrimaryRating => "Excellent Google rating",
            ScoreReason::LovedOnSecondary => "Loved on Yelp",
            ScoreReason::ReviewVelocity => "Lots of recent reviews",
            ScoreReason::GreatDeals => "Great deals right now",
            ScoreReason::EventTonight => "Event tonight",
            ScoreReason::VeryClose => "Right around the corner",
            ScoreReason::OpenNow => "Open now",
            ScoreReason::SocialBuzz => "Social buzz",
            ScoreReason::TrendingUp => "Trending up",
            ScoreReason::CoolingOff => "Cooling off",
            ScoreReason::ExpertPick => "Expert pick",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub power_score: f64,
    pub breakdown: ScoreBreakdown,
    pub reasons: Vec<ScoreReason>,
    pub explanation: String,
}

/// Venue annotated by the selection pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueSelection {
    pub venue_id: VenueId,
    pub name: String,
    pub category: String,
    pub location: Coordinates,
    pub distance: Option<f64>,
    #[serde(alias = "liveScore")]
    pub power_score: f64,
    pub has_deals_tonight: bool,
    pub has_events_tonight: bool,
    pub active_deals: Vec<String>,
    pub events_tonight: Vec<String>,
    pub rank: Option<u32>,
    pub trend: Option<Trend>,
    pub score_explanation: String,
    pub breakdown: ScoreBreakdown,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// Candidate query handed to the venue catalog
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub bounding_box: BoundingBox,
    pub category: Option<String>,
}

/// Scoring weights
///
/// `expert_pick` is reserved for the multiplicative boost and is never added
/// into the base score; it is kept so the table sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub primary_rating: f64,
    pub secondary_rating: f64,
    pub review_velocity: f64,
    pub deals: f64,
    pub events: f64,
    pub social_buzz: f64,
    pub proximity: f64,
    pub open_now: f64,
    pub expert_pick: f64,
    pub trending: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.primary_rating
            + self.secondary_rating
            + self.review_velocity
            + self.deals
            + self.events
            + self.social_buzz
            + self.proximity
            + self.open_now
            + self.expert_pick
            + self.trending
    }

    /// True when every weight is non-negative and the table sums to 1.0
    pub fn is_valid(&self) -> bool {
        let all = [
            self.primary_rating,
            self.secondary_rating,
            self.review_velocity,
            self.deals,
            self.events,
            self.social_buzz,
            self.proximity,
            self.open_now,
            self.expert_pick,
            self.trending,
        ];
        all.iter().all(|w| w.is_finite() && *w >= 0.0) && (self.sum() - 1.0).abs() < 1e-9
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            primary_rating: 0.20,
            secondary_rating: 0.15,
            review_velocity: 0.05,
            deals: 0.10,
            events: 0.10,
            social_buzz: 0.05,
            proximity: 0.10,
            open_now: 0.05,
            expert_pick: 0.10,
            trending: 0.10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse_and_display() {
        let period: RankingPeriod = "2026-3".parse().unwrap();
        assert_eq!(period.to_string(), "2026-03");
        assert_eq!(period.previous().to_string(), "2026-02");
        assert_eq!(RankingPeriod::new(2026, 1).unwrap().previous().to_string(), "2025-12");
    }

    #[test]
    fn test_period_rejects_bad_month() {
        assert!("2026-13".parse::<RankingPeriod>().is_err());
        assert!("march".parse::<RankingPeriod>().is_err());
    }

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(40.7128, -74.0060).is_ok());
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_venue_deserializes_with_defaults() {
        let json = r#"{
            "id": "v1",
            "name": "The Blue Room",
            "category": "bar",
            "location": { "lat": 40.72, "lng": -74.0 },
            "ratings": [{ "source": "google", "value": 4.4, "reviewCount": 120 }],
            "deals": [{ "title": "Two for one", "days": { "days": ["Fri", "Sat"] }, "kind": "happy_hour" }]
        }"#;

        let venue: Venue = serde_json::from_str(json).unwrap();
        assert_eq!(venue.rating(RatingSource::Google), Some(4.4));
        assert_eq!(venue.rating(RatingSource::Yelp), None);
        assert!(venue.deals[0].is_active);
        assert_eq!(venue.deals[0].kind, DealKind::HappyHour);
        assert!(venue.in_category(Some("BAR")));
    }
}
