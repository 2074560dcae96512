use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::{
    distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box},
    ranking::{build_rankings, rank_index},
    schedule::{tonight_schedule, OpenNowPolicy, ScheduledHours, TonightSchedule},
    scoring::ScoreEngine,
};
use crate::error::{ParamError, RankingError};
use crate::models::{
    BoundingBox, Coordinates, Ranking, RankingPeriod, RatingSource, ScoringInput, Venue, VenueId,
    VenueSelection,
};

/// Which view of the venue set is being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Tonight,
    Nearby,
    Monthly,
    Trending,
}

impl SelectionMode {
    /// Modes that need the requester's location
    pub fn requires_location(&self) -> bool {
        !matches!(self, SelectionMode::Monthly)
    }
}

/// Sort key for the nearby view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NearbySort {
    #[default]
    Distance,
    Score,
}

#[derive(Debug, Clone)]
pub struct SelectionRequest {
    pub mode: SelectionMode,
    pub origin: Option<Coordinates>,
    pub radius_miles: f64,
    pub limit: usize,
    pub category: Option<String>,
    pub sort: NearbySort,
    /// Venue-local wall clock time
    pub now: NaiveDateTime,
}

/// Result of the selection pipeline
#[derive(Debug)]
pub struct Selection {
    pub venues: Vec<VenueSelection>,
    pub total_candidates: usize,
}

/// Selection orchestrator
///
/// # Pipeline Stages
/// 1. Bounding box pre-filter (the catalog query, re-checked here)
/// 2. Exact great-circle radius filter
/// 3. Deal and event time-window matching
/// 4. Power scoring
/// 5. Mode-specific ordering
/// 6. Limit
#[derive(Debug, Clone)]
pub struct Selector {
    engine: ScoreEngine,
    open_policy: Arc<dyn OpenNowPolicy>,
}

impl Selector {
    pub fn new(engine: ScoreEngine, open_policy: Arc<dyn OpenNowPolicy>) -> Self {
        Self { engine, open_policy }
    }

    pub fn with_defaults() -> Self {
        Self::new(ScoreEngine::default(), Arc::new(ScheduledHours))
    }

    pub fn engine(&self) -> &ScoreEngine {
        &self.engine
    }

    /// Run the full pipeline over already-fetched candidates
    ///
    /// Either the whole ordered list is produced or the request is rejected;
    /// nothing is returned half-ranked.
    pub fn select(
        &self,
        request: &SelectionRequest,
        candidates: Vec<Venue>,
    ) -> Result<Selection, ParamError> {
        if request.mode.requires_location() && request.origin.is_none() {
            return Err(ParamError::Missing("lat"));
        }
        if !request.radius_miles.is_finite() || request.radius_miles <= 0.0 {
            return Err(ParamError::OutOfRange {
                name: "radius",
                value: request.radius_miles.to_string(),
                expected: "a positive number of miles",
            });
        }

        let total_candidates = candidates.len();
        let bounding_box = match request.mode {
            SelectionMode::Monthly => None,
            _ => request
                .origin
                .map(|origin| calculate_bounding_box(origin, request.radius_miles)),
        };

        let mut selected: Vec<VenueSelection> = candidates
            .into_iter()
            .filter(|venue| venue.in_category(request.category.as_deref()))
            .filter_map(|venue| self.annotate(venue, request, bounding_box.as_ref()))
            .collect();

        tracing::debug!(
            "Selection {:?}: {} of {} candidates survived filtering",
            request.mode,
            selected.len(),
            total_candidates
        );

        match request.mode {
            SelectionMode::Tonight => order_tonight(&mut selected),
            SelectionMode::Nearby => order_nearby(&mut selected, request.sort),
            SelectionMode::Monthly => order_monthly(&mut selected),
            SelectionMode::Trending => order_trending(&mut selected),
        }

        selected.truncate(request.limit);

        Ok(Selection {
            venues: selected,
            total_candidates,
        })
    }

    /// Stages 2-4 for a single venue; `None` drops it from the view
    fn annotate(
        &self,
        venue: Venue,
        request: &SelectionRequest,
        bounding_box: Option<&BoundingBox>,
    ) -> Option<VenueSelection> {
        if request.mode == SelectionMode::Monthly && venue.ranking.is_none() {
            return None;
        }
        if let Some(bbox) = bounding_box {
            if !is_within_bounding_box(venue.location, bbox) {
                return None;
            }
        }

        let distance = request
            .origin
            .map(|origin| haversine_distance(origin, venue.location));
        if bounding_box.is_some() && distance.map_or(true, |d| d > request.radius_miles) {
            return None;
        }

        let schedule = tonight_schedule(&venue, request.now);
        let has_deals_tonight = schedule.has_deals();
        let has_events_tonight = schedule.has_events();
        let active_deals = schedule.active_deals.iter().map(|d| d.title.clone()).collect();
        let events_tonight = schedule.events_today.iter().map(|e| e.title.clone()).collect();

        // Monthly entries report the snapshot score so displayed scores follow rank
        let (result, power_score) = match (request.mode, venue.ranking.as_ref()) {
            (SelectionMode::Monthly, Some(ranking)) => {
                (self.engine.score(&period_input(&venue)), ranking.score)
            }
            _ => {
                let is_open_now = self.open_policy.is_open(&venue, request.now);
                let input = scoring_input(&venue, &schedule, distance, is_open_now);
                let result = self.engine.score(&input);
                let power_score = result.power_score;
                (result, power_score)
            }
        };

        let rank = venue.ranking.as_ref().map(|r| r.rank);
        let trend = venue.ranking.as_ref().map(|r| r.trend);

        Some(VenueSelection {
            venue_id: venue.id,
            name: venue.name,
            category: venue.category,
            location: venue.location,
            distance,
            power_score,
            has_deals_tonight,
            has_events_tonight,
            active_deals,
            events_tonight,
            rank,
            trend,
            score_explanation: result.explanation,
            breakdown: result.breakdown,
        })
    }

    /// Score used when ranking a whole period
    ///
    /// Only signals that hold for the whole month count, so the result does
    /// not depend on the time of day or on any requester.
    pub fn snapshot_score(&self, venue: &Venue) -> f64 {
        self.engine.score(&period_input(venue)).power_score
    }

    /// Rank every venue for a period that has no stored snapshot yet
    pub fn rank_live(
        &self,
        period: RankingPeriod,
        venues: &[Venue],
        previous: &[Ranking],
    ) -> Result<Vec<Ranking>, RankingError> {
        let scores: Vec<(VenueId, f64)> = venues
            .iter()
            .map(|venue| (venue.id.clone(), self.snapshot_score(venue)))
            .collect();
        build_rankings(period, &scores, &rank_index(previous))
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Period-wide signals of a venue: ratings, review velocity, buzz and expert
/// boost. Deals, events, opening hours, distance and rank history are left out.
pub fn period_input(venue: &Venue) -> ScoringInput {
    ScoringInput {
        venue_id: venue.id.clone(),
        primary_rating: venue.rating(RatingSource::Google),
        secondary_rating: venue.rating(RatingSource::Yelp),
        recent_review_count: venue.recent_review_count,
        total_review_count: venue.total_review_count,
        expert_boost_multiplier: venue.expert.as_ref().map(|e| e.boost),
        social_buzz_score: venue.social_buzz,
        ..ScoringInput::default()
    }
}

/// Collect a venue's raw signals for the score engine
pub fn scoring_input(
    venue: &Venue,
    schedule: &TonightSchedule<'_>,
    distance: Option<f64>,
    is_open_now: bool,
) -> ScoringInput {
    ScoringInput {
        venue_id: venue.id.clone(),
        primary_rating: venue.rating(RatingSource::Google),
        secondary_rating: venue.rating(RatingSource::Yelp),
        recent_review_count: venue.recent_review_count,
        total_review_count: venue.total_review_count,
        active_deals_count: schedule.active_deals.len() as u32,
        has_happy_hour_now: schedule.has_happy_hour(),
        has_event_tonight: schedule.has_events(),
        is_open_now,
        user_distance: distance,
        previous_rank: venue.ranking.as_ref().and_then(|r| r.previous_rank),
        current_rank: venue.ranking.as_ref().map(|r| r.rank),
        expert_boost_multiplier: venue.expert.as_ref().map(|e| e.boost),
        social_buzz_score: venue.social_buzz,
    }
}

#[inline]
fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[inline]
fn asc_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Deals first, then events, then score
pub fn order_tonight(venues: &mut [VenueSelection]) {
    venues.sort_by(|a, b| {
        b.has_deals_tonight
            .cmp(&a.has_deals_tonight)
            .then_with(|| b.has_events_tonight.cmp(&a.has_events_tonight))
            .then_with(|| desc(a.power_score, b.power_score))
            .then_with(|| a.venue_id.cmp(&b.venue_id))
    });
}

pub fn order_nearby(venues: &mut [VenueSelection], sort: NearbySort) {
    match sort {
        NearbySort::Distance => venues.sort_by(|a, b| {
            asc_distance(a.distance, b.distance).then_with(|| a.venue_id.cmp(&b.venue_id))
        }),
        NearbySort::Score => venues.sort_by(|a, b| {
            desc(a.power_score, b.power_score)
                .then_with(|| asc_distance(a.distance, b.distance))
                .then_with(|| a.venue_id.cmp(&b.venue_id))
        }),
    }
}

pub fn order_monthly(venues: &mut [VenueSelection]) {
    venues.sort_by(|a, b| {
        a.rank
            .unwrap_or(u32::MAX)
            .cmp(&b.rank.unwrap_or(u32::MAX))
            .then_with(|| a.venue_id.cmp(&b.venue_id))
    });
}

/// Biggest climbers first, then score
pub fn order_trending(venues: &mut [VenueSelection]) {
    let change = |v: &VenueSelection| v.trend.map_or(0, |t| t.signed_change());
    venues.sort_by(|a, b| {
        change(b)
            .cmp(&change(a))
            .then_with(|| desc(a.power_score, b.power_score))
            .then_with(|| a.venue_id.cmp(&b.venue_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::trend::determine_trend;
    use crate::models::{
        DaySet, Deal, DealKind, Event, ExpertDesignation, OpeningHours, Rating, ScoreBreakdown,
    };
    use chrono::{NaiveDate, NaiveTime};

    const ORIGIN: Coordinates = Coordinates {
        latitude: 40.7128,
        longitude: -74.0060,
    };

    fn now() -> NaiveDateTime {
        // Monday evening
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(20, 0, 0).unwrap())
    }

    fn venue(id: &str, lat: f64, lng: f64) -> Venue {
        Venue {
            id: VenueId::new(id),
            name: format!("Venue {}", id),
            category: "bar".to_string(),
            location: Coordinates { latitude: lat, longitude: lng },
            ratings: vec![Rating {
                source: RatingSource::Google,
                value: 4.0,
                review_count: 100,
            }],
            recent_review_count: 5,
            total_review_count: 100,
            deals: vec![],
            events: vec![],
            opening_hours: vec![],
            expert: None,
            social_buzz: None,
            ranking: None,
        }
    }

    fn happy_hour() -> Deal {
        Deal {
            title: "Happy hour".to_string(),
            days: DaySet::All,
            start_time: Some(NaiveTime::from_hms_opt(17, 0, 0).unwrap()),
            end_time: Some(NaiveTime::from_hms_opt(21, 0, 0).unwrap()),
            is_active: true,
            kind: DealKind::HappyHour,
        }
    }

    fn ranked(mut v: Venue, rank: u32, previous: Option<u32>) -> Venue {
        v.ranking = Some(Ranking {
            venue_id: v.id.clone(),
            period: RankingPeriod::new(2026, 10).unwrap(),
            score: 50.0,
            rank,
            previous_rank: previous,
            trend: determine_trend(rank, previous),
        });
        v
    }

    fn request(mode: SelectionMode) -> SelectionRequest {
        SelectionRequest {
            mode,
            origin: Some(ORIGIN),
            radius_miles: 10.0,
            limit: 10,
            category: None,
            sort: NearbySort::Distance,
            now: now(),
        }
    }

    fn selection(id: &str, deals: bool, events: bool, score: f64) -> VenueSelection {
        VenueSelection {
            venue_id: VenueId::new(id),
            name: id.to_string(),
            category: "bar".to_string(),
            location: ORIGIN,
            distance: Some(1.0),
            power_score: score,
            has_deals_tonight: deals,
            has_events_tonight: events,
            active_deals: vec![],
            events_tonight: vec![],
            rank: None,
            trend: None,
            score_explanation: String::new(),
            breakdown: ScoreBreakdown {
                primary_rating: None,
                secondary_rating: None,
                velocity: 50.0,
                deals: 0.0,
                events: 0.0,
                buzz: 50.0,
                proximity: None,
                open_now: 0.0,
                trending: None,
                expert_boost: 0.0,
                base_score: score,
                total: score,
            },
        }
    }

    fn ids(selection: &[VenueSelection]) -> Vec<&str> {
        selection.iter().map(|v| v.venue_id.as_str()).collect()
    }

    #[test]
    fn test_tonight_ordering() {
        let mut venues = vec![
            selection("C", false, false, 99.0),
            selection("B", false, true, 95.0),
            selection("A", true, false, 80.0),
        ];
        order_tonight(&mut venues);
        assert_eq!(ids(&venues), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_missing_location_rejected() {
        let selector = Selector::with_defaults();
        let mut req = request(SelectionMode::Tonight);
        req.origin = None;

        let result = selector.select(&req, vec![venue("1", 40.72, -74.01)]);
        assert!(matches!(result, Err(ParamError::Missing("lat"))));
    }

    #[test]
    fn test_exact_radius_filter() {
        let selector = Selector::with_defaults();
        let candidates = vec![
            venue("near", 40.72, -74.01),
            // Inside the box corner but beyond 10 miles
            venue("corner", 40.7128 + 0.13, -74.0060 + 0.17),
            venue("far", 41.5, -74.0),
        ];

        let result = selector.select(&request(SelectionMode::Nearby), candidates).unwrap();
        assert_eq!(ids(&result.venues), vec!["near"]);
        assert_eq!(result.total_candidates, 3);
        assert!(result.venues[0].distance.unwrap() <= 10.0);
    }

    #[test]
    fn test_tonight_pipeline_attaches_deals_and_events() {
        let selector = Selector::with_defaults();

        let mut deals = venue("deals", 40.72, -74.01);
        deals.deals.push(happy_hour());

        let mut events = venue("events", 40.715, -74.0);
        events.events.push(Event {
            title: "Open mic".to_string(),
            starts_at: now().date().and_hms_opt(22, 0, 0).unwrap(),
        });
        events.expert = Some(ExpertDesignation { boost: 2.0, note: None });

        let plain = venue("plain", 40.713, -74.006);

        let result = selector
            .select(&request(SelectionMode::Tonight), vec![plain, events, deals])
            .unwrap();

        assert_eq!(ids(&result.venues), vec!["deals", "events", "plain"]);
        let first = &result.venues[0];
        assert!(first.has_deals_tonight);
        assert_eq!(first.active_deals, vec!["Happy hour"]);
        assert_eq!(first.breakdown.deals, 55.0);
        assert!(result.venues[1].has_events_tonight);
        assert_eq!(result.venues[1].events_tonight, vec!["Open mic"]);
    }

    #[test]
    fn test_limit_and_category() {
        let selector = Selector::with_defaults();
        let mut candidates: Vec<Venue> = (0..20)
            .map(|i| venue(&format!("{:02}", i), 40.7128 + i as f64 * 0.001, -74.0060))
            .collect();
        candidates[3].category = "club".to_string();

        let mut req = request(SelectionMode::Nearby);
        req.limit = 5;
        let result = selector.select(&req, candidates.clone()).unwrap();
        assert_eq!(result.venues.len(), 5);
        assert_eq!(result.venues[0].venue_id.as_str(), "00");

        req.category = Some("Club".to_string());
        let result = selector.select(&req, candidates).unwrap();
        assert_eq!(ids(&result.venues), vec!["03"]);
    }

    #[test]
    fn test_monthly_orders_by_rank_without_location() {
        let selector = Selector::with_defaults();
        let candidates = vec![
            ranked(venue("b", 40.72, -74.01), 2, Some(1)),
            ranked(venue("a", 45.0, -80.0), 1, Some(3)),
            venue("unranked", 40.72, -74.01),
        ];

        let mut req = request(SelectionMode::Monthly);
        req.origin = None;
        let result = selector.select(&req, candidates).unwrap();

        assert_eq!(ids(&result.venues), vec!["a", "b"]);
        assert_eq!(result.venues[0].distance, None);
    }

    #[test]
    fn test_trending_puts_climbers_first() {
        let selector = Selector::with_defaults();
        let candidates = vec![
            ranked(venue("slipping", 40.72, -74.01), 5, Some(2)),
            ranked(venue("rocket", 40.72, -74.01), 1, Some(9)),
            ranked(venue("steady", 40.72, -74.01), 3, Some(3)),
            ranked(venue("climber", 40.72, -74.01), 2, Some(4)),
        ];

        let result = selector
            .select(&request(SelectionMode::Trending), candidates)
            .unwrap();
        assert_eq!(ids(&result.venues), vec!["rocket", "climber", "steady", "slipping"]);
    }

    #[test]
    fn test_rank_live_uses_previous_snapshot() {
        let selector = Selector::with_defaults();
        let mut strong = venue("strong", 40.72, -74.01);
        strong.ratings[0].value = 4.9;
        let weak = venue("weak", 40.72, -74.01);

        let period = RankingPeriod::new(2026, 10).unwrap();
        let previous = vec![
            Ranking {
                venue_id: VenueId::new("weak"),
                period: period.previous(),
                score: 80.0,
                rank: 1,
                previous_rank: None,
                trend: determine_trend(1, None),
            },
            Ranking {
                venue_id: VenueId::new("strong"),
                period: period.previous(),
                score: 70.0,
                rank: 2,
                previous_rank: None,
                trend: determine_trend(2, None),
            },
        ];

        let rankings = selector
            .rank_live(period, &[weak, strong], &previous)
            .unwrap();
        assert_eq!(rankings[0].venue_id.as_str(), "strong");
        assert_eq!(rankings[0].trend.direction, crate::models::TrendDirection::Up);
        assert_eq!(rankings[1].trend.magnitude, 1);
    }

    #[test]
    fn test_rank_live_ignores_time_of_day() {
        let selector = Selector::with_defaults();
        let mut hour = venue("happy", 40.72, -74.01);
        hour.deals.push(happy_hour());
        hour.opening_hours.push(OpeningHours {
            days: DaySet::All,
            opens: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            closes: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        });
        let mut rated = venue("rated", 40.72, -74.01);
        rated.ratings[0].value = 4.5;
        // A stale ranking must not leak a trending factor into the period score
        let hour = ranked(hour, 1, Some(40));

        let period = RankingPeriod::new(2026, 10).unwrap();
        let venues = [hour, rated];
        let rankings = selector.rank_live(period, &venues, &[]).unwrap();
        let order: Vec<&str> = rankings.iter().map(|r| r.venue_id.as_str()).collect();
        assert_eq!(order, vec!["rated", "happy"]);

        // The same month read at 18:00 and at 23:00 shows the same ranks
        for h in [18, 23] {
            let at = now().date().and_hms_opt(h, 0, 0).unwrap();
            let snapshot: Vec<Venue> = venues
                .iter()
                .cloned()
                .map(|mut v| {
                    v.ranking = rankings.iter().find(|r| r.venue_id == v.id).cloned();
                    v
                })
                .collect();
            let mut req = request(SelectionMode::Monthly);
            req.now = at;
            let result = selector.select(&req, snapshot).unwrap();
            assert_eq!(ids(&result.venues), vec!["rated", "happy"]);
        }
    }

    #[test]
    fn test_monthly_reports_snapshot_score() {
        let selector = Selector::with_defaults();
        let mut top = ranked(venue("top", 40.72, -74.01), 1, None);
        top.ranking.as_mut().unwrap().score = 80.0;
        let mut second = ranked(venue("second", 40.72, -74.01), 2, None);
        second.ranking.as_mut().unwrap().score = 60.0;
        // Live signals would put "second" ahead
        second.ratings[0].value = 5.0;
        second.deals.push(happy_hour());

        let mut req = request(SelectionMode::Monthly);
        req.origin = None;
        let result = selector.select(&req, vec![second, top]).unwrap();

        let scores: Vec<f64> = result.venues.iter().map(|v| v.power_score).collect();
        assert_eq!(ids(&result.venues), vec!["top", "second"]);
        assert_eq!(scores, vec![80.0, 60.0]);
    }

    #[test]
    fn test_nearby_sort_by_score() {
        let mut venues = vec![
            selection("low", false, false, 10.0),
            selection("high", false, false, 90.0),
        ];
        venues[1].distance = Some(9.0);
        order_nearby(&mut venues, NearbySort::Score);
        assert_eq!(ids(&venues), vec!["high", "low"]);
        order_nearby(&mut venues, NearbySort::Distance);
        assert_eq!(ids(&venues), vec!["low", "high"]);
    }
}
