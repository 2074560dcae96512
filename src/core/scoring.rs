use crate::core::distance::round_to;
use crate::models::{ScoreBreakdown, ScoreReason, ScoringInput, ScoringResult, ScoringWeights};

/// Separator used when rendering reasons for display
pub const EXPLANATION_SEPARATOR: &str = " • ";

const NEUTRAL_SCORE: f64 = 50.0;
const FULL_PROXIMITY_MILES: f64 = 1.0;
const ZERO_PROXIMITY_MILES: f64 = 25.0;
const PROXIMITY_DECAY: f64 = 0.15;
const MAX_RANK_SWING: i64 = 50;

/// Transparent power score engine
///
/// Every venue gets the same fixed formula:
/// ```text
/// base = primary_rating   * 0.20
///      + secondary_rating * 0.15
///      + review_velocity  * 0.05
///      + deals            * 0.10
///      + events_tonight   * 0.10
///      + social_buzz      * 0.05
///      + proximity        * 0.10
///      + open_now         * 0.05
///      + trending         * 0.10
/// power = base * expert_boost
/// ```
/// Factors without input (no rating, unknown distance, no rank history)
/// contribute nothing rather than a neutral value.
#[derive(Debug, Clone, Copy)]
pub struct ScoreEngine {
    weights: ScoringWeights,
}

impl ScoreEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn score(&self, input: &ScoringInput) -> ScoringResult {
        calculate_power_score(input, &self.weights)
    }
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

/// Calculate the power score, breakdown and explanation for one venue
pub fn calculate_power_score(input: &ScoringInput, weights: &ScoringWeights) -> ScoringResult {
    let primary_rating = input.primary_rating.map(normalize_rating);
    let secondary_rating = input.secondary_rating.map(normalize_rating);
    let velocity = review_velocity_score(input.recent_review_count, input.total_review_count);
    let deals = deals_score(input.active_deals_count, input.has_happy_hour_now);
    let events = flag_score(input.has_event_tonight);
    let buzz = input.social_buzz_score.unwrap_or(NEUTRAL_SCORE);
    let proximity = input.user_distance.map(proximity_score);
    let open_now = flag_score(input.is_open_now);
    let trending = trending_score(input.previous_rank, input.current_rank);

    let base = primary_rating.unwrap_or(0.0) * weights.primary_rating
        + secondary_rating.unwrap_or(0.0) * weights.secondary_rating
        + velocity * weights.review_velocity
        + deals * weights.deals
        + events * weights.events
        + buzz * weights.social_buzz
        + proximity.unwrap_or(0.0) * weights.proximity
        + open_now * weights.open_now
        + trending.unwrap_or(0.0) * weights.trending;

    let boost = expert_multiplier(input.expert_boost_multiplier);
    let total = round_to(base * boost, 1);

    let breakdown = ScoreBreakdown {
        primary_rating,
        secondary_rating,
        velocity,
        deals,
        events,
        buzz,
        proximity,
        open_now,
        trending,
        expert_boost: round_to((boost - 1.0) * 100.0, 1),
        base_score: round_to(base, 1),
        total,
    };

    let reasons = explain(&breakdown);
    let explanation = render_explanation(&reasons);

    ScoringResult {
        power_score: total,
        breakdown,
        reasons,
        explanation,
    }
}

/// Map a 0-5 rating onto 0-100
///
/// Ratings under 3.0 are squeezed into 0-30, 3.0-5.0 spans 50-100.
#[inline]
pub fn normalize_rating(rating: f64) -> f64 {
    if rating < 3.0 {
        (rating / 5.0) * 50.0
    } else {
        NEUTRAL_SCORE + ((rating - 3.0) / 2.0) * 50.0
    }
}

/// Recent reviews measured against 10% of all-time volume
#[inline]
pub fn review_velocity_score(recent: u32, total: u32) -> f64 {
    if total == 0 {
        return NEUTRAL_SCORE;
    }
    let ratio = recent as f64 / (total as f64 * 0.1).max(1.0);
    (NEUTRAL_SCORE + ratio * 25.0).min(100.0)
}

#[inline]
pub fn deals_score(active_deals: u32, happy_hour_now: bool) -> f64 {
    let deals = (active_deals as f64 * 15.0).min(60.0);
    let happy_hour = if happy_hour_now { 40.0 } else { 0.0 };
    (deals + happy_hour).min(100.0)
}

/// Full credit within a mile, exponential decay to nothing at 25 miles
#[inline]
pub fn proximity_score(distance_miles: f64) -> f64 {
    if distance_miles <= FULL_PROXIMITY_MILES {
        return 100.0;
    }
    if distance_miles >= ZERO_PROXIMITY_MILES {
        return 0.0;
    }
    (100.0 * (-PROXIMITY_DECAY * (distance_miles - FULL_PROXIMITY_MILES)).exp()).round()
}

/// Rank momentum around a neutral 50; `None` without both ranks
#[inline]
pub fn trending_score(previous_rank: Option<u32>, current_rank: Option<u32>) -> Option<f64> {
    let (previous, current) = (previous_rank?, current_rank?);
    let change = (previous as i64 - current as i64).clamp(-MAX_RANK_SWING, MAX_RANK_SWING);
    Some(NEUTRAL_SCORE + change as f64)
}

#[inline]
fn flag_score(flag: bool) -> f64 {
    if flag {
        100.0
    } else {
        0.0
    }
}

#[inline]
fn expert_multiplier(multiplier: Option<f64>) -> f64 {
    multiplier.filter(|b| *b > 1.0).unwrap_or(1.0)
}

/// Ordered reasons triggered by breakdown thresholds
pub fn explain(breakdown: &ScoreBreakdown) -> Vec<ScoreReason> {
    let mut reasons = Vec::new();

    if breakdown.primary_rating.is_some_and(|s| s >= 90.0) {
        reasons.push(ScoreReason::ExcellentPrimaryRating);
    }
    if breakdown.secondary_rating.is_some_and(|s| s >= 90.0) {
        reasons.push(ScoreReason::LovedOnSecondary);
    }
    if breakdown.velocity >= 80.0 {
        reasons.push(ScoreReason::ReviewVelocity);
    }
    if breakdown.deals >= 70.0 {
        reasons.push(ScoreReason::GreatDeals);
    }
    if breakdown.events >= 100.0 {
        reasons.push(ScoreReason::EventTonight);
    }
    if breakdown.proximity.is_some_and(|s| s >= 90.0) {
        reasons.push(ScoreReason::VeryClose);
    }
    if breakdown.open_now >= 100.0 {
        reasons.push(ScoreReason::OpenNow);
    }
    if breakdown.buzz >= 80.0 {
        reasons.push(ScoreReason::SocialBuzz);
    }
    match breakdown.trending {
        Some(t) if t >= 70.0 => reasons.push(ScoreReason::TrendingUp),
        Some(t) if t <= 30.0 => reasons.push(ScoreReason::CoolingOff),
        _ => {}
    }
    if breakdown.expert_boost > 0.0 {
        reasons.push(ScoreReason::ExpertPick);
    }

    reasons
}

pub fn render_explanation(reasons: &[ScoreReason]) -> String {
    if reasons.is_empty() {
        return "Solid all-round pick".to_string();
    }
    reasons
        .iter()
        .map(ScoreReason::label)
        .collect::<Vec<_>>()
        .join(EXPLANATION_SEPARATOR)
}
